//! The tracked address list, one address per line.
use std::{collections::HashSet, io, path::Path};

use tracing::{debug, warn};

/// Trims every line and skips blank ones. Duplicates are kept, but logged.
pub fn parse_addresses(text: &str) -> Vec<String> {
    let addresses: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let mut seen = HashSet::new();
    for address in &addresses {
        if !seen.insert(address.to_lowercase()) {
            warn!(%address, "address listed more than once");
        }
    }

    addresses
}

pub async fn read_addresses(path: &Path) -> Result<Vec<String>, io::Error> {
    let text = tokio::fs::read_to_string(path).await?;
    let addresses = parse_addresses(&text);
    debug!(path = %path.display(), count = addresses.len(), "read address list");
    Ok(addresses)
}
