use tracing::warn;

use crate::{
    day_window::WindowDay,
    explorer::{BlockNumber, Explorer},
};

/// The last block at or before the end of `day`. Any failure, including a timeout, leaves the
/// day unresolved.
pub async fn resolve_end_of_day_block(
    explorer: &impl Explorer,
    day: &WindowDay,
) -> Option<BlockNumber> {
    let timestamp = day.end_of_day().timestamp();

    match explorer.get_block_number_before(timestamp).await {
        Ok(block_number) => Some(block_number),
        Err(err) => {
            warn!(date = %day.date, timestamp, "failed to resolve end of day block: {err:#}");
            None
        }
    }
}
