//! An address's native transfers, signed from the point of view of that address.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    explorer::{Explorer, ExplorerTransaction},
    json_codecs::{from_i64_string, to_i64_string},
    units::WeiNewtype,
};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// `value` is positive for `In` and negative for `Out`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransferEvent {
    pub value: WeiNewtype,
    pub direction: Direction,
    pub hash: String,
    /// Unix seconds.
    #[serde(deserialize_with = "from_i64_string", serialize_with = "to_i64_string")]
    pub timestamp: i64,
}

fn is_address(candidate: Option<&str>, address: &str) -> bool {
    candidate.is_some_and(|candidate| candidate.eq_ignore_ascii_case(address))
}

/// Classifies a transaction relative to `address`. Transactions that neither pay nor are paid
/// by `address`, zero value calls, and records with an unreadable amount or timestamp are
/// dropped.
pub fn normalize_transfer(
    address: &str,
    transaction: &ExplorerTransaction,
) -> Option<TransferEvent> {
    let direction = if is_address(transaction.to.as_deref(), address) {
        Direction::In
    } else if is_address(transaction.from.as_deref(), address) {
        Direction::Out
    } else {
        return None;
    };

    let (magnitude, timestamp) = match (
        transaction.value.parse::<WeiNewtype>(),
        transaction.time_stamp.trim().parse::<i64>(),
    ) {
        (Ok(magnitude), Ok(timestamp)) if !magnitude.is_negative() => (magnitude, timestamp),
        _ => {
            warn!(
                hash = %transaction.hash,
                value = %transaction.value,
                time_stamp = %transaction.time_stamp,
                "skipping transaction with unreadable value or timestamp"
            );
            return None;
        }
    };

    if magnitude == WeiNewtype::ZERO {
        return None;
    }

    let value = match direction {
        Direction::In => magnitude,
        Direction::Out => -magnitude,
    };

    Some(TransferEvent {
        value,
        direction,
        hash: transaction.hash.clone(),
        timestamp,
    })
}

/// Oldest first. Transfers in the same second keep the order the explorer listed them in.
pub fn normalize_transfers(
    address: &str,
    transactions: &[ExplorerTransaction],
) -> Vec<TransferEvent> {
    let mut transfers: Vec<TransferEvent> = transactions
        .iter()
        .filter_map(|transaction| normalize_transfer(address, transaction))
        .collect();
    transfers.sort_by_key(|transfer| transfer.timestamp);
    transfers
}

/// Any failure to fetch the history yields no transfers rather than an error.
pub async fn fetch_transfers(explorer: &impl Explorer, address: &str) -> Vec<TransferEvent> {
    match explorer.get_transactions(address).await {
        Ok(transactions) => {
            let transfers = normalize_transfers(address, &transactions);
            debug!(
                address,
                transactions = transactions.len(),
                transfers = transfers.len(),
                "fetched transfers"
            );
            transfers
        }
        Err(err) => {
            warn!(address, "failed to fetch transactions: {err:#}");
            Vec::new()
        }
    }
}
