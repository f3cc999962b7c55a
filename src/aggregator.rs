//! Builds the per address balance history by walking the day window and carrying the last known
//! balance over days without data.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    addresses,
    balance_cache::{BalanceCache, CacheStore},
    balances::{historical_balance, live_balances},
    block_resolver::resolve_end_of_day_block,
    day_window::{DayWindow, WindowDay},
    explorer::{AccountBalance, Explorer},
    transactions::{fetch_transfers, TransferEvent},
    units::WeiNewtype,
};

/// Addresses reconstructed at the same time. Days within one address are always sequential.
pub const ADDRESS_CONCURRENCY: usize = 4;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DailyBalance {
    pub date: NaiveDate,
    pub balance: WeiNewtype,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub address: String,
    /// `None` when the explorer did not report the address.
    #[serde(rename = "balance")]
    pub live_balance: Option<WeiNewtype>,
    pub daily_balances: Vec<DailyBalance>,
    #[serde(rename = "spark")]
    pub transfers: Vec<TransferEvent>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeesResponse {
    pub employees: Vec<EmployeeRecord>,
    pub raw_balances: Vec<AccountBalance>,
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("failed to read address list {}: {source}", .path.display())]
    AddressList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to save balance cache: {0:#}")]
    CacheSave(#[source] anyhow::Error),
}

impl IntoResponse for AggregationError {
    fn into_response(self) -> Response {
        error!("aggregation failed: {self}");
        let body = json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn resolve_day_balance(
    explorer: &impl Explorer,
    address: &str,
    day: &WindowDay,
) -> Option<WeiNewtype> {
    let block_number = resolve_end_of_day_block(explorer, day).await?;
    historical_balance(explorer, address, block_number).await
}

#[derive(Debug)]
struct AddressHistory {
    daily_balances: Vec<DailyBalance>,
    /// Past days resolved during this run, to be added to the cache.
    resolved: Vec<(NaiveDate, WeiNewtype)>,
}

async fn reconstruct_history(
    explorer: &impl Explorer,
    store: &CacheStore,
    address: &str,
    window: &DayWindow,
) -> AddressHistory {
    let mut carry = WeiNewtype::ZERO;
    let mut daily_balances = Vec::with_capacity(window.days().len());
    let mut resolved = Vec::new();

    for day in window.days() {
        let balance = if day.is_recent {
            resolve_day_balance(explorer, address, day).await
        } else if let Some(cached) = store.get(address, &day.date) {
            Some(cached)
        } else {
            let balance = resolve_day_balance(explorer, address, day).await;
            if let Some(balance) = balance {
                resolved.push((day.date, balance));
            }
            balance
        };

        if balance.is_none() {
            debug!(address, date = %day.date, %carry, "no balance for day, carrying forward");
        }

        carry = balance.unwrap_or(carry);
        daily_balances.push(DailyBalance {
            date: day.date,
            balance: carry,
        });
    }

    AddressHistory {
        daily_balances,
        resolved,
    }
}

/// Aggregates over `window`. The cache is loaded once, and saved once after every address is
/// done. Only a failed save fails the run, explorer failures degrade to missing data.
pub async fn aggregate_window(
    explorer: &impl Explorer,
    balance_cache: &impl BalanceCache,
    addresses: &[String],
    window: &DayWindow,
) -> Result<EmployeesResponse, AggregationError> {
    let mut store = balance_cache.load().await;
    let cached_before = store.len();

    let histories = stream::iter(addresses)
        .map(|address| reconstruct_history(explorer, &store, address, window))
        .buffered(ADDRESS_CONCURRENCY)
        .boxed()
        .collect::<Vec<_>>();
    let transfers = stream::iter(addresses)
        .map(|address| async move {
            (
                address.to_lowercase(),
                fetch_transfers(explorer, address).await,
            )
        })
        .buffered(ADDRESS_CONCURRENCY)
        .boxed()
        .collect::<HashMap<_, _>>();

    let (histories, live_balances, mut transfers) =
        futures::join!(histories, live_balances(explorer, addresses), transfers);

    let mut employees = Vec::with_capacity(addresses.len());
    for (address, history) in addresses.iter().zip(histories) {
        for (date, balance) in history.resolved {
            store.set(address, date, balance);
        }

        employees.push(EmployeeRecord {
            address: address.clone(),
            live_balance: live_balances.get(address),
            daily_balances: history.daily_balances,
            transfers: transfers
                .remove(&address.to_lowercase())
                .unwrap_or_default(),
        });
    }

    let first_recent_day = window.first_recent_day();
    let pruned = store.remove_from(&first_recent_day);
    if pruned != 0 {
        warn!(
            pruned,
            %first_recent_day,
            "balance cache held days that are still recent, dropped them"
        );
    }

    let first_day = window.first_day();
    let expired = store.remove_before(&first_day);
    if expired != 0 {
        debug!(expired, %first_day, "dropped cached days older than the window");
    }

    balance_cache
        .save(&store)
        .await
        .map_err(AggregationError::CacheSave)?;

    info!(
        today = %window.today(),
        addresses = addresses.len(),
        live_balances = live_balances.len(),
        cached_before,
        cached_after = store.len(),
        "aggregated balance history"
    );

    Ok(EmployeesResponse {
        employees,
        raw_balances: live_balances.raw,
    })
}

/// Aggregates over the default window ending on the UTC day of `now`.
pub async fn aggregate(
    explorer: &impl Explorer,
    balance_cache: &impl BalanceCache,
    addresses: &[String],
    now: DateTime<Utc>,
) -> Result<EmployeesResponse, AggregationError> {
    aggregate_window(explorer, balance_cache, addresses, &DayWindow::ending_at(now)).await
}

/// Reads the address list at `wallets_path`, then aggregates.
pub async fn aggregate_from_file(
    explorer: &impl Explorer,
    balance_cache: &impl BalanceCache,
    wallets_path: &Path,
    now: DateTime<Utc>,
) -> Result<EmployeesResponse, AggregationError> {
    let addresses = addresses::read_addresses(wallets_path)
        .await
        .map_err(|source| AggregationError::AddressList {
            path: wallets_path.to_path_buf(),
            source,
        })?;

    aggregate(explorer, balance_cache, &addresses, now).await
}
