//! Closing balances of past days. These can no longer change, so once resolved they are kept
//! and never asked of the explorer again.
use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::units::WeiNewtype;

pub type DailyBalances = BTreeMap<NaiveDate, WeiNewtype>;

/// Address to day to closing balance. Addresses keep the case they were first written with but
/// are looked up case-insensitively.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CacheStore(BTreeMap<String, DailyBalances>);

impl CacheStore {
    fn key_for(&self, address: &str) -> Option<&String> {
        self.0.keys().find(|key| key.eq_ignore_ascii_case(address))
    }

    pub fn get(&self, address: &str, date: &NaiveDate) -> Option<WeiNewtype> {
        self.key_for(address)
            .and_then(|key| self.0.get(key))
            .and_then(|daily_balances| daily_balances.get(date))
            .copied()
    }

    /// Must not be called for a day that is still recent.
    pub fn set(&mut self, address: &str, date: NaiveDate, balance: WeiNewtype) {
        let key = self
            .key_for(address)
            .cloned()
            .unwrap_or_else(|| address.to_string());
        self.0.entry(key).or_default().insert(date, balance);
    }

    /// Drops every entry on or after `first_removed`, returns how many were dropped.
    pub fn remove_from(&mut self, first_removed: &NaiveDate) -> usize {
        let mut removed = 0;
        for daily_balances in self.0.values_mut() {
            let too_recent = daily_balances.split_off(first_removed);
            removed += too_recent.len();
        }
        removed
    }

    /// Drops every entry before `first_kept`, and addresses left without entries. Returns how
    /// many days were dropped.
    pub fn remove_before(&mut self, first_kept: &NaiveDate) -> usize {
        let mut removed = 0;
        for daily_balances in self.0.values_mut() {
            let kept = daily_balances.split_off(first_kept);
            removed += daily_balances.len();
            *daily_balances = kept;
        }
        self.0.retain(|_, daily_balances| !daily_balances.is_empty());
        removed
    }

    /// Number of cached days across all addresses.
    pub fn len(&self) -> usize {
        self.0.values().map(|daily_balances| daily_balances.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[automock]
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// Never fails, missing or unreadable state is an empty store.
    async fn load(&self) -> CacheStore;
    /// Replaces all persisted state with `store`.
    async fn save(&self, store: &CacheStore) -> Result<()>;
}

/// A pretty printed JSON file. Writes are not atomic, concurrent savers race and the last one
/// wins.
pub struct BalanceCacheFile {
    path: PathBuf,
}

impl BalanceCacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BalanceCache for BalanceCacheFile {
    async fn load(&self) -> CacheStore {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no balance cache yet, starting empty");
                return CacheStore::default();
            }
            Err(err) => {
                warn!(path = %self.path.display(), "failed to read balance cache, starting empty: {err}");
                return CacheStore::default();
            }
        };

        match serde_json::from_str::<CacheStore>(&text) {
            Ok(store) => {
                debug!(path = %self.path.display(), entries = store.len(), "loaded balance cache");
                store
            }
            Err(err) => {
                warn!(path = %self.path.display(), "failed to parse balance cache, starting empty: {err}");
                CacheStore::default()
            }
        }
    }

    async fn save(&self, store: &CacheStore) -> Result<()> {
        let json = serde_json::to_string_pretty(store)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write balance cache to {}", self.path.display()))?;
        debug!(path = %self.path.display(), entries = store.len(), "saved balance cache");
        Ok(())
    }
}

/// Keeps the store in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemoryBalanceCache {
    store: Mutex<CacheStore>,
    save_count: AtomicUsize,
}

impl MemoryBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: CacheStore) -> Self {
        Self {
            store: Mutex::new(store),
            save_count: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> CacheStore {
        self.store.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceCache for MemoryBalanceCache {
    async fn load(&self) -> CacheStore {
        self.stored()
    }

    async fn save(&self, store: &CacheStore) -> Result<()> {
        *self.store.lock().unwrap() = store.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
