//! Balances at a historical block and live balances for the whole address list.
use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    explorer::{AccountBalance, BlockNumber, Explorer},
    units::WeiNewtype,
};

/// The explorer accepts at most this many addresses per balancemulti request.
pub const BALANCES_BATCH_SIZE: usize = 20;

/// `None` means no data, which is not the same as a zero balance.
pub async fn historical_balance(
    explorer: &impl Explorer,
    address: &str,
    block_number: BlockNumber,
) -> Option<WeiNewtype> {
    match explorer.get_balance_at_block(address, block_number).await {
        Ok(balance) if balance.is_negative() => {
            warn!(address, block_number, %balance, "explorer returned a negative balance");
            None
        }
        Ok(balance) => Some(balance),
        Err(err) => {
            warn!(address, block_number, "failed to fetch balance at block: {err:#}");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct LiveBalances {
    by_address: HashMap<String, WeiNewtype>,
    /// Entries exactly as the explorer returned them, across all batches.
    pub raw: Vec<AccountBalance>,
}

impl LiveBalances {
    pub fn get(&self, address: &str) -> Option<WeiNewtype> {
        self.by_address.get(&address.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl From<Vec<AccountBalance>> for LiveBalances {
    fn from(raw: Vec<AccountBalance>) -> Self {
        let by_address = raw
            .iter()
            .map(|account_balance| {
                (
                    account_balance.account.to_lowercase(),
                    account_balance.balance,
                )
            })
            .collect();

        Self { by_address, raw }
    }
}

/// Current balances, one request per batch of [`BALANCES_BATCH_SIZE`] addresses. A failed batch
/// only loses its own addresses.
pub async fn live_balances(explorer: &impl Explorer, addresses: &[String]) -> LiveBalances {
    let batches = addresses.chunks(BALANCES_BATCH_SIZE).map(|batch| async move {
        match explorer.get_balances(batch).await {
            Ok(balances) => balances,
            Err(err) => {
                warn!(batch_size = batch.len(), "failed to fetch live balances: {err:#}");
                Vec::new()
            }
        }
    });

    let raw: Vec<AccountBalance> = join_all(batches).await.into_iter().flatten().collect();
    debug!(
        addresses = addresses.len(),
        found = raw.len(),
        "fetched live balances"
    );

    raw.into()
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::explorer::MockExplorer;

    fn make_addresses(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("0xAbC{i:037x}")).collect()
    }

    fn echo_balances(addresses: &[String]) -> Vec<AccountBalance> {
        addresses
            .iter()
            .map(|address| AccountBalance {
                account: address.to_lowercase(),
                balance: WeiNewtype(address.len() as i128),
                stale: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn live_balances_batches_by_twenty_test() {
        let addresses = make_addresses(45);
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balances()
            .withf(|batch| batch.len() == 20)
            .times(2)
            .returning(|batch| Ok(echo_balances(batch)));
        explorer
            .expect_get_balances()
            .withf(|batch| batch.len() == 5)
            .times(1)
            .returning(|batch| Ok(echo_balances(batch)));

        let live_balances = live_balances(&explorer, &addresses).await;

        assert_eq!(live_balances.len(), 45);
        assert_eq!(live_balances.raw.len(), 45);
        for address in &addresses {
            assert!(live_balances.get(address).is_some());
        }
    }

    #[tokio::test]
    async fn live_balances_keeps_other_batches_on_failure_test() {
        let addresses = make_addresses(25);
        let first_batch_head = addresses[0].clone();
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balances()
            .withf(move |batch| batch[0] == first_batch_head)
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));
        explorer
            .expect_get_balances()
            .withf(|batch| batch.len() == 5)
            .times(1)
            .returning(|batch| Ok(echo_balances(batch)));

        let live_balances = live_balances(&explorer, &addresses).await;

        assert_eq!(live_balances.len(), 5);
        assert_eq!(live_balances.get(&addresses[0]), None);
        assert!(live_balances.get(&addresses[24]).is_some());
    }

    #[tokio::test]
    async fn live_balances_lookup_ignores_case_test() {
        let live_balances = LiveBalances::from(vec![AccountBalance {
            account: "0xabcdef".to_string(),
            balance: WeiNewtype(7),
            stale: None,
        }]);

        assert_eq!(live_balances.get("0xABCDEF"), Some(WeiNewtype(7)));
    }

    #[tokio::test]
    async fn live_balances_without_addresses_test() {
        let explorer = MockExplorer::new();
        let live_balances = live_balances(&explorer, &[]).await;
        assert!(live_balances.is_empty());
    }

    #[tokio::test]
    async fn historical_balance_test() {
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balance_at_block()
            .withf(|address, block_number| address == "0xabc" && *block_number == 100)
            .times(1)
            .returning(|_, _| Ok(WeiNewtype::from_eth(1)));

        let balance = historical_balance(&explorer, "0xabc", 100).await;
        assert_eq!(balance, Some(WeiNewtype::from_eth(1)));
    }

    #[tokio::test]
    async fn historical_balance_zero_is_data_test() {
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balance_at_block()
            .returning(|_, _| Ok(WeiNewtype::ZERO));

        let balance = historical_balance(&explorer, "0xabc", 100).await;
        assert_eq!(balance, Some(WeiNewtype::ZERO));
    }

    #[tokio::test]
    async fn historical_balance_failure_is_no_data_test() {
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balance_at_block()
            .returning(|_, _| Err(anyhow!("timed out")));

        assert_eq!(historical_balance(&explorer, "0xabc", 100).await, None);
    }

    #[tokio::test]
    async fn historical_balance_negative_is_no_data_test() {
        let mut explorer = MockExplorer::new();
        explorer
            .expect_get_balance_at_block()
            .returning(|_, _| Ok(WeiNewtype(-1)));

        assert_eq!(historical_balance(&explorer, "0xabc", 100).await, None);
    }
}
