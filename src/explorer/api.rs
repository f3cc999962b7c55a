use anyhow::{anyhow, Result};
use async_trait::async_trait;
use format_url::FormatUrl;
use mockall::automock;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{env::ENV_CONFIG, performance::TimedExt, units::WeiNewtype};

use super::{AccountBalance, BlockNumber, BlockNumberResult, ExplorerTransaction};

/// Every explorer response uses the same envelope. `status` is "1" on success, on failure
/// `result` usually holds an error message instead of data.
#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

/// What explorers answer, with status "0", for an address without any transactions.
const NO_TRANSACTIONS_FOUND: &str = "No transactions found";

impl ExplorerEnvelope {
    fn into_result(self) -> Result<Value> {
        if self.status != "1" {
            return Err(anyhow!(
                "explorer query failed, status = {}, message = {}, result = {}",
                self.status,
                self.message,
                self.result
            ));
        }

        Ok(self.result)
    }
}

/// The four queries the balance history depends on.
#[automock]
#[async_trait]
pub trait Explorer: Send + Sync {
    /// Native transfers to or from `address`, oldest first.
    async fn get_transactions(&self, address: &str) -> Result<Vec<ExplorerTransaction>>;
    /// The closest block at or before the given unix timestamp.
    async fn get_block_number_before(&self, timestamp: i64) -> Result<BlockNumber>;
    async fn get_balance_at_block(
        &self,
        address: &str,
        block_number: BlockNumber,
    ) -> Result<WeiNewtype>;
    /// Current balances for a batch of addresses in a single request.
    async fn get_balances(&self, addresses: &[String]) -> Result<Vec<AccountBalance>>;
}

pub struct ExplorerHttp {
    api_key: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl ExplorerHttp {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(ENV_CONFIG.explorer_timeout)
            .build()
            .expect("expect http client to build");

        Self {
            api_key: ENV_CONFIG.explorer_api_key.clone(),
            api_url: ENV_CONFIG.explorer_api_url.clone(),
            client,
        }
    }

    pub fn new_with_url(api_url: &str) -> Self {
        Self {
            api_key: None,
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn make_url<'a>(&'a self, query_params: Vec<(&'a str, &'a str)>) -> String {
        let mut query_params = query_params;
        if let Some(api_key) = self.api_key.as_deref() {
            query_params.push(("apikey", api_key));
        }

        FormatUrl::new(&self.api_url)
            .with_query_params(query_params)
            .format_url()
    }

    async fn get_envelope(&self, url: &str) -> Result<ExplorerEnvelope> {
        let envelope = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ExplorerEnvelope>()
            .await?;
        Ok(envelope)
    }

    /// Fetches the result of a query, treating anything but a status "1" envelope as a failure.
    async fn get_result<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let envelope = self.get_envelope(url).await?;
        let result = serde_json::from_value::<T>(envelope.into_result()?)?;
        Ok(result)
    }
}

impl Default for ExplorerHttp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Explorer for ExplorerHttp {
    async fn get_transactions(&self, address: &str) -> Result<Vec<ExplorerTransaction>> {
        debug!(address, "fetching transactions");
        let url = self.make_url(vec![
            ("module", "account"),
            ("action", "txlist"),
            ("address", address),
            ("sort", "asc"),
        ]);

        let envelope = self.get_envelope(&url).timed("get_transactions").await?;
        if envelope.status != "1"
            && envelope
                .message
                .eq_ignore_ascii_case(NO_TRANSACTIONS_FOUND)
        {
            return Ok(Vec::new());
        }

        // Records are decoded one by one so a single malformed one only loses itself.
        let records = serde_json::from_value::<Vec<Value>>(envelope.into_result()?)?;
        let transactions = records
            .into_iter()
            .filter_map(
                |record| match serde_json::from_value::<ExplorerTransaction>(record) {
                    Ok(transaction) => Some(transaction),
                    Err(err) => {
                        warn!(address, "skipping malformed transaction record: {err}");
                        None
                    }
                },
            )
            .collect();

        Ok(transactions)
    }

    async fn get_block_number_before(&self, timestamp: i64) -> Result<BlockNumber> {
        debug!(timestamp, "fetching block number by time");
        let timestamp = timestamp.to_string();
        let url = self.make_url(vec![
            ("module", "block"),
            ("action", "getblocknobytime"),
            ("timestamp", &timestamp),
            ("closest", "before"),
        ]);

        self.get_result::<BlockNumberResult>(&url)
            .timed("get_block_number_before")
            .await
            .map(BlockNumber::from)
    }

    async fn get_balance_at_block(
        &self,
        address: &str,
        block_number: BlockNumber,
    ) -> Result<WeiNewtype> {
        debug!(address, block_number, "fetching balance at block");
        let block_number = block_number.to_string();
        let url = self.make_url(vec![
            ("module", "account"),
            ("action", "balance"),
            ("address", address),
            ("block", &block_number),
        ]);

        self.get_result::<WeiNewtype>(&url)
            .timed("get_balance_at_block")
            .await
    }

    async fn get_balances(&self, addresses: &[String]) -> Result<Vec<AccountBalance>> {
        debug!(count = addresses.len(), "fetching balances");
        let joined_addresses = addresses.join(",");
        let url = self.make_url(vec![
            ("module", "account"),
            ("action", "balancemulti"),
            ("address", &joined_addresses),
        ]);

        // Some explorers report a non "1" status when any account in the batch is unknown while
        // still returning balances for the rest, only the shape of the result matters here.
        let envelope = self.get_envelope(&url).timed("get_balances").await?;
        let balances = serde_json::from_value::<Vec<AccountBalance>>(envelope.result)?;
        Ok(balances)
    }
}
