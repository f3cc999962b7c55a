//! Types and a client for the Blockscout/Etherscan style `?module=..&action=..` explorer API.
mod api;

use serde::{Deserialize, Serialize};

use crate::{json_codecs::u64_from_string_or_number, units::WeiNewtype};

pub use api::Explorer;
pub use api::ExplorerHttp;
pub use api::MockExplorer;

pub type BlockNumber = u64;

/// A native transfer as listed by `module=account&action=txlist`. Amount and timestamp are kept
/// as the explorer sent them and parsed later.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ExplorerTransaction {
    pub hash: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

/// One entry of a `module=account&action=balancemulti` response.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AccountBalance {
    pub account: String,
    pub balance: WeiNewtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

/// Etherscan sends the block number as the result itself, Blockscout wraps it in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlockNumberResult {
    Object {
        #[serde(rename = "blockNumber", deserialize_with = "u64_from_string_or_number")]
        block_number: BlockNumber,
    },
    Plain(#[serde(deserialize_with = "u64_from_string_or_number")] BlockNumber),
}

impl From<BlockNumberResult> for BlockNumber {
    fn from(result: BlockNumberResult) -> Self {
        match result {
            BlockNumberResult::Object { block_number } => block_number,
            BlockNumberResult::Plain(block_number) => block_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_blockscout_block_number_test() {
        let result: BlockNumberResult =
            serde_json::from_str(r#"{ "blockNumber": "4181309" }"#).unwrap();
        assert_eq!(BlockNumber::from(result), 4181309);
    }

    #[test]
    fn deserializes_etherscan_block_number_test() {
        let result: BlockNumberResult = serde_json::from_str(r#""4181309""#).unwrap();
        assert_eq!(BlockNumber::from(result), 4181309);
    }

    #[test]
    fn deserializes_transaction_test() {
        let json = r#"{
            "blockNumber": "65204",
            "timeStamp": "1439232889",
            "hash": "0x98beb27135aa0a25650557005ad962919d6a278c4b3dde7f4f6a3a1e65aa746c",
            "from": "0x3fb1cd2cd96c6d5c0b5eb3322d807b34482481d4",
            "to": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
            "value": "0",
            "isError": "0"
        }"#;

        let transaction: ExplorerTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(
            transaction,
            ExplorerTransaction {
                hash: "0x98beb27135aa0a25650557005ad962919d6a278c4b3dde7f4f6a3a1e65aa746c"
                    .to_string(),
                from: Some("0x3fb1cd2cd96c6d5c0b5eb3322d807b34482481d4".to_string()),
                to: Some("0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae".to_string()),
                value: "0".to_string(),
                time_stamp: "1439232889".to_string(),
            }
        );
    }

    #[test]
    fn deserializes_contract_creation_transaction_test() {
        let json = r#"{
            "timeStamp": "1439232889",
            "hash": "0xabc",
            "from": "0x3fb1cd2cd96c6d5c0b5eb3322d807b34482481d4",
            "to": null,
            "value": "0"
        }"#;

        let transaction: ExplorerTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(transaction.to, None);
    }

    #[test]
    fn serializes_account_balance_without_stale_test() {
        let account_balance = AccountBalance {
            account: "0xabc".to_string(),
            balance: WeiNewtype(5),
            stale: None,
        };
        assert_eq!(
            serde_json::to_string(&account_balance).unwrap(),
            r#"{"account":"0xabc","balance":"5"}"#
        );
    }
}
