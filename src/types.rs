use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical Starknet address form: `0x` prefix plus 64 hex digits.
pub const ADDRESS_LENGTH: usize = 66;

pub fn is_valid_contract_address(address: &str) -> bool {
    address.starts_with("0x")
        && address.len() == ADDRESS_LENGTH
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Parses a `0x`-prefixed felt word. Values wider than 128 bits return None.
pub fn parse_hex_u128(word: &str) -> Option<u128> {
    u128::from_str_radix(word.trim_start_matches("0x"), 16).ok()
}

/// A block as returned by `starknet_getBlockWithTxs`. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub block_number: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// One transaction inside a block. Starknet transaction variants differ in
/// shape, so everything beyond the hash is optional and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub transaction_hash: String,
    #[serde(default)]
    pub sender_address: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub calldata: Vec<String>,
    #[serde(default)]
    pub max_fee: Option<String>,
    #[serde(rename = "type", default)]
    pub tx_type: Option<String>,
}

impl Transaction {
    /// True when this transaction touches the given contract: it is the
    /// sender, the callee, or any calldata word contains the address with
    /// its `0x` prefix stripped. The calldata check is a substring match
    /// and can over-approximate.
    pub fn touches(&self, contract_address: &str) -> bool {
        if self.sender_address.as_deref() == Some(contract_address)
            || self.contract_address.as_deref() == Some(contract_address)
        {
            return true;
        }
        let needle = contract_address.trim_start_matches("0x");
        self.calldata.iter().any(|word| word.contains(needle))
    }
}

/// A raw contract event from `starknet_getEvents`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub data: Vec<String>,
}

/// One page of the paginated events protocol. A present continuation token
/// means more pages exist.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsPage {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Filter parameters for an events query, minus the continuation token.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub address: String,
    pub from_block: u64,
    pub to_block: u64,
    pub chunk_size: u32,
}

/// An event plus its decoding. `estimated_timestamp` is interpolated from
/// block positions, not read from the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub transaction_hash: String,
    pub keys: Vec<String>,
    pub data: Vec<String>,
    pub event_name: String,
    pub decoded_fields: Value,
    pub estimated_timestamp: u64,
    pub estimated_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityStatus {
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "No Recent Activity")]
    NoRecentActivity,
}

/// A transaction found relevant during a scan, recorded with its block's
/// number and timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub block_number: u64,
    pub transaction_hash: String,
    pub sender_address: String,
    pub contract_address: String,
    pub max_fee: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub timestamp: u64,
}

/// Aggregate view over one contract and one block range.
///
/// Aggregates cover every collected transaction; `transactions` is a
/// bounded sample. `failed_blocks` counts blocks the scan could not fetch,
/// so a clean empty scan is distinguishable from a degraded one.
#[derive(Debug, Clone, Serialize)]
pub struct ContractAnalysis {
    pub contract_address: String,
    pub status: ActivityStatus,
    pub transaction_count: usize,
    pub total_fees: String,
    pub avg_fee: String,
    pub unique_senders: usize,
    pub blocks_scanned: u64,
    pub failed_blocks: u64,
    pub current_block: u64,
    pub from_block: u64,
    pub to_block: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventQueryResult {
    pub contract_address: String,
    pub from_block: u64,
    pub to_block: u64,
    pub current_block: u64,
    pub total_event_count: usize,
    pub pages_fetched: u32,
    pub events: Vec<DecodedEvent>,
}
