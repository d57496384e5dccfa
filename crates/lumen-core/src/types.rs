//! Wire-level type definitions for the Ethereum JSON-RPC surface the
//! indexer consumes.
//!
//! All hex-encoded quantities (`blockNumber`, `logIndex`, ...) are kept
//! verbatim as strings so that payloads survive a round-trip through the
//! indexer unchanged. Callers that need numeric values decode on demand via
//! [`crate::utils::hex::parse_hex_u64`].

use serde::{Deserialize, Serialize};

/// A raw EVM log as returned by `eth_getLogs` or nested inside a receipt.
///
/// `topics[0]`, when present, is the Keccak-256 hash of the event
/// signature. The `removed` flag is a reorg replay hint emitted by some
/// providers; the indexer passes it through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Address the log originated from.
    #[serde(default)]
    pub address: String,
    /// Zero to four 32-byte indexed arguments.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Non-indexed argument data.
    #[serde(default)]
    pub data: String,
    /// Hex quantity of the containing block; empty for pending logs.
    #[serde(default)]
    pub block_number: String,
    /// Hash of the transaction that produced this log.
    #[serde(default)]
    pub transaction_hash: String,
    /// Hex quantity index of the transaction within its block.
    #[serde(default)]
    pub transaction_index: String,
    /// Hash of the containing block.
    #[serde(default)]
    pub block_hash: String,
    /// Hex quantity index of the log within its block.
    #[serde(default)]
    pub log_index: String,
    /// True when the log was removed by a chain reorganization.
    #[serde(default)]
    pub removed: bool,
}

/// Block header subset returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Hex quantity block number.
    #[serde(default)]
    pub number: String,
    /// Block hash.
    #[serde(default)]
    pub hash: String,
    /// Hash of the parent block. Drives reorg detection.
    #[serde(default)]
    pub parent_hash: String,
    /// Hex quantity unix timestamp.
    #[serde(default)]
    pub timestamp: String,
}

/// Transaction receipt as returned by `eth_getBlockReceipts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default)]
    pub block_hash: String,
    #[serde(default)]
    pub block_number: String,
    /// Set only for contract-creation transactions.
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub cumulative_gas_used: String,
    #[serde(default)]
    pub effective_gas_price: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub gas_used: String,
    /// Logs produced by this transaction.
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub logs_bloom: String,
    /// `0x1` on success, `0x0` on failure.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub transaction_index: String,
    #[serde(default, rename = "type")]
    pub tx_type: String,
}

/// Filter object for `eth_getLogs`.
///
/// Topics are positional. `block_hash` is mutually exclusive with the
/// `from_block`/`to_block` pair at the wire level; the indexer only ever
/// sets the range form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Hex quantity or tag (`"latest"`), inclusive.
    pub from_block: String,
    /// Hex quantity or tag, inclusive.
    pub to_block: String,
    /// Contract addresses logs must originate from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
    /// Positional topic filter; entries are canonical 32-byte hex hashes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
}
