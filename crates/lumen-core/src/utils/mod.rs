//! Shared helpers: hex quantity codecs and topic canonicalization.

pub mod hex;
pub mod topics;

pub use hex::{format_hex_u64, parse_hex_u64};
pub use topics::{canonicalize_topics, keccak256, signature_to_topic};
