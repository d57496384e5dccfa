//! Event topic canonicalization.
//!
//! Chain configurations may list topics in three forms:
//!
//! - already-hashed, `0x`-prefixed (66 chars): kept as-is
//! - already-hashed, bare hex (64 chars): `0x` prefix is added
//! - a human-readable event signature such as
//!   `Transfer(address,address,uint256)`: whitespace is stripped and the
//!   Keccak-256 hash of the UTF-8 bytes is taken
//!
//! The output preserves input order because `eth_getLogs` topics are
//! positional. Canonicalization is idempotent: a canonical topic passes
//! through the 66-char branch unchanged.

use std::fmt::Write;

use tiny_keccak::{Hasher, Keccak};

/// Computes the Keccak-256 hash of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hashes an event signature to its canonical topic form.
///
/// `Transfer(address, address, uint256)` and
/// `Transfer(address,address,uint256)` produce the same topic.
#[must_use]
pub fn signature_to_topic(signature: &str) -> String {
    let cleaned: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    let hash = keccak256(cleaned.as_bytes());

    let mut topic = String::with_capacity(66);
    topic.push_str("0x");
    for byte in hash {
        let _ = write!(&mut topic, "{byte:02x}");
    }
    topic
}

/// Canonicalizes a list of configured topics, preserving order.
#[must_use]
pub fn canonicalize_topics(topics: &[String]) -> Vec<String> {
    topics
        .iter()
        .map(|topic| {
            if topic.len() == 66 && topic.starts_with("0x") {
                topic.clone()
            } else if topic.len() == 64 && !topic.starts_with("0x") {
                format!("0x{topic}")
            } else {
                signature_to_topic(topic)
            }
        })
        .collect()
}
