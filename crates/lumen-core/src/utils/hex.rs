//! Hex quantity formatting and parsing.
//!
//! JSON-RPC encodes numeric quantities as lowercase hex strings with a
//! `0x` prefix and no leading zeros; zero itself is `"0x0"`.

/// Formats a `u64` as a hex quantity with `0x` prefix.
///
/// Zero is formatted as `"0x0"`.
#[must_use]
pub fn format_hex_u64(value: u64) -> String {
    if value == 0 {
        "0x0".to_string()
    } else {
        format!("0x{value:x}")
    }
}

/// Parses a hex quantity to `u64`.
///
/// Accepts strings with or without a `0x`/`0X` prefix. Returns `None` on
/// invalid hex or overflow.
#[must_use]
pub fn parse_hex_u64(hex: &str) -> Option<u64> {
    let hex_str = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    u64::from_str_radix(hex_str, 16).ok()
}
