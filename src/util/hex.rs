//! # Hex Helpers
//!
//! Hex formatting for frame logs and lenient hex parsing for payloads and
//! raw status bytes typed on the command line.

use thiserror::Error;

/// Errors that can occur while parsing hex input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Empty hex string")]
    EmptyString,

    #[error("Odd number of hex digits: {0}")]
    OddLength(usize),

    #[error("Invalid byte literal: {0}")]
    InvalidByte(String),

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Format bytes as "de ad be ef" for logs.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a payload given as hex, tolerating separators and a `0x` prefix.
///
/// `"0x01 02:03"`, `"010203"` and `"01-02-03"` all decode to `[1, 2, 3]`.
pub fn parse_payload(input: &str) -> Result<Vec<u8>, HexError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: String = body.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if digits.is_empty() {
        return Err(HexError::EmptyString);
    }
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    hex::decode(&digits).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Parse a single byte written as `0xNN` (hex) or plain decimal.
pub fn parse_byte(input: &str) -> Result<u8, HexError> {
    let s = input.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| HexError::InvalidByte(s.to_string()))
}
