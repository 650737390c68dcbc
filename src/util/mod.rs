//! # Utility Modules
//!
//! Hex helpers and logging patterns shared by the driver and the CLI.

pub mod hex;
pub mod logging;

pub use hex::{format_hex_compact, parse_byte, parse_payload, HexError};
pub use logging::{log_frame_hex, LogThrottle};
