//! # CC2500 Error Handling
//!
//! This module defines the two error families of the crate:
//!
//! - [`RadioError`]: failures returned by driver operations (init, send, arming).
//! - [`RxError`]: runtime anomalies reported through the receive callback. Each
//!   maps onto a negative sentinel code so that the legacy
//!   "size or negative error code" convention can still be produced.

use crate::radio::hal::HalError;
use thiserror::Error;

/// Represents the errors returned by CC2500 driver operations.
#[derive(Debug, Error)]
pub enum RadioError {
    /// The chip did not echo the scratch register test pattern.
    #[error("Radio not responding: wrote 0x{wrote:02X}, read back 0x{read:02X}")]
    HardwareFault { wrote: u8, read: u8 },

    /// Wrong part number or an obsolete silicon revision.
    #[error("Unsupported device: partnum 0x{partnum:02X}, version {version}")]
    UnsupportedDevice { partnum: u8, version: u8 },

    /// A bounded poll loop ran out of iterations.
    #[error("Timeout waiting for: {0}")]
    Timeout(&'static str),

    /// Payload longer than the configured maximum packet length.
    #[error("Packet too long: {len} bytes (max {max})")]
    PacketTooLong { len: usize, max: u8 },

    /// The receive buffer cannot hold the payload plus the two status bytes.
    #[error("Receive buffer too small: {capacity} bytes for packets up to {length} bytes")]
    BufferTooSmall { capacity: usize, length: u8 },

    /// `rx_enter` was called before a receive buffer was registered.
    #[error("No receive buffer registered")]
    NoRxBuffer,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bus or GPIO failure in the hardware abstraction layer.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),
}

/// Errors delivered to the receive callback instead of a payload size.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Interrupt fired with nothing in the RX FIFO.
    #[error("Empty RX FIFO")]
    Empty,

    /// The RX FIFO overflowed; it has been flushed.
    #[error("RX FIFO overflow")]
    RxOverflow,

    /// Frame received with a failed hardware CRC check.
    #[error("Bad CRC")]
    BadCrc,

    /// The TX FIFO underflowed during a send; it has been flushed.
    #[error("TX FIFO underflow")]
    TxUnderflow,
}

impl RxError {
    /// Negative sentinel code, distinguishable from any payload size.
    pub const fn code(self) -> i16 {
        match self {
            RxError::Empty => -1,
            RxError::RxOverflow => -2,
            RxError::BadCrc => -3,
            RxError::TxUnderflow => -4,
        }
    }

    /// Inverse of [`RxError::code`].
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            -1 => Some(RxError::Empty),
            -2 => Some(RxError::RxOverflow),
            -3 => Some(RxError::BadCrc),
            -4 => Some(RxError::TxUnderflow),
            _ => None,
        }
    }
}
