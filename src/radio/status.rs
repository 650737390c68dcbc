//! # CC2500 Status Decoding
//!
//! Decoders for everything the chip reports about itself:
//!
//! - the status byte clocked out with every SPI header byte,
//! - the RXBYTES/TXBYTES FIFO counters,
//! - the PKTSTATUS register,
//! - the two status bytes appended to every received frame (RSSI, LQI/CRC_OK).
//!
//! ## Status Byte Layout
//!
//! ```text
//! bit 7   : CHIP_RDYn (0 = crystal running, chip ready)
//! bit 6:4 : state
//! bit 3:0 : FIFO bytes available (RX on read headers, free TX space on writes)
//! ```

use bitflags::bitflags;

/// Main radio control state, from bits 6:4 of the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipState {
    Idle = 0,
    Rx = 1,
    Tx = 2,
    FsTxOn = 3,
    Calibrate = 4,
    Settling = 5,
    RxFifoOverflow = 6,
    TxFifoUnderflow = 7,
}

impl ChipState {
    /// Decode a 3-bit state field
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => ChipState::Idle,
            1 => ChipState::Rx,
            2 => ChipState::Tx,
            3 => ChipState::FsTxOn,
            4 => ChipState::Calibrate,
            5 => ChipState::Settling,
            6 => ChipState::RxFifoOverflow,
            _ => ChipState::TxFifoUnderflow,
        }
    }

    /// Encode back to the 3-bit state field
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Decoded chip status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipStatus {
    raw: u8,
}

impl ChipStatus {
    pub const fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Crystal is running and the chip accepts commands
    pub const fn chip_ready(self) -> bool {
        self.raw & 0x80 == 0
    }

    pub const fn state(self) -> ChipState {
        ChipState::from_bits(self.raw >> 4)
    }

    /// FIFO bytes available, saturated at 15
    pub const fn fifo_bytes(self) -> u8 {
        self.raw & 0x0F
    }

    /// Build a status byte (used by the chip model)
    pub const fn compose(ready: bool, state: ChipState, fifo_bytes: u8) -> Self {
        let rdy = if ready { 0x00 } else { 0x80 };
        let fifo = if fifo_bytes > 0x0F { 0x0F } else { fifo_bytes };
        Self {
            raw: rdy | (state.bits() << 4) | fifo,
        }
    }
}

/// Decoded RXBYTES / TXBYTES register
///
/// Bit 7 flags an RX overflow (RXBYTES) or TX underflow (TXBYTES),
/// bits 6:0 hold the number of bytes in the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoBytes {
    raw: u8,
}

impl FifoBytes {
    pub const XFLOW_BIT: u8 = 0x80;
    pub const COUNT_MASK: u8 = 0x7F;

    pub const fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Overflow (RX) or underflow (TX) flag
    pub const fn xflow(self) -> bool {
        self.raw & Self::XFLOW_BIT != 0
    }

    pub const fn count(self) -> u8 {
        self.raw & Self::COUNT_MASK
    }

    pub const fn compose(xflow: bool, count: u8) -> Self {
        let flag = if xflow { Self::XFLOW_BIT } else { 0 };
        Self {
            raw: flag | (count & Self::COUNT_MASK),
        }
    }
}

bitflags! {
    /// PKTSTATUS register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PktStatus: u8 {
        /// Last CRC comparison matched
        const CRC_OK = 0x80;
        /// Carrier sense
        const CS = 0x40;
        /// Preamble quality reached
        const PQT_REACHED = 0x20;
        /// Channel is clear
        const CCA = 0x10;
        /// Start of frame delimiter found
        const SFD = 0x08;
        /// Current GDO2 value
        const GDO2 = 0x04;
        /// Current GDO0 value
        const GDO0 = 0x01;
    }
}

/// Convert a raw RSSI byte to dBm.
///
/// The register is a two's-complement value in half-dB steps. Values at or
/// above 128 are negative; the half-dB remainder is floored so that raw 0 and
/// raw 255 land in adjacent one-dB buckets (-offset and -offset - 1).
pub const fn decode_rssi(raw: u8, offset_db: i16) -> i16 {
    ((raw as i8 as i16) >> 1) - offset_db
}

/// The two status bytes the chip appends to a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrameStatus {
    pub rssi_raw: u8,
    pub lqi_crc: u8,
}

impl RxFrameStatus {
    pub const CRC_OK_BIT: u8 = 0x80;
    pub const LQI_MASK: u8 = 0x7F;

    pub const fn new(rssi_raw: u8, lqi_crc: u8) -> Self {
        Self { rssi_raw, lqi_crc }
    }

    pub const fn crc_ok(self) -> bool {
        self.lqi_crc & Self::CRC_OK_BIT != 0
    }

    /// Link quality indicator (lower is better)
    pub const fn lqi(self) -> u8 {
        self.lqi_crc & Self::LQI_MASK
    }

    pub const fn rssi_dbm(self, offset_db: i16) -> i16 {
        decode_rssi(self.rssi_raw, offset_db)
    }
}
