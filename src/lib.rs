//! # cc2500-rs - A Rust Driver for the TI CC2500 Transceiver
//!
//! The cc2500-rs crate drives the packet transceiver state machine of the TI CC2500
//! 2.4 GHz radio, as fitted to the eZ430-RF2500 wireless sensor node.
//!
//! ## Features
//!
//! - Register, burst and strobe access over an injected 4-wire SPI [`Bus`](radio::hal::Bus)
//! - Chip reset, presence check and part/version verification
//! - Blocking transmit with bounded completion polling
//! - Interrupt-driven reception with CRC, RX overflow and TX underflow handling
//! - Variable-length framing with trailing RSSI/LQI status decoding
//! - A behavioural chip model and simulated air medium for host-side testing
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust
//! use cc2500_rs::radio::hal::sim::{Ether, SimulatedCc2500};
//! use cc2500_rs::{Cc2500Driver, RadioConfig};
//!
//! let ether = Ether::new();
//! let chip = SimulatedCc2500::attached(&ether);
//! let mut driver = Cc2500Driver::new(chip.bus(), chip.gdo(), RadioConfig::default());
//! driver.init().unwrap();
//! driver.send(&[0x01, 0x02, 0x03]).unwrap();
//! ```

pub mod error;
pub mod logging;
pub mod radio;
pub mod util;

pub use crate::error::{RadioError, RxError};
pub use crate::logging::{init_logger, log_info};

// Core driver types
pub use radio::config::{RadioConfig, RfSettings};
pub use radio::driver::{Cc2500Driver, RadioStats, RxEvent};
pub use radio::hal::{Bus, GdoLine, GdoPins, HalError};
pub use radio::mailbox::{ReceivedFrame, RxMailbox};
pub use radio::status::{ChipState, ChipStatus, FifoBytes, PktStatus};
