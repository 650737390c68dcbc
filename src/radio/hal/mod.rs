//! # Hardware Abstraction Layer for the CC2500
//!
//! The driver touches hardware through two capabilities only:
//!
//! - [`Bus`]: the 4-wire SPI link (chip select, one-byte exchange, MISO sense)
//!   plus a microsecond delay used by the reset sequence and poll loops.
//! - [`GdoPins`]: the two GDO lines wired to edge-triggered GPIO interrupts,
//!   with enable/disable/clear-flag control.
//!
//! On the eZ430-RF2500 these map onto USCI_B0 (SPI, CSn on P3.0) and port 2
//! (GDO0 on P2.6, GDO2 on P2.7). The [`sim`] module provides a behavioural
//! chip model implementing both traits for host-side use.

use thiserror::Error;

pub mod sim;

/// Errors that can occur during HAL operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HalError {
    #[error("SPI communication error")]
    Spi,

    #[error("GPIO operation error")]
    Gpio,

    #[error("Chip select misuse: {0}")]
    ChipSelect(&'static str),
}

/// Synchronous serial link to the radio
pub trait Bus {
    /// Assert chip select (CSn low)
    fn select(&mut self) -> Result<(), HalError>;

    /// Deassert chip select (CSn high)
    fn deselect(&mut self) -> Result<(), HalError>;

    /// Clock one byte out and return the byte clocked in
    fn transfer(&mut self, byte: u8) -> Result<u8, HalError>;

    /// Level of the MISO (SO) line; high while the crystal is starting
    fn miso_high(&mut self) -> Result<bool, HalError>;

    /// Busy-wait for `us` microseconds
    fn delay_us(&mut self, us: u32);
}

/// GDO output line of the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GdoLine {
    /// Receive completion (RX FIFO threshold or end of packet)
    Gdo0,
    /// Secondary diagnostic line (sync word)
    Gdo2,
}

impl GdoLine {
    pub const ALL: [GdoLine; 2] = [GdoLine::Gdo0, GdoLine::Gdo2];
}

/// Which edge of a GDO line raises the interrupt flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high: the signal asserts
    OnAssert,
    /// High to low: the signal deasserts
    OnDeassert,
}

/// Edge-triggered GPIO interrupts on the GDO lines
pub trait GdoPins {
    fn set_edge(&mut self, line: GdoLine, edge: Edge) -> Result<(), HalError>;

    fn enable_interrupt(&mut self, line: GdoLine) -> Result<(), HalError>;

    fn disable_interrupt(&mut self, line: GdoLine) -> Result<(), HalError>;

    /// Clear the pending interrupt flag
    fn clear_flag(&mut self, line: GdoLine) -> Result<(), HalError>;

    /// Interrupt flag is set and the interrupt is enabled
    fn is_pending(&mut self, line: GdoLine) -> Result<bool, HalError>;

    /// Current pin level
    fn is_high(&mut self, line: GdoLine) -> Result<bool, HalError>;
}
