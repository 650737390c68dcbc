//! # CC2500 Register Definitions and Constants
//!
//! Register addresses, command strobes, SPI header bits and GDO signal codes
//! for the TI CC2500 transceiver (datasheet tables 33-37).
//!
//! ## SPI Header Byte
//!
//! Every transaction starts with a header byte:
//! ```text
//! bit 7   : R/W   (1 = read)
//! bit 6   : burst (1 = burst access, also selects status registers on read)
//! bit 5:0 : address
//! ```
//! Addresses 0x30-0x3D are command strobes when written without data and
//! status registers when read with the burst bit set.

// =============================================================================
// Configuration Registers (0x00-0x2E)
// =============================================================================

/// GDO2 output pin configuration
pub const REG_IOCFG2: u8 = 0x00;
/// GDO1 output pin configuration
pub const REG_IOCFG1: u8 = 0x01;
/// GDO0 output pin configuration
pub const REG_IOCFG0: u8 = 0x02;
/// RX FIFO and TX FIFO thresholds
pub const REG_FIFOTHR: u8 = 0x03;
pub const REG_SYNC1: u8 = 0x04;
pub const REG_SYNC0: u8 = 0x05;
/// Packet length (maximum length in variable-length mode)
pub const REG_PKTLEN: u8 = 0x06;
pub const REG_PKTCTRL1: u8 = 0x07;
pub const REG_PKTCTRL0: u8 = 0x08;
pub const REG_ADDR: u8 = 0x09;
/// Channel number
pub const REG_CHANNR: u8 = 0x0A;
pub const REG_FSCTRL1: u8 = 0x0B;
pub const REG_FSCTRL0: u8 = 0x0C;
pub const REG_FREQ2: u8 = 0x0D;
pub const REG_FREQ1: u8 = 0x0E;
pub const REG_FREQ0: u8 = 0x0F;
pub const REG_MDMCFG4: u8 = 0x10;
pub const REG_MDMCFG3: u8 = 0x11;
pub const REG_MDMCFG2: u8 = 0x12;
pub const REG_MDMCFG1: u8 = 0x13;
pub const REG_MDMCFG0: u8 = 0x14;
pub const REG_DEVIATN: u8 = 0x15;
pub const REG_MCSM2: u8 = 0x16;
pub const REG_MCSM1: u8 = 0x17;
pub const REG_MCSM0: u8 = 0x18;
pub const REG_FOCCFG: u8 = 0x19;
pub const REG_BSCFG: u8 = 0x1A;
pub const REG_AGCCTRL2: u8 = 0x1B;
pub const REG_AGCCTRL1: u8 = 0x1C;
pub const REG_AGCCTRL0: u8 = 0x1D;
pub const REG_WOREVT1: u8 = 0x1E;
pub const REG_WOREVT0: u8 = 0x1F;
pub const REG_WORCTRL: u8 = 0x20;
pub const REG_FREND1: u8 = 0x21;
pub const REG_FREND0: u8 = 0x22;
pub const REG_FSCAL3: u8 = 0x23;
pub const REG_FSCAL2: u8 = 0x24;
pub const REG_FSCAL1: u8 = 0x25;
pub const REG_FSCAL0: u8 = 0x26;
pub const REG_RCCTRL1: u8 = 0x27;
pub const REG_RCCTRL0: u8 = 0x28;
pub const REG_FSTEST: u8 = 0x29;
pub const REG_PTEST: u8 = 0x2A;
pub const REG_AGCTEST: u8 = 0x2B;
pub const REG_TEST2: u8 = 0x2C;
pub const REG_TEST1: u8 = 0x2D;
pub const REG_TEST0: u8 = 0x2E;

/// Number of read/write configuration registers
pub const CONFIG_REGISTER_COUNT: usize = 0x2F;

// =============================================================================
// Status Registers (read with burst bit)
// =============================================================================

/// Part number, 0x80 for the CC2500
pub const REG_PARTNUM: u8 = 0x30;
/// Silicon revision
pub const REG_VERSION: u8 = 0x31;
pub const REG_FREQEST: u8 = 0x32;
pub const REG_LQI: u8 = 0x33;
/// Instantaneous RSSI
pub const REG_RSSI: u8 = 0x34;
pub const REG_MARCSTATE: u8 = 0x35;
pub const REG_WORTIME1: u8 = 0x36;
pub const REG_WORTIME0: u8 = 0x37;
/// Current GDOx status and packet status
pub const REG_PKTSTATUS: u8 = 0x38;
pub const REG_VCO_VC_DAC: u8 = 0x39;
/// Underflow flag and number of bytes in the TX FIFO
pub const REG_TXBYTES: u8 = 0x3A;
/// Overflow flag and number of bytes in the RX FIFO
pub const REG_RXBYTES: u8 = 0x3B;
pub const REG_RCCTRL1_STATUS: u8 = 0x3C;
pub const REG_RCCTRL0_STATUS: u8 = 0x3D;

/// Power amplifier table
pub const PATABLE_ADDR: u8 = 0x3E;
/// TX FIFO on write, RX FIFO on read
pub const FIFO_ADDR: u8 = 0x3F;

// =============================================================================
// SPI Header Bits
// =============================================================================

pub const ACCESS_READ: u8 = 0x80;
pub const ACCESS_WRITE: u8 = 0x00;
pub const ACCESS_BURST: u8 = 0x40;
pub const ACCESS_SINGLE: u8 = 0x00;
pub const ACCESS_ADDRESS_MASK: u8 = 0x3F;

/// Byte clocked out while reading
pub const SPI_DUMMY_BYTE: u8 = 0x00;

// =============================================================================
// Command Strobes
// =============================================================================

/// Reset chip
pub const STROBE_SRES: u8 = 0x30;
/// Enable and calibrate frequency synthesizer
pub const STROBE_SFSTXON: u8 = 0x31;
/// Turn off crystal oscillator
pub const STROBE_SXOFF: u8 = 0x32;
/// Calibrate frequency synthesizer and turn it off
pub const STROBE_SCAL: u8 = 0x33;
/// Enable RX
pub const STROBE_SRX: u8 = 0x34;
/// Enable TX
pub const STROBE_STX: u8 = 0x35;
/// Exit RX/TX, turn off frequency synthesizer
pub const STROBE_SIDLE: u8 = 0x36;
/// Start wake-on-radio
pub const STROBE_SWOR: u8 = 0x38;
/// Enter power down mode when CSn goes high
pub const STROBE_SPWD: u8 = 0x39;
/// Flush the RX FIFO
pub const STROBE_SFRX: u8 = 0x3A;
/// Flush the TX FIFO
pub const STROBE_SFTX: u8 = 0x3B;
/// Reset real time clock
pub const STROBE_SWORRST: u8 = 0x3C;
/// No operation, returns the status byte
pub const STROBE_SNOP: u8 = 0x3D;

// =============================================================================
// GDOx Signal Selection (IOCFGx[5:0])
// =============================================================================

/// Asserts when RX FIFO is filled at or above the threshold
pub const GDO_RX_FIFO: u8 = 0x00;
/// Asserts at or above the RX FIFO threshold or at end of packet
pub const GDO_RX_FIFO_EOP: u8 = 0x01;
pub const GDO_TX_FIFO: u8 = 0x02;
pub const GDO_TX_THR_FULL: u8 = 0x03;
pub const GDO_RX_OVERFLOW: u8 = 0x04;
pub const GDO_TX_UNDERFLOW: u8 = 0x05;
/// Asserts on sync word sent/received, de-asserts at end of packet
pub const GDO_SYNC_WORD: u8 = 0x06;
pub const GDO_RX_CRC_OK: u8 = 0x07;
pub const GDO_PREAMBLE_OK: u8 = 0x08;
/// Clear channel assessment
pub const GDO_CCA: u8 = 0x09;
pub const GDO_CHIP_RDY: u8 = 0x29;
pub const GDO_XOSC_STABLE: u8 = 0x2B;

pub const GDO_SIGNAL_MASK: u8 = 0x3F;

// =============================================================================
// Identity and Framing Constants
// =============================================================================

/// Expected PARTNUM value
pub const CC2500_PARTNUM: u8 = 0x80;
/// Oldest supported silicon revision
pub const CC2500_MIN_VERSION: u8 = 0x03;

/// Value written to a scratch register to check the SPI link
pub const SPI_TEST_PATTERN: u8 = 0xA5;

/// Hardware FIFO depth (RX and TX each)
pub const FIFO_SIZE: usize = 64;

/// Status bytes appended to every received frame (RSSI, LQI/CRC_OK)
pub const RX_STATUS_LEN: usize = 2;
pub const FRAME_RSSI_OFFSET: usize = 0;
pub const FRAME_LQI_OFFSET: usize = 1;

/// RSSI offset in dB at 250 kbps (datasheet table 31)
pub const DEFAULT_RSSI_OFFSET_DB: i16 = 72;

/// Default PATABLE entry (0 dBm)
pub const DEFAULT_PATABLE: u8 = 0xFE;

/// Build a single-register write header
pub const fn write_header(addr: u8) -> u8 {
    (addr & ACCESS_ADDRESS_MASK) | ACCESS_WRITE | ACCESS_SINGLE
}

/// Build a single-register read header
pub const fn read_header(addr: u8) -> u8 {
    (addr & ACCESS_ADDRESS_MASK) | ACCESS_READ | ACCESS_SINGLE
}

/// Build a burst write header
pub const fn write_burst_header(addr: u8) -> u8 {
    (addr & ACCESS_ADDRESS_MASK) | ACCESS_WRITE | ACCESS_BURST
}

/// Build a burst read header (also used for status registers)
pub const fn read_burst_header(addr: u8) -> u8 {
    (addr & ACCESS_ADDRESS_MASK) | ACCESS_READ | ACCESS_BURST
}

/// True when `addr` is a command strobe
pub const fn is_strobe(addr: u8) -> bool {
    addr >= STROBE_SRES && addr <= STROBE_SNOP
}
