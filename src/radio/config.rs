//! # Radio Configuration
//!
//! Two layers of configuration:
//!
//! - [`RfSettings`]: the raw register table written at init (frequency,
//!   modulation, packet control). The default is the SmartRF Studio export for
//!   2433 MHz, 250 kBaud MSK, variable length packets with CRC and appended
//!   status bytes.
//! - [`RadioConfig`]: driver behaviour (channel, power table, poll bounds, RSSI
//!   offset) plus the register table.
//!
//! Both load from JSON; every field is optional:
//! ```json
//! {
//!   "channel": 131,
//!   "max_packet_len": 7,
//!   "poll_limit": 5000
//! }
//! ```

use crate::error::RadioError;
use crate::radio::registers::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Register table applied by `init()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfSettings {
    pub fsctrl1: u8,
    pub fsctrl0: u8,
    pub freq2: u8,
    pub freq1: u8,
    pub freq0: u8,
    pub mdmcfg4: u8,
    pub mdmcfg3: u8,
    pub mdmcfg2: u8,
    pub mdmcfg1: u8,
    pub mdmcfg0: u8,
    pub channr: u8,
    pub deviatn: u8,
    pub frend1: u8,
    pub frend0: u8,
    pub mcsm0: u8,
    pub foccfg: u8,
    pub bscfg: u8,
    pub agcctrl2: u8,
    pub agcctrl1: u8,
    pub agcctrl0: u8,
    pub fscal3: u8,
    pub fscal2: u8,
    pub fscal1: u8,
    pub fscal0: u8,
    pub fstest: u8,
    pub test2: u8,
    pub test1: u8,
    pub test0: u8,
    pub fifothr: u8,
    pub iocfg2: u8,
    pub iocfg0: u8,
    pub pktctrl1: u8,
    pub pktctrl0: u8,
    pub addr: u8,
    pub pktlen: u8,
}

impl Default for RfSettings {
    fn default() -> Self {
        Self {
            fsctrl1: 0x12,
            fsctrl0: 0x00,
            freq2: 0x5D,
            freq1: 0x93,
            freq0: 0xB1,
            mdmcfg4: 0x2D,
            mdmcfg3: 0x3B,
            mdmcfg2: 0xF3,
            mdmcfg1: 0x22,
            mdmcfg0: 0xF8,
            channr: 0x00,
            deviatn: 0x01,
            frend1: 0xB6,
            frend0: 0x10,
            mcsm0: 0x18,
            foccfg: 0x1D,
            bscfg: 0x1C,
            agcctrl2: 0xC7,
            agcctrl1: 0x00,
            agcctrl0: 0xB0,
            fscal3: 0xEA,
            fscal2: 0x0A,
            fscal1: 0x00,
            fscal0: 0x11,
            fstest: 0x59,
            test2: 0x88,
            test1: 0x31,
            test0: 0x0B,
            fifothr: 0x07,
            iocfg2: 0x29, // CHIP_RDY
            iocfg0: 0x06, // sync word
            pktctrl1: 0x04, // append status
            pktctrl0: 0x05, // CRC, variable length
            addr: 0x00,
            pktlen: 0xFF,
        }
    }
}

impl RfSettings {
    /// Register writes in the order they are applied
    pub fn register_writes(&self) -> [(u8, u8); 35] {
        [
            (REG_FSCTRL1, self.fsctrl1),
            (REG_FSCTRL0, self.fsctrl0),
            (REG_FREQ2, self.freq2),
            (REG_FREQ1, self.freq1),
            (REG_FREQ0, self.freq0),
            (REG_MDMCFG4, self.mdmcfg4),
            (REG_MDMCFG3, self.mdmcfg3),
            (REG_MDMCFG2, self.mdmcfg2),
            (REG_MDMCFG1, self.mdmcfg1),
            (REG_MDMCFG0, self.mdmcfg0),
            (REG_CHANNR, self.channr),
            (REG_DEVIATN, self.deviatn),
            (REG_FREND1, self.frend1),
            (REG_FREND0, self.frend0),
            (REG_MCSM0, self.mcsm0),
            (REG_FOCCFG, self.foccfg),
            (REG_BSCFG, self.bscfg),
            (REG_AGCCTRL2, self.agcctrl2),
            (REG_AGCCTRL1, self.agcctrl1),
            (REG_AGCCTRL0, self.agcctrl0),
            (REG_FSCAL3, self.fscal3),
            (REG_FSCAL2, self.fscal2),
            (REG_FSCAL1, self.fscal1),
            (REG_FSCAL0, self.fscal0),
            (REG_FSTEST, self.fstest),
            (REG_TEST2, self.test2),
            (REG_TEST1, self.test1),
            (REG_TEST0, self.test0),
            (REG_FIFOTHR, self.fifothr),
            (REG_IOCFG2, self.iocfg2),
            (REG_IOCFG0, self.iocfg0),
            (REG_PKTCTRL1, self.pktctrl1),
            (REG_PKTCTRL0, self.pktctrl0),
            (REG_ADDR, self.addr),
            (REG_PKTLEN, self.pktlen),
        ]
    }
}

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Channel number written after the register table
    pub channel: u8,
    /// PATABLE entry (output power)
    pub pa_table: u8,
    /// RX FIFO threshold nibble; 15 means interrupt at end of packet only
    pub fifo_threshold: u8,
    /// Largest payload accepted by `send`
    pub max_packet_len: u8,
    /// RSSI offset subtracted after conversion, in dB
    pub rssi_offset_db: i16,
    /// Maximum status polls while waiting for a state or a stable RXBYTES
    pub poll_limit: u32,
    /// Maximum TXBYTES polls while waiting for a transmit to drain
    pub tx_poll_limit: u32,
    /// Delay between polls, in microseconds
    pub poll_interval_us: u32,
    /// CSn low pulse at power-on reset
    pub reset_pulse_us: u32,
    /// CSn high hold time at power-on reset
    pub reset_hold_us: u32,
    pub rf_settings: RfSettings,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            pa_table: DEFAULT_PATABLE,
            fifo_threshold: 15,
            max_packet_len: (FIFO_SIZE - 1 - RX_STATUS_LEN) as u8,
            rssi_offset_db: DEFAULT_RSSI_OFFSET_DB,
            poll_limit: 10_000,
            tx_poll_limit: 50_000,
            poll_interval_us: 0,
            reset_pulse_us: 10,
            reset_hold_us: 40,
            rf_settings: RfSettings::default(),
        }
    }
}

impl RadioConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, RadioError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RadioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RadioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RadioError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, RadioError> {
        serde_json::to_string_pretty(self).map_err(|e| RadioError::Config(e.to_string()))
    }

    /// Check values the chip or the driver cannot honour
    pub fn validate(&self) -> Result<(), RadioError> {
        if self.max_packet_len == 0 {
            return Err(RadioError::Config("max_packet_len must be non-zero".into()));
        }
        // length byte + payload + status bytes must fit the RX FIFO
        if self.max_packet_len as usize + 1 + RX_STATUS_LEN > FIFO_SIZE {
            return Err(RadioError::Config(format!(
                "max_packet_len {} does not fit the {FIFO_SIZE}-byte FIFO",
                self.max_packet_len
            )));
        }
        if self.fifo_threshold > 0x0F {
            return Err(RadioError::Config(format!(
                "fifo_threshold {} exceeds 15",
                self.fifo_threshold
            )));
        }
        if self.poll_limit == 0 || self.tx_poll_limit == 0 {
            return Err(RadioError::Config("poll limits must be non-zero".into()));
        }
        Ok(())
    }
}
