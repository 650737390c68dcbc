//! # CC2500 Packet Transceiver Driver
//!
//! [`Cc2500Driver`] runs the packet state machine of the CC2500 over an
//! injected [`Bus`] and [`GdoPins`] pair.
//!
//! ## Transmit
//!
//! `send` is blocking: the radio is idled, the TX FIFO is loaded with the
//! length byte and the payload, STX is strobed and TXBYTES is polled until the
//! FIFO drains. A TX underflow is flushed and reported to the receive callback
//! as [`RxError::TxUnderflow`]; `send` itself still succeeds.
//!
//! ## Receive
//!
//! `rx_register_buffer` hands the driver a buffer, `rx_enter` arms the
//! receiver. When GDO0 fires (end of packet), `handle_interrupt` (or
//! `rx_packet_eop` directly) drains the FIFO, checks the hardware CRC flag and
//! invokes the callback with the payload, its size and the RSSI. The driver is
//! then unarmed; the application re-arms with `rx_enter`.
//!
//! ```text
//! RX FIFO: [len][payload ...][RSSI][CRC_OK | LQI]
//! ```
//!
//! ## Polling
//!
//! Every wait is bounded by [`RadioConfig::poll_limit`] (status polls) or
//! [`RadioConfig::tx_poll_limit`] (TXBYTES polls) and fails with
//! [`RadioError::Timeout`] instead of hanging.

use crate::error::{RadioError, RxError};
use crate::log_warn_throttled;
use crate::radio::config::RadioConfig;
use crate::radio::hal::{Bus, Edge, GdoLine, GdoPins, HalError};
use crate::radio::registers::*;
use crate::radio::status::{
    decode_rssi, ChipState, ChipStatus, FifoBytes, PktStatus, RxFrameStatus,
};
use crate::util::logging::{log_frame_hex, span_rx_interrupt, span_transmit, LogThrottle};
use log::{debug, info, warn};
use serde::Serialize;

/// Result of a receive, delivered to the callback from interrupt context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEvent<'a> {
    /// Received payload; empty on error
    pub payload: &'a [u8],
    /// Payload size, or the reason nothing was received
    pub result: Result<u8, RxError>,
    /// Signal strength in dBm; 0 on error
    pub rssi_dbm: i16,
    /// Link quality indicator; 0 on error
    pub lqi: u8,
}

impl<'a> RxEvent<'a> {
    fn error(err: RxError) -> Self {
        Self {
            payload: &[],
            result: Err(err),
            rssi_dbm: 0,
            lqi: 0,
        }
    }

    /// Payload size, or the negative error code
    pub fn size_or_code(&self) -> i16 {
        match self.result {
            Ok(size) => size as i16,
            Err(err) => err.code(),
        }
    }
}

/// Receive callback, invoked synchronously from interrupt context
pub type RxCallback = Box<dyn FnMut(RxEvent<'_>) + Send>;

/// Driver statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RadioStats {
    pub packets_sent: u32,
    pub packets_received: u32,
    pub crc_errors: u32,
    pub rx_overflows: u32,
    pub tx_underflows: u32,
    /// GDO0 interrupts with nothing in the RX FIFO
    pub empty_interrupts: u32,
    /// GDO0 edges seen while the receiver was not armed
    pub ignored_interrupts: u32,
    /// GDO2 sync word interrupts
    pub sync_words: u32,
}

/// CC2500 driver
pub struct Cc2500Driver<B: Bus, G: GdoPins> {
    bus: B,
    gdo: G,
    config: RadioConfig,
    rx_buffer: Option<Vec<u8>>,
    rx_length: u8,
    callback: Option<RxCallback>,
    armed: bool,
    stats: RadioStats,
    error_throttle: LogThrottle,
}

/// Run `f` with chip select asserted; chip select is released on every path
fn transaction<B: Bus, T>(
    bus: &mut B,
    f: impl FnOnce(&mut B) -> Result<T, HalError>,
) -> Result<T, HalError> {
    bus.select()?;
    let result = f(bus);
    let released = bus.deselect();
    let value = result?;
    released?;
    Ok(value)
}

/// Wait for SO to go low (crystal running). Returns false if it never did.
fn wait_miso_low<B: Bus>(bus: &mut B, limit: u32, interval_us: u32) -> Result<bool, HalError> {
    for _ in 0..limit {
        if !bus.miso_high()? {
            return Ok(true);
        }
        bus.delay_us(interval_us);
    }
    Ok(false)
}

fn read_burst_into<B: Bus>(bus: &mut B, addr: u8, out: &mut [u8]) -> Result<(), HalError> {
    transaction(bus, |bus| {
        bus.transfer(read_burst_header(addr))?;
        for byte in out.iter_mut() {
            *byte = bus.transfer(SPI_DUMMY_BYTE)?;
        }
        Ok(())
    })
}

fn notify(callback: &mut Option<RxCallback>, event: RxEvent<'_>) {
    if let Some(cb) = callback.as_mut() {
        cb(event);
    }
}

impl<B: Bus, G: GdoPins> Cc2500Driver<B, G> {
    /// Create a driver; the chip is not touched until [`init`](Self::init)
    pub fn new(bus: B, gdo: G, config: RadioConfig) -> Self {
        Self {
            bus,
            gdo,
            config,
            rx_buffer: None,
            rx_length: 0,
            callback: None,
            armed: false,
            stats: RadioStats::default(),
            error_throttle: LogThrottle::new(60_000, 5),
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn stats(&self) -> RadioStats {
        self.stats
    }

    /// Receiver armed and waiting for an end-of-packet interrupt
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Give back the bus and GDO handles
    pub fn release(self) -> (B, G) {
        (self.bus, self.gdo)
    }

    // ----- initialisation -----

    /// Reset, verify and configure the radio
    pub fn init(&mut self) -> Result<(), RadioError> {
        info!("Initializing CC2500 radio");
        self.armed = false;

        self.power_on_reset()?;
        self.verify_spi()?;
        self.verify_chip()?;
        self.configure()?;

        info!("CC2500 radio initialized on channel {}", self.config.channel);
        Ok(())
    }

    /// Manual power-on reset: CSn pulse, then SRES once the crystal runs
    fn power_on_reset(&mut self) -> Result<(), RadioError> {
        let limit = self.config.poll_limit;
        let interval = self.config.poll_interval_us;

        self.bus.select()?;
        self.bus.delay_us(self.config.reset_pulse_us);
        self.bus.deselect()?;
        self.bus.delay_us(self.config.reset_hold_us);

        let stalled = transaction(&mut self.bus, |bus| {
            if !wait_miso_low(bus, limit, interval)? {
                return Ok(Some("crystal start"));
            }
            bus.transfer(STROBE_SRES)?;
            Ok((!wait_miso_low(bus, limit, interval)?).then_some("chip reset"))
        })?;
        if let Some(what) = stalled {
            warn!("MISO stayed high during {what}");
            return Err(RadioError::Timeout(what));
        }
        debug!("CC2500 reset complete");
        Ok(())
    }

    /// Write a test pattern to a scratch register and read it back
    fn verify_spi(&mut self) -> Result<(), RadioError> {
        self.write_register(REG_PKTLEN, SPI_TEST_PATTERN)?;
        let read = self.read_register(REG_PKTLEN)?;
        if read != SPI_TEST_PATTERN {
            return Err(RadioError::HardwareFault {
                wrote: SPI_TEST_PATTERN,
                read,
            });
        }
        Ok(())
    }

    fn verify_chip(&mut self) -> Result<(), RadioError> {
        let partnum = self.read_status_register(REG_PARTNUM)?;
        let version = self.read_status_register(REG_VERSION)?;
        info!("CC2500 part number 0x{partnum:02X}, version {version}");

        if partnum != CC2500_PARTNUM || version < CC2500_MIN_VERSION {
            return Err(RadioError::UnsupportedDevice { partnum, version });
        }
        Ok(())
    }

    fn configure(&mut self) -> Result<(), RadioError> {
        for (addr, value) in self.config.rf_settings.register_writes() {
            self.write_register(addr, value)?;
        }
        self.set_pa_table(self.config.pa_table)?;

        self.set_fifo_threshold(self.config.fifo_threshold)?;
        self.gdo0_set_signal(GDO_RX_FIFO_EOP)?;
        self.gdo.set_edge(GdoLine::Gdo0, Edge::OnAssert)?;
        self.gdo.disable_interrupt(GdoLine::Gdo0)?;

        self.gdo2_set_signal(GDO_SYNC_WORD)?;
        self.gdo.set_edge(GdoLine::Gdo2, Edge::OnAssert)?;
        self.gdo.disable_interrupt(GdoLine::Gdo2)?;
        self.clear_gdo_flags()?;

        // the register table resets PKTLEN
        if self.rx_buffer.is_some() {
            self.write_register(REG_PKTLEN, self.rx_length)?;
        }

        self.set_channel(self.config.channel)
    }

    /// SRES strobe; the register table must be reapplied afterwards
    pub fn reset(&mut self) -> Result<(), RadioError> {
        self.armed = false;
        self.strobe(STROBE_SRES)?;
        self.wait_for_state(ChipState::Idle, "reset")
    }

    /// Leave power down: wait for the crystal, then idle.
    ///
    /// PATABLE and the test registers are lost in power down; reload them with
    /// [`set_pa_table`](Self::set_pa_table) and recalibrate.
    pub fn wakeup(&mut self) -> Result<(), RadioError> {
        let limit = self.config.poll_limit;
        let interval = self.config.poll_interval_us;
        if !transaction(&mut self.bus, |bus| wait_miso_low(bus, limit, interval))? {
            return Err(RadioError::Timeout("wake up"));
        }
        self.idle()?;
        debug!("CC2500 awake");
        Ok(())
    }

    // ----- state control -----

    /// Disable GDO interrupts, flush any FIFO error and go to IDLE
    pub fn idle(&mut self) -> Result<(), RadioError> {
        self.gdo.disable_interrupt(GdoLine::Gdo0)?;
        self.gdo.disable_interrupt(GdoLine::Gdo2)?;
        self.armed = false;
        self.flush_fifo_xflow()?;
        self.strobe(STROBE_SIDLE)?;
        self.wait_for_state(ChipState::Idle, "idle")
    }

    /// Enter power down
    pub fn sleep(&mut self) -> Result<(), RadioError> {
        self.idle()?;
        self.strobe(STROBE_SPWD)?;
        debug!("CC2500 powered down");
        Ok(())
    }

    /// Calibrate the frequency synthesizer
    pub fn calibrate(&mut self) -> Result<(), RadioError> {
        self.idle()?;
        self.strobe(STROBE_SCAL)?;
        self.wait_for_state(ChipState::Idle, "calibration")
    }

    /// Flush TX on underflow, RX on overflow
    fn flush_fifo_xflow(&mut self) -> Result<(), RadioError> {
        if self.status()?.state() == ChipState::TxFifoUnderflow {
            debug!("Flushing TX FIFO after underflow");
            self.strobe(STROBE_SFTX)?;
        }
        if self.status()?.state() == ChipState::RxFifoOverflow {
            debug!("Flushing RX FIFO after overflow");
            self.strobe(STROBE_SFRX)?;
        }
        Ok(())
    }

    fn wait_for_state(&mut self, target: ChipState, what: &'static str) -> Result<(), RadioError> {
        for _ in 0..self.config.poll_limit {
            if self.status()?.state() == target {
                return Ok(());
            }
            self.bus.delay_us(self.config.poll_interval_us);
        }
        warn!("Timeout waiting for {what} ({target:?})");
        Err(RadioError::Timeout(what))
    }

    // ----- transmit -----

    /// Transmit one packet and wait until it has left the FIFO
    pub fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > self.config.max_packet_len as usize {
            return Err(RadioError::PacketTooLong {
                len: payload.len(),
                max: self.config.max_packet_len,
            });
        }
        let _span = span_transmit(payload.len());

        self.idle()?;
        self.gdo.disable_interrupt(GdoLine::Gdo2)?;

        self.write_register(FIFO_ADDR, payload.len() as u8)?;
        self.write_burst(FIFO_ADDR, payload)?;
        log_frame_hex("TX frame", payload);

        self.strobe(STROBE_STX)?;
        let drained = self.wait_tx_drained();

        match drained {
            Ok(true) => {
                self.stats.tx_underflows += 1;
                log_warn_throttled!(self.error_throttle, "TX FIFO underflow, flushing");
                self.flush_fifo_xflow()?;
                notify(&mut self.callback, RxEvent::error(RxError::TxUnderflow));
            }
            Ok(false) => {
                self.stats.packets_sent += 1;
                debug!("Sent {} byte packet", payload.len());
            }
            Err(_) => {}
        }

        self.clear_gdo_flags()?;
        drained.map(|_| ())
    }

    /// Poll TXBYTES until empty; returns true on underflow
    fn wait_tx_drained(&mut self) -> Result<bool, RadioError> {
        for _ in 0..self.config.tx_poll_limit {
            let txbytes = FifoBytes::from_raw(self.read_status_register(REG_TXBYTES)?);
            if txbytes.xflow() {
                return Ok(true);
            }
            if txbytes.count() == 0 {
                return Ok(false);
            }
            self.bus.delay_us(self.config.poll_interval_us);
        }
        warn!("TX FIFO did not drain");
        Err(RadioError::Timeout("TX FIFO drain"))
    }

    // ----- receive -----

    /// Register the callback receiving packets and errors
    pub fn register_receive_callback<F>(&mut self, callback: F)
    where
        F: FnMut(RxEvent<'_>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Register the receive buffer and set the maximum payload length.
    ///
    /// The buffer must hold `length` payload bytes plus the two status bytes.
    /// Returns the previously registered buffer.
    pub fn rx_register_buffer(
        &mut self,
        buffer: Vec<u8>,
        length: u8,
    ) -> Result<Option<Vec<u8>>, RadioError> {
        if buffer.len() < length as usize + RX_STATUS_LEN {
            return Err(RadioError::BufferTooSmall {
                capacity: buffer.len(),
                length,
            });
        }
        self.write_register(REG_PKTLEN, length)?;
        self.rx_length = length;
        Ok(self.rx_buffer.replace(buffer))
    }

    /// Take back the receive buffer. The receiver is idled and its FIFO
    /// emptied, so nothing is captured until the next `rx_enter`.
    pub fn rx_take_buffer(&mut self) -> Result<Option<Vec<u8>>, RadioError> {
        self.idle_and_flush_rx()?;
        Ok(self.rx_buffer.take())
    }

    /// Arm the receiver. Required again after every received packet.
    pub fn rx_enter(&mut self) -> Result<(), RadioError> {
        if self.rx_buffer.is_none() {
            return Err(RadioError::NoRxBuffer);
        }
        self.idle_and_flush_rx()?;

        self.clear_gdo_flags()?;
        self.gdo.enable_interrupt(GdoLine::Gdo0)?;
        self.gdo.disable_interrupt(GdoLine::Gdo2)?;

        self.strobe(STROBE_SRX)?;
        self.wait_for_state(ChipState::Rx, "receive")?;
        self.armed = true;
        debug!("Receiver armed");
        Ok(())
    }

    /// End-of-packet handler, called from the GDO0 interrupt
    pub fn rx_packet_eop(&mut self) -> Result<(), RadioError> {
        if !self.armed {
            self.stats.ignored_interrupts += 1;
            debug!("GDO0 edge while receiver not armed, ignored");
            return self.clear_gdo_flags();
        }

        let result = self.read_rx_frame();
        self.armed = false;
        self.gdo.disable_interrupt(GdoLine::Gdo0)?;
        self.clear_gdo_flags()?;
        result
    }

    fn read_rx_frame(&mut self) -> Result<(), RadioError> {
        let rxbytes = self.read_rxbytes_stable()?;

        if rxbytes.xflow() {
            self.stats.rx_overflows += 1;
            log_warn_throttled!(self.error_throttle, "RX FIFO overflow");
            self.flush_fifo_xflow()?;
            notify(&mut self.callback, RxEvent::error(RxError::RxOverflow));
            return Ok(());
        }
        if rxbytes.count() == 0 {
            self.stats.empty_interrupts += 1;
            debug!("End of packet with empty RX FIFO");
            self.flush_fifo_xflow()?;
            notify(&mut self.callback, RxEvent::error(RxError::Empty));
            return Ok(());
        }

        let size = self.read_register(FIFO_ADDR)? as usize;
        let Some(buffer) = self.rx_buffer.as_mut() else {
            self.strobe(STROBE_SFRX)?;
            return Err(RadioError::NoRxBuffer);
        };

        // the burst length trusts RXBYTES; `size` only marks the status bytes
        let wanted = rxbytes.count() as usize - 1;
        let read = wanted.min(buffer.len());
        read_burst_into(&mut self.bus, FIFO_ADDR, &mut buffer[..read])?;

        if wanted > read {
            self.stats.rx_overflows += 1;
            log_warn_throttled!(
                self.error_throttle,
                "RX frame of {wanted} bytes exceeds {read} byte buffer"
            );
            self.strobe(STROBE_SFRX)?;
            notify(&mut self.callback, RxEvent::error(RxError::RxOverflow));
            return Ok(());
        }

        let frame_status = if size + RX_STATUS_LEN <= read {
            Some(RxFrameStatus::new(
                buffer[size + FRAME_RSSI_OFFSET],
                buffer[size + FRAME_LQI_OFFSET],
            ))
        } else {
            None
        };

        match frame_status {
            Some(status) if status.crc_ok() => {
                let rssi_dbm = status.rssi_dbm(self.config.rssi_offset_db);
                self.stats.packets_received += 1;
                debug!("Received {size} byte packet, RSSI {rssi_dbm} dBm, LQI {}", status.lqi());
                log_frame_hex("RX frame", &buffer[..size]);
                notify(
                    &mut self.callback,
                    RxEvent {
                        payload: &buffer[..size],
                        result: Ok(size as u8),
                        rssi_dbm,
                        lqi: status.lqi(),
                    },
                );
            }
            _ => {
                self.stats.crc_errors += 1;
                log_warn_throttled!(self.error_throttle, "CRC error on received frame");
                self.flush_fifo_xflow()?;
                notify(&mut self.callback, RxEvent::error(RxError::BadCrc));
            }
        }
        Ok(())
    }

    /// Go to IDLE and drop any unread frame.
    ///
    /// SRX keeps the FIFO contents, and the first byte read after an end of
    /// packet is taken as the length, so the FIFO must be empty when arming.
    fn idle_and_flush_rx(&mut self) -> Result<(), RadioError> {
        self.idle()?;
        self.strobe(STROBE_SFRX)?;
        Ok(())
    }

    /// Read RXBYTES until two consecutive reads agree.
    ///
    /// Counts of two or more are not trusted on a single read either; every
    /// value needs a confirming read.
    fn read_rxbytes_stable(&mut self) -> Result<FifoBytes, RadioError> {
        let mut previous = self.read_status_register(REG_RXBYTES)?;
        for _ in 0..self.config.poll_limit {
            let current = self.read_status_register(REG_RXBYTES)?;
            if current == previous {
                return Ok(FifoBytes::from_raw(current));
            }
            previous = current;
            self.bus.delay_us(self.config.poll_interval_us);
        }
        warn!("RXBYTES never settled");
        Err(RadioError::Timeout("stable RXBYTES"))
    }

    /// Dispatch a GDO port interrupt. Returns true if a line was pending.
    pub fn handle_interrupt(&mut self) -> Result<bool, RadioError> {
        let _span = span_rx_interrupt(self.armed);

        // latch both lines first; the EOP handler clears every flag
        let gdo0 = self.gdo.is_pending(GdoLine::Gdo0)?;
        let gdo2 = self.gdo.is_pending(GdoLine::Gdo2)?;

        if gdo2 {
            self.stats.sync_words += 1;
            self.gdo.clear_flag(GdoLine::Gdo2)?;
        }
        if gdo0 {
            self.rx_packet_eop()?;
        }
        Ok(gdo0 || gdo2)
    }

    fn clear_gdo_flags(&mut self) -> Result<(), RadioError> {
        self.gdo.clear_flag(GdoLine::Gdo0)?;
        self.gdo.clear_flag(GdoLine::Gdo2)?;
        Ok(())
    }

    // ----- configuration -----

    pub fn set_channel(&mut self, channel: u8) -> Result<(), RadioError> {
        self.write_register(REG_CHANNR, channel)?;
        self.config.channel = channel;
        Ok(())
    }

    /// Set the RX FIFO threshold nibble, keeping the upper FIFOTHR bits
    pub fn set_fifo_threshold(&mut self, threshold: u8) -> Result<(), RadioError> {
        let fifothr = self.read_register(REG_FIFOTHR)?;
        self.write_register(REG_FIFOTHR, (fifothr & 0xF0) | (threshold & 0x0F))
    }

    pub fn gdo0_set_signal(&mut self, signal: u8) -> Result<(), RadioError> {
        self.write_register(REG_IOCFG0, signal & GDO_SIGNAL_MASK)
    }

    pub fn gdo2_set_signal(&mut self, signal: u8) -> Result<(), RadioError> {
        self.write_register(REG_IOCFG2, signal & GDO_SIGNAL_MASK)
    }

    /// Output power entry
    pub fn set_pa_table(&mut self, value: u8) -> Result<(), RadioError> {
        self.write_register(PATABLE_ADDR, value)
    }

    // ----- diagnostics -----

    /// Chip status byte, fetched with SNOP
    pub fn status(&mut self) -> Result<ChipStatus, RadioError> {
        self.strobe(STROBE_SNOP)
    }

    pub fn packet_status(&mut self) -> Result<PktStatus, RadioError> {
        let raw = self.read_status_register(REG_PKTSTATUS)?;
        Ok(PktStatus::from_bits_truncate(raw))
    }

    /// Clear channel assessment
    pub fn cca(&mut self) -> Result<bool, RadioError> {
        Ok(self.packet_status()?.contains(PktStatus::CCA))
    }

    /// Instantaneous RSSI in dBm
    pub fn rssi(&mut self) -> Result<i16, RadioError> {
        let raw = self.read_status_register(REG_RSSI)?;
        Ok(decode_rssi(raw, self.config.rssi_offset_db))
    }

    // ----- SPI access -----

    fn strobe(&mut self, strobe: u8) -> Result<ChipStatus, RadioError> {
        let status = transaction(&mut self.bus, |bus| bus.transfer(strobe))?;
        Ok(ChipStatus::from_raw(status))
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), RadioError> {
        transaction(&mut self.bus, |bus| {
            bus.transfer(write_header(addr))?;
            bus.transfer(value)?;
            Ok(())
        })?;
        Ok(())
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, RadioError> {
        let value = transaction(&mut self.bus, |bus| {
            bus.transfer(read_header(addr))?;
            bus.transfer(SPI_DUMMY_BYTE)
        })?;
        Ok(value)
    }

    /// Status registers need the burst bit
    fn read_status_register(&mut self, addr: u8) -> Result<u8, RadioError> {
        let value = transaction(&mut self.bus, |bus| {
            bus.transfer(read_burst_header(addr))?;
            bus.transfer(SPI_DUMMY_BYTE)
        })?;
        Ok(value)
    }

    fn write_burst(&mut self, addr: u8, data: &[u8]) -> Result<(), RadioError> {
        transaction(&mut self.bus, |bus| {
            bus.transfer(write_burst_header(addr))?;
            for &byte in data {
                bus.transfer(byte)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}
