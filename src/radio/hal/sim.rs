//! # Simulated CC2500
//!
//! A behavioural model of the CC2500 that speaks the real SPI protocol, so the
//! driver can run unmodified on a host. Several simulated chips can share an
//! [`Ether`]; a frame transmitted by one is delivered to every other chip that
//! is in RX on the same channel.
//!
//! The model covers what the driver depends on:
//!
//! - header/status byte exchange, single and burst register access, FIFOs
//! - strobes and the main state machine, including RX overflow and TX underflow
//! - RXBYTES/TXBYTES, PARTNUM/VERSION, RSSI and PKTSTATUS status registers
//! - GDO0/GDO2 signal routing with edge-triggered interrupt flags
//! - power-down and crystal start-up seen through MISO
//!
//! Fault knobs (`set_unresponsive`, `script_rxbytes`, `set_tx_stall`, ...) let
//! tests reproduce hardware misbehaviour deterministically.
//!
//! ## Usage
//!
//! ```rust
//! use cc2500_rs::radio::hal::sim::{Ether, SimulatedCc2500};
//! use cc2500_rs::{Cc2500Driver, RadioConfig};
//!
//! let ether = Ether::new();
//! let a = SimulatedCc2500::attached(&ether);
//! let b = SimulatedCc2500::attached(&ether);
//!
//! let mut tx = Cc2500Driver::new(a.bus(), a.gdo(), RadioConfig::default());
//! let mut rx = Cc2500Driver::new(b.bus(), b.gdo(), RadioConfig::default());
//! tx.init().unwrap();
//! rx.init().unwrap();
//! ```

use crate::radio::hal::{Bus, Edge, GdoLine, GdoPins, HalError};
use crate::radio::registers::*;
use crate::radio::status::{ChipState, ChipStatus, FifoBytes, PktStatus};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

static NEXT_CHIP_ID: AtomicUsize = AtomicUsize::new(1);

/// MISO polls reported high after a reset strobe
const RESET_MISO_POLLS: u32 = 2;

/// Decoded header of the transaction in progress
#[derive(Debug, Clone, Copy)]
struct Access {
    addr: u8,
    read: bool,
    burst: bool,
}

/// Strobe-triggered state change that takes some status polls to settle
#[derive(Debug, Clone, Copy)]
struct Transition {
    remaining: u32,
    target: ChipState,
}

#[derive(Debug, Clone, Copy)]
struct GdoModel {
    edge: Edge,
    enabled: bool,
    flag: bool,
}

impl Default for GdoModel {
    fn default() -> Self {
        Self {
            edge: Edge::OnAssert,
            enabled: false,
            flag: false,
        }
    }
}

/// Internal chip state shared by the bus and GDO handles
#[derive(Debug)]
struct ChipModel {
    id: usize,
    regs: [u8; CONFIG_REGISTER_COUNT],
    patable: u8,
    state: ChipState,
    transition: Option<Transition>,
    tx_fifo: VecDeque<u8>,
    rx_fifo: VecDeque<u8>,

    cs_low: bool,
    access: Option<Access>,
    sleep_on_deselect: bool,
    asleep: bool,
    miso_high_polls: u32,

    gdo: [GdoModel; 2],
    last_crc_ok: bool,
    rssi_raw: u8,
    cca_clear: bool,
    outgoing: Option<(u8, Vec<u8>)>,

    partnum: u8,
    version: u8,
    unresponsive: bool,
    miso_stuck: bool,
    frozen: bool,
    tx_stall: bool,
    tx_underflow_once: bool,
    settle_polls: u32,
    calibrate_polls: u32,
    rxbytes_script: VecDeque<u8>,

    current: Vec<u8>,
    transactions: Vec<Vec<u8>>,
    strobes: Vec<u8>,
    frames_received: usize,
}

impl ChipModel {
    fn new() -> Self {
        Self {
            id: NEXT_CHIP_ID.fetch_add(1, Ordering::Relaxed),
            regs: power_on_registers(),
            patable: 0xC6,
            state: ChipState::Idle,
            transition: None,
            tx_fifo: VecDeque::with_capacity(FIFO_SIZE),
            rx_fifo: VecDeque::with_capacity(FIFO_SIZE),
            cs_low: false,
            access: None,
            sleep_on_deselect: false,
            asleep: false,
            miso_high_polls: 0,
            gdo: [GdoModel::default(); 2],
            last_crc_ok: false,
            rssi_raw: 0x80,
            cca_clear: true,
            outgoing: None,
            partnum: CC2500_PARTNUM,
            version: CC2500_MIN_VERSION,
            unresponsive: false,
            miso_stuck: false,
            frozen: false,
            tx_stall: false,
            tx_underflow_once: false,
            settle_polls: 0,
            calibrate_polls: 0,
            rxbytes_script: VecDeque::new(),
            current: Vec::new(),
            transactions: Vec::new(),
            strobes: Vec::new(),
            frames_received: 0,
        }
    }

    fn channel(&self) -> u8 {
        self.regs[REG_CHANNR as usize]
    }

    fn select(&mut self) {
        self.cs_low = true;
        self.access = None;
        self.current.clear();
        if self.asleep {
            // CSn low wakes the chip; SO stays high until the crystal runs
            self.asleep = false;
            self.miso_high_polls = RESET_MISO_POLLS;
            self.state = ChipState::Idle;
        }
    }

    fn deselect(&mut self) {
        self.cs_low = false;
        self.access = None;
        if !self.current.is_empty() {
            self.transactions.push(std::mem::take(&mut self.current));
        }
        if self.sleep_on_deselect {
            self.sleep_on_deselect = false;
            self.asleep = true;
            // PATABLE and test registers are not retained in power down
            self.patable = 0;
            self.regs[REG_TEST2 as usize] = 0;
            self.regs[REG_TEST1 as usize] = 0;
            self.regs[REG_TEST0 as usize] = 0;
        }
    }

    fn miso_high(&mut self) -> bool {
        if self.miso_stuck {
            return true;
        }
        if self.miso_high_polls > 0 {
            self.miso_high_polls -= 1;
            return true;
        }
        false
    }

    fn status_byte(&self, read: bool) -> u8 {
        let fifo = if read {
            self.rx_fifo.len()
        } else {
            FIFO_SIZE.saturating_sub(self.tx_fifo.len())
        };
        ChipStatus::compose(!self.asleep, self.state, fifo.min(15) as u8).raw()
    }

    fn advance_transition(&mut self) {
        if let Some(mut t) = self.transition {
            if t.remaining == 0 {
                self.state = t.target;
                self.transition = None;
            } else {
                t.remaining -= 1;
                self.transition = Some(t);
            }
        }
    }

    fn begin_transition(&mut self, interim: ChipState, polls: u32, target: ChipState) {
        if polls == 0 {
            self.state = target;
            self.transition = None;
        } else {
            self.state = interim;
            self.transition = Some(Transition {
                remaining: polls,
                target,
            });
        }
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        self.current.push(byte);
        if self.unresponsive {
            return 0x00;
        }

        match self.access {
            None => self.header(byte),
            Some(access) => self.data(access, byte),
        }
    }

    fn header(&mut self, byte: u8) -> u8 {
        self.advance_transition();

        let addr = byte & ACCESS_ADDRESS_MASK;
        let read = byte & ACCESS_READ != 0;
        let burst = byte & ACCESS_BURST != 0;
        let status = self.status_byte(read);

        if is_strobe(addr) && !(read && burst) {
            self.strobe(addr);
        } else {
            self.access = Some(Access { addr, read, burst });
        }
        status
    }

    fn data(&mut self, access: Access, byte: u8) -> u8 {
        let out = if access.read {
            self.read_location(access.addr, access.burst)
        } else {
            self.write_location(access.addr, byte);
            self.status_byte(false)
        };

        let auto_increment =
            access.burst && (access.addr as usize) < CONFIG_REGISTER_COUNT;
        if !access.burst {
            self.access = None;
        } else if auto_increment {
            self.access = Some(Access {
                addr: access.addr + 1,
                ..access
            });
        }
        out
    }

    fn read_location(&mut self, addr: u8, burst: bool) -> u8 {
        match addr {
            FIFO_ADDR => self.rx_fifo.pop_front().unwrap_or(0),
            PATABLE_ADDR => self.patable,
            a if (a as usize) < CONFIG_REGISTER_COUNT => self.regs[a as usize],
            a if burst => self.status_register(a),
            _ => 0,
        }
    }

    fn status_register(&mut self, addr: u8) -> u8 {
        match addr {
            REG_PARTNUM => self.partnum,
            REG_VERSION => self.version,
            REG_RSSI => self.rssi_raw,
            REG_MARCSTATE => marcstate(self.state),
            REG_PKTSTATUS => self.pktstatus().bits(),
            REG_TXBYTES => FifoBytes::compose(
                self.state == ChipState::TxFifoUnderflow,
                self.tx_fifo.len() as u8,
            )
            .raw(),
            REG_RXBYTES => match self.rxbytes_script.pop_front() {
                Some(scripted) => scripted,
                None => FifoBytes::compose(
                    self.state == ChipState::RxFifoOverflow,
                    self.rx_fifo.len() as u8,
                )
                .raw(),
            },
            _ => 0,
        }
    }

    fn pktstatus(&self) -> PktStatus {
        let mut ps = PktStatus::empty();
        ps.set(PktStatus::CRC_OK, self.last_crc_ok);
        ps.set(PktStatus::CCA, self.cca_clear);
        ps.set(PktStatus::GDO0, self.line_level(GdoLine::Gdo0));
        ps.set(PktStatus::GDO2, self.line_level(GdoLine::Gdo2));
        ps
    }

    fn write_location(&mut self, addr: u8, value: u8) {
        match addr {
            FIFO_ADDR => {
                if self.tx_fifo.len() < FIFO_SIZE {
                    self.tx_fifo.push_back(value);
                }
            }
            PATABLE_ADDR => self.patable = value,
            a if (a as usize) < CONFIG_REGISTER_COUNT => self.regs[a as usize] = value,
            _ => {}
        }
    }

    fn strobe(&mut self, strobe: u8) {
        self.strobes.push(strobe);
        if self.frozen && strobe != STROBE_SNOP {
            return;
        }

        match strobe {
            STROBE_SRES => {
                self.regs = power_on_registers();
                self.tx_fifo.clear();
                self.rx_fifo.clear();
                self.state = ChipState::Idle;
                self.transition = None;
                self.miso_high_polls = RESET_MISO_POLLS;
            }
            STROBE_SIDLE => match self.state {
                // flush required before leaving an xflow state
                ChipState::RxFifoOverflow | ChipState::TxFifoUnderflow => {}
                _ => {
                    self.state = ChipState::Idle;
                    self.transition = None;
                }
            },
            STROBE_SRX => {
                if matches!(self.state, ChipState::Idle | ChipState::FsTxOn | ChipState::Tx) {
                    self.begin_transition(ChipState::Settling, self.settle_polls, ChipState::Rx);
                }
            }
            STROBE_STX => {
                if matches!(self.state, ChipState::Idle | ChipState::FsTxOn | ChipState::Rx) {
                    self.start_transmit();
                }
            }
            STROBE_SFSTXON => {
                if self.state == ChipState::Idle {
                    self.state = ChipState::FsTxOn;
                }
            }
            STROBE_SCAL => {
                if self.state == ChipState::Idle {
                    self.begin_transition(
                        ChipState::Calibrate,
                        self.calibrate_polls,
                        ChipState::Idle,
                    );
                }
            }
            STROBE_SFRX => {
                if matches!(self.state, ChipState::Idle | ChipState::RxFifoOverflow) {
                    self.rx_fifo.clear();
                    self.state = ChipState::Idle;
                }
            }
            STROBE_SFTX => {
                if matches!(self.state, ChipState::Idle | ChipState::TxFifoUnderflow) {
                    self.tx_fifo.clear();
                    self.state = ChipState::Idle;
                }
            }
            STROBE_SPWD => {
                if self.state == ChipState::Idle {
                    self.sleep_on_deselect = true;
                }
            }
            _ => {}
        }
    }

    fn start_transmit(&mut self) {
        if self.tx_stall {
            self.state = ChipState::Tx;
            return;
        }

        self.signal(GDO_SYNC_WORD, true);

        let complete = match self.tx_fifo.front() {
            Some(&len) => self.tx_fifo.len() > len as usize,
            None => false,
        };

        if !complete || std::mem::take(&mut self.tx_underflow_once) {
            self.tx_fifo.clear();
            self.state = ChipState::TxFifoUnderflow;
            return;
        }

        let len = self.tx_fifo[0] as usize;
        let frame: Vec<u8> = self.tx_fifo.drain(..=len).collect();
        self.outgoing = Some((self.channel(), frame));
        self.signal(GDO_SYNC_WORD, false);
        self.state = ChipState::Idle;
    }

    /// Frame on air reaching this chip. Returns true when it was captured.
    fn on_air(&mut self, frame: &[u8], rssi_raw: u8, lqi: u8, crc_ok: bool) -> bool {
        if self.asleep || self.unresponsive || self.state != ChipState::Rx {
            return false;
        }
        let Some(&len) = frame.first() else {
            return false;
        };
        if len > self.regs[REG_PKTLEN as usize] {
            // hardware length filter: discarded, RX restarts
            return false;
        }

        self.signal(GDO_SYNC_WORD, true);
        self.rx_fifo.extend(frame.iter().copied());
        self.rx_fifo.push_back(rssi_raw);
        self.rx_fifo.push_back(if crc_ok { 0x80 | (lqi & 0x7F) } else { lqi & 0x7F });
        self.rssi_raw = rssi_raw;
        self.last_crc_ok = crc_ok;
        self.frames_received += 1;

        if self.rx_fifo.len() > FIFO_SIZE {
            self.rx_fifo.truncate(FIFO_SIZE);
            self.state = ChipState::RxFifoOverflow;
        } else {
            self.signal(GDO_SYNC_WORD, false);
            self.state = ChipState::Idle;
        }
        self.signal(GDO_RX_FIFO_EOP, true);
        true
    }

    fn line_config(&self, line: GdoLine) -> u8 {
        let reg = match line {
            GdoLine::Gdo0 => REG_IOCFG0,
            GdoLine::Gdo2 => REG_IOCFG2,
        };
        self.regs[reg as usize] & GDO_SIGNAL_MASK
    }

    fn line_level(&self, line: GdoLine) -> bool {
        match self.line_config(line) {
            GDO_RX_FIFO | GDO_RX_FIFO_EOP => !self.rx_fifo.is_empty(),
            GDO_RX_OVERFLOW => self.state == ChipState::RxFifoOverflow,
            GDO_TX_UNDERFLOW => self.state == ChipState::TxFifoUnderflow,
            GDO_CCA => self.cca_clear,
            GDO_CHIP_RDY | GDO_XOSC_STABLE => !self.asleep,
            _ => false,
        }
    }

    /// Raise interrupt flags on every line routed to `signal`
    fn signal(&mut self, signal: u8, asserted: bool) {
        for line in GdoLine::ALL {
            if self.line_config(line) != signal {
                continue;
            }
            let gdo = &mut self.gdo[line_index(line)];
            let fires = matches!(
                (gdo.edge, asserted),
                (Edge::OnAssert, true) | (Edge::OnDeassert, false)
            );
            if fires {
                gdo.flag = true;
            }
        }
    }
}

fn line_index(line: GdoLine) -> usize {
    match line {
        GdoLine::Gdo0 => 0,
        GdoLine::Gdo2 => 1,
    }
}

fn marcstate(state: ChipState) -> u8 {
    match state {
        ChipState::Idle => 0x01,
        ChipState::Rx => 0x0D,
        ChipState::Tx => 0x13,
        ChipState::FsTxOn => 0x12,
        ChipState::Calibrate => 0x08,
        ChipState::Settling => 0x0C,
        ChipState::RxFifoOverflow => 0x11,
        ChipState::TxFifoUnderflow => 0x16,
    }
}

fn power_on_registers() -> [u8; CONFIG_REGISTER_COUNT] {
    let mut regs = [0u8; CONFIG_REGISTER_COUNT];
    regs[REG_IOCFG2 as usize] = 0x29;
    regs[REG_IOCFG1 as usize] = 0x2E;
    regs[REG_IOCFG0 as usize] = 0x3F;
    regs[REG_FIFOTHR as usize] = 0x07;
    regs[REG_SYNC1 as usize] = 0xD3;
    regs[REG_SYNC0 as usize] = 0x91;
    regs[REG_PKTLEN as usize] = 0xFF;
    regs[REG_PKTCTRL1 as usize] = 0x04;
    regs[REG_PKTCTRL0 as usize] = 0x45;
    regs[REG_MCSM1 as usize] = 0x30;
    regs
}

fn lock(chip: &Mutex<ChipModel>) -> MutexGuard<'_, ChipModel> {
    chip.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EtherInner {
    nodes: Vec<Weak<Mutex<ChipModel>>>,
    rssi_raw: u8,
    lqi: u8,
    crc_error_rate: f64,
    frames_sent: usize,
}

/// Shared air medium connecting simulated chips
#[derive(Clone)]
pub struct Ether {
    inner: Arc<Mutex<EtherInner>>,
}

impl Default for Ether {
    fn default() -> Self {
        Self::new()
    }
}

impl Ether {
    /// Medium with a strong, clean link (raw RSSI 0xF0, LQI 4)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EtherInner {
                nodes: Vec::new(),
                rssi_raw: 0xF0,
                lqi: 4,
                crc_error_rate: 0.0,
                frames_sent: 0,
            })),
        }
    }

    fn inner(&self) -> MutexGuard<'_, EtherInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Signal strength and link quality reported by receivers
    pub fn set_link(&self, rssi_raw: u8, lqi: u8) {
        let mut inner = self.inner();
        inner.rssi_raw = rssi_raw;
        inner.lqi = lqi;
    }

    /// Probability that a delivered frame fails its CRC check
    pub fn set_crc_error_rate(&self, rate: f64) {
        self.inner().crc_error_rate = rate.clamp(0.0, 1.0);
    }

    /// Frames put on air so far
    pub fn frames_sent(&self) -> usize {
        self.inner().frames_sent
    }

    fn attach(&self, chip: &Arc<Mutex<ChipModel>>) {
        let mut inner = self.inner();
        inner.nodes.retain(|n| n.strong_count() > 0);
        inner.nodes.push(Arc::downgrade(chip));
    }

    fn broadcast(&self, from: usize, channel: u8, frame: &[u8]) {
        let (nodes, rssi_raw, lqi, rate) = {
            let mut inner = self.inner();
            inner.frames_sent += 1;
            let nodes: Vec<_> = inner.nodes.iter().filter_map(Weak::upgrade).collect();
            (nodes, inner.rssi_raw, inner.lqi, inner.crc_error_rate)
        };

        let mut rng = rand::thread_rng();
        for node in nodes {
            let mut chip = lock(&node);
            if chip.id == from || chip.channel() != channel {
                continue;
            }
            let crc_ok = rate <= 0.0 || !rng.gen_bool(rate);
            if chip.on_air(frame, rssi_raw, lqi, crc_ok) {
                log::trace!("sim: chip {} captured {} byte frame", chip.id, frame.len());
            }
        }
    }
}

/// Handle to one simulated chip; hands out [`SimBus`] and [`SimGdo`] views
#[derive(Clone)]
pub struct SimulatedCc2500 {
    chip: Arc<Mutex<ChipModel>>,
    ether: Option<Ether>,
}

impl Default for SimulatedCc2500 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCc2500 {
    /// A chip with no medium attached
    pub fn new() -> Self {
        Self {
            chip: Arc::new(Mutex::new(ChipModel::new())),
            ether: None,
        }
    }

    /// A chip transmitting and receiving on `ether`
    pub fn attached(ether: &Ether) -> Self {
        let sim = Self {
            chip: Arc::new(Mutex::new(ChipModel::new())),
            ether: Some(ether.clone()),
        };
        ether.attach(&sim.chip);
        sim
    }

    fn chip(&self) -> MutexGuard<'_, ChipModel> {
        lock(&self.chip)
    }

    pub fn bus(&self) -> SimBus {
        SimBus {
            chip: Arc::clone(&self.chip),
            ether: self.ether.clone(),
        }
    }

    pub fn gdo(&self) -> SimGdo {
        SimGdo {
            chip: Arc::clone(&self.chip),
        }
    }

    // ----- observation -----

    pub fn state(&self) -> ChipState {
        self.chip().state
    }

    pub fn register(&self, addr: u8) -> u8 {
        self.chip().regs[addr as usize]
    }

    pub fn patable(&self) -> u8 {
        self.chip().patable
    }

    pub fn is_asleep(&self) -> bool {
        self.chip().asleep
    }

    pub fn rx_fifo_len(&self) -> usize {
        self.chip().rx_fifo.len()
    }

    pub fn tx_fifo_len(&self) -> usize {
        self.chip().tx_fifo.len()
    }

    pub fn frames_received(&self) -> usize {
        self.chip().frames_received
    }

    /// Interrupt flag of a line, regardless of its enable bit
    pub fn gdo_flag(&self, line: GdoLine) -> bool {
        self.chip().gdo[line_index(line)].flag
    }

    pub fn gdo_enabled(&self, line: GdoLine) -> bool {
        self.chip().gdo[line_index(line)].enabled
    }

    /// Strobes received, oldest first
    pub fn strobe_log(&self) -> Vec<u8> {
        self.chip().strobes.clone()
    }

    pub fn strobe_count(&self, strobe: u8) -> usize {
        self.chip().strobes.iter().filter(|&&s| s == strobe).count()
    }

    /// MOSI bytes of every completed chip-select frame
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        self.chip().transactions.clone()
    }

    pub fn clear_log(&self) {
        let mut chip = self.chip();
        chip.strobes.clear();
        chip.transactions.clear();
    }

    // ----- fault injection -----

    pub fn set_identity(&self, partnum: u8, version: u8) {
        let mut chip = self.chip();
        chip.partnum = partnum;
        chip.version = version;
    }

    /// Chip ignores the bus entirely; MISO reads as zero
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.chip().unresponsive = unresponsive;
    }

    /// MISO never goes low (crystal never starts)
    pub fn set_miso_stuck(&self, stuck: bool) {
        self.chip().miso_stuck = stuck;
    }

    /// Chip ignores every strobe except SNOP
    pub fn set_frozen(&self, frozen: bool) {
        self.chip().frozen = frozen;
    }

    /// STX enters TX but the FIFO never drains
    pub fn set_tx_stall(&self, stall: bool) {
        self.chip().tx_stall = stall;
    }

    /// Next STX underflows the TX FIFO
    pub fn force_tx_underflow(&self) {
        self.chip().tx_underflow_once = true;
    }

    /// Status polls reported as SETTLING after SRX
    pub fn set_settle_polls(&self, polls: u32) {
        self.chip().settle_polls = polls;
    }

    /// Status polls reported as CALIBRATE after SCAL
    pub fn set_calibrate_polls(&self, polls: u32) {
        self.chip().calibrate_polls = polls;
    }

    /// Values returned by the next RXBYTES reads, before the real count
    pub fn script_rxbytes(&self, values: &[u8]) {
        self.chip().rxbytes_script.extend(values.iter().copied());
    }

    pub fn set_cca(&self, clear: bool) {
        self.chip().cca_clear = clear;
    }

    pub fn set_rssi(&self, raw: u8) {
        self.chip().rssi_raw = raw;
    }

    /// Deliver a frame directly to this chip, bypassing the medium
    pub fn receive_frame(&self, payload: &[u8], rssi_raw: u8, lqi: u8, crc_ok: bool) -> bool {
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(payload.len() as u8);
        frame.extend_from_slice(payload);
        self.chip().on_air(&frame, rssi_raw, lqi, crc_ok)
    }

    /// Load raw RX FIFO contents and signal end of packet.
    ///
    /// Models framing anomalies the chip can produce, where the length byte
    /// does not match the number of bytes actually in the FIFO.
    pub fn inject_rx_fifo(&self, raw: &[u8]) {
        let mut chip = self.chip();
        chip.rx_fifo.clear();
        chip.rx_fifo.extend(raw.iter().copied());
        chip.state = ChipState::Idle;
        chip.signal(GDO_RX_FIFO_EOP, true);
    }

    /// Put the chip into RXFIFO_OVERFLOW with a full FIFO
    pub fn force_rx_overflow(&self) {
        let mut chip = self.chip();
        chip.rx_fifo.clear();
        chip.rx_fifo.extend(std::iter::repeat(0xEE).take(FIFO_SIZE));
        chip.state = ChipState::RxFifoOverflow;
        chip.signal(GDO_RX_FIFO_EOP, true);
    }

    /// Put the chip into TXFIFO_UNDERFLOW
    pub fn force_tx_underflow_state(&self) {
        let mut chip = self.chip();
        chip.tx_fifo.clear();
        chip.state = ChipState::TxFifoUnderflow;
    }
}

/// [`Bus`] view of a simulated chip
pub struct SimBus {
    chip: Arc<Mutex<ChipModel>>,
    ether: Option<Ether>,
}

impl Bus for SimBus {
    fn select(&mut self) -> Result<(), HalError> {
        let mut chip = lock(&self.chip);
        if chip.cs_low {
            return Err(HalError::ChipSelect("select while selected"));
        }
        chip.select();
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), HalError> {
        lock(&self.chip).deselect();
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, HalError> {
        let (out, outgoing, id) = {
            let mut chip = lock(&self.chip);
            if !chip.cs_low {
                return Err(HalError::ChipSelect("transfer without select"));
            }
            let out = chip.transfer(byte);
            (out, chip.outgoing.take(), chip.id)
        };

        // deliver outside the chip lock so receivers can be locked
        if let (Some((channel, frame)), Some(ether)) = (outgoing, &self.ether) {
            ether.broadcast(id, channel, &frame);
        }
        Ok(out)
    }

    fn miso_high(&mut self) -> Result<bool, HalError> {
        let mut chip = lock(&self.chip);
        if chip.unresponsive {
            return Ok(false);
        }
        Ok(chip.miso_high())
    }

    fn delay_us(&mut self, _us: u32) {}
}

/// [`GdoPins`] view of a simulated chip
pub struct SimGdo {
    chip: Arc<Mutex<ChipModel>>,
}

impl GdoPins for SimGdo {
    fn set_edge(&mut self, line: GdoLine, edge: Edge) -> Result<(), HalError> {
        lock(&self.chip).gdo[line_index(line)].edge = edge;
        Ok(())
    }

    fn enable_interrupt(&mut self, line: GdoLine) -> Result<(), HalError> {
        lock(&self.chip).gdo[line_index(line)].enabled = true;
        Ok(())
    }

    fn disable_interrupt(&mut self, line: GdoLine) -> Result<(), HalError> {
        lock(&self.chip).gdo[line_index(line)].enabled = false;
        Ok(())
    }

    fn clear_flag(&mut self, line: GdoLine) -> Result<(), HalError> {
        lock(&self.chip).gdo[line_index(line)].flag = false;
        Ok(())
    }

    fn is_pending(&mut self, line: GdoLine) -> Result<bool, HalError> {
        let chip = lock(&self.chip);
        let gdo = chip.gdo[line_index(line)];
        Ok(gdo.flag && gdo.enabled)
    }

    fn is_high(&mut self, line: GdoLine) -> Result<bool, HalError> {
        Ok(lock(&self.chip).line_level(line))
    }
}
