//! Integration tests for the CC2500 driver
//!
//! Drives pairs of drivers over simulated chips sharing an air medium, and
//! single drivers against a chip with injected faults.

use cc2500_rs::radio::hal::sim::{Ether, SimBus, SimGdo, SimulatedCc2500};
use cc2500_rs::radio::registers::*;
use cc2500_rs::{
    Cc2500Driver, ChipState, GdoLine, GdoPins, RadioConfig, RadioError, RxMailbox,
};
use std::sync::{Arc, Mutex};

type Driver = Cc2500Driver<SimBus, SimGdo>;

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    code: i16,
    rssi_dbm: i16,
    lqi: u8,
    payload: Vec<u8>,
}

type Recording = Arc<Mutex<Vec<Recorded>>>;

fn node(ether: &Ether, config: RadioConfig) -> (SimulatedCc2500, Driver) {
    let sim = SimulatedCc2500::attached(ether);
    let mut driver = Cc2500Driver::new(sim.bus(), sim.gdo(), config);
    driver.init().expect("init");
    (sim, driver)
}

fn standalone(config: RadioConfig) -> (SimulatedCc2500, Driver) {
    let sim = SimulatedCc2500::new();
    let driver = Cc2500Driver::new(sim.bus(), sim.gdo(), config);
    (sim, driver)
}

fn record(driver: &mut Driver) -> Recording {
    let recording: Recording = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recording);
    driver.register_receive_callback(move |event| {
        sink.lock().unwrap().push(Recorded {
            code: event.size_or_code(),
            rssi_dbm: event.rssi_dbm,
            lqi: event.lqi,
            payload: event.payload.to_vec(),
        });
    });
    recording
}

/// Transmitter and armed receiver on a fresh medium
fn link() -> (Ether, SimulatedCc2500, Driver, SimulatedCc2500, Driver, Recording) {
    let ether = Ether::new();
    let (sim_a, tx) = node(&ether, RadioConfig::default());
    let (sim_b, mut rx) = node(&ether, RadioConfig::default());
    let recording = record(&mut rx);
    rx.rx_register_buffer(vec![0; 63], 61).unwrap();
    rx.rx_enter().unwrap();
    (ether, sim_a, tx, sim_b, rx, recording)
}

#[test]
fn test_peer_receives_identical_payload() {
    let (_ether, _a, mut tx, _b, mut rx, recording) = link();
    let payload = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];

    tx.send(&payload).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].code, 5);
    assert_eq!(events[0].payload, payload);
    // default link: raw RSSI 0xF0, LQI 4
    assert_eq!(events[0].rssi_dbm, -80);
    assert_eq!(events[0].lqi, 4);

    assert_eq!(tx.stats().packets_sent, 1);
    assert_eq!(rx.stats().packets_received, 1);
    assert!(!rx.is_armed());
}

#[test]
fn test_bad_crc_reported_with_zero_rssi() {
    let (ether, _a, mut tx, _b, mut rx, recording) = link();
    ether.set_crc_error_rate(1.0);

    tx.send(&[1, 2, 3]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].code, -3);
    assert_eq!(events[0].rssi_dbm, 0);
    assert!(events[0].payload.is_empty());
    assert_eq!(rx.stats().crc_errors, 1);
    assert_eq!(rx.stats().packets_received, 0);
}

#[test]
fn test_rssi_breakpoint_through_receive_path() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();
    let cases = [(0x00u8, -72i16), (0xFF, -73), (0x7F, -9), (0x80, -136)];

    for (raw, _) in cases {
        assert!(sim_b.receive_frame(&[0x42], raw, 1, true));
        assert!(rx.handle_interrupt().unwrap());
        rx.rx_enter().unwrap();
    }

    let events = recording.lock().unwrap();
    let rssi: Vec<i16> = events.iter().map(|e| e.rssi_dbm).collect();
    let expected: Vec<i16> = cases.iter().map(|&(_, dbm)| dbm).collect();
    assert_eq!(rssi, expected);
    assert!(events.iter().all(|e| e.code == 1));
}

#[test]
fn test_idle_is_idempotent() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    sim.clear_log();

    radio.idle().unwrap();
    radio.idle().unwrap();
    assert_eq!(sim.state(), ChipState::Idle);
    assert_eq!(sim.strobe_count(STROBE_SIDLE), 2);
    assert_eq!(sim.strobe_count(STROBE_SFRX), 0);
    assert_eq!(sim.strobe_count(STROBE_SFTX), 0);

    sim.force_rx_overflow();
    radio.idle().unwrap();
    radio.idle().unwrap();
    assert_eq!(sim.state(), ChipState::Idle);
    // flushed once, not on the second call
    assert_eq!(sim.strobe_count(STROBE_SFRX), 1);
}

#[test]
fn test_receiver_must_be_rearmed() {
    let (_ether, sim_a, mut tx, sim_b, mut rx, recording) = link();

    tx.send(&[1]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    // not re-armed: the chip left RX after the first packet
    tx.send(&[2]).unwrap();
    assert!(!rx.handle_interrupt().unwrap());
    assert_eq!(sim_b.frames_received(), 1);
    assert_eq!(recording.lock().unwrap().len(), 1);

    rx.rx_enter().unwrap();
    tx.send(&[3]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let payloads: Vec<Vec<u8>> = recording
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.payload.clone())
        .collect();
    assert_eq!(payloads, vec![vec![1], vec![3]]);
    assert_eq!(sim_a.frames_received(), 0);
}

#[test]
fn test_edge_while_unarmed_is_ignored() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    let recording = record(&mut radio);
    radio.rx_register_buffer(vec![0; 16], 8).unwrap();

    sim.inject_rx_fifo(&[1, 0x55, 0xF0, 0x81]);
    radio.rx_packet_eop().unwrap();

    assert!(recording.lock().unwrap().is_empty());
    assert_eq!(radio.stats().ignored_interrupts, 1);
    assert!(!sim.gdo_flag(GdoLine::Gdo0));
}

#[test]
fn test_oscillating_rxbytes_is_reread() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();

    assert!(sim_b.receive_frame(&[7, 8], 0xF0, 3, true));
    sim_b.script_rxbytes(&[1, 3, 5]);
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events[0].code, 2);
    assert_eq!(events[0].payload, vec![7, 8]);
}

#[test]
fn test_unstable_rxbytes_times_out() {
    let ether = Ether::new();
    let config = RadioConfig {
        poll_limit: 8,
        ..RadioConfig::default()
    };
    let (sim, mut rx) = node(&ether, config);
    let recording = record(&mut rx);
    rx.rx_register_buffer(vec![0; 16], 8).unwrap();
    rx.rx_enter().unwrap();

    assert!(sim.receive_frame(&[7], 0xF0, 3, true));
    let flapping: Vec<u8> = (0..32).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
    sim.script_rxbytes(&flapping);

    assert!(matches!(
        rx.handle_interrupt(),
        Err(RadioError::Timeout("stable RXBYTES"))
    ));
    assert!(recording.lock().unwrap().is_empty());
    assert!(!rx.is_armed());
    assert!(!sim.gdo_flag(GdoLine::Gdo0));
}

#[test]
fn test_frame_left_by_rxbytes_timeout_is_dropped_on_rearm() {
    let ether = Ether::new();
    let (_sim_a, mut tx) = node(&ether, RadioConfig::default());
    let config = RadioConfig {
        poll_limit: 8,
        ..RadioConfig::default()
    };
    let (sim_b, mut rx) = node(&ether, config);
    let recording = record(&mut rx);
    rx.rx_register_buffer(vec![0; 16], 8).unwrap();
    rx.rx_enter().unwrap();

    tx.send(&[0x07]).unwrap();
    // one read plus poll_limit re-reads, never two equal in a row
    sim_b.script_rxbytes(&[1, 2, 1, 2, 1, 2, 1, 2, 1]);
    assert!(matches!(
        rx.handle_interrupt(),
        Err(RadioError::Timeout("stable RXBYTES"))
    ));
    assert!(sim_b.rx_fifo_len() > 0);

    rx.rx_enter().unwrap();
    assert_eq!(sim_b.rx_fifo_len(), 0);

    tx.send(&[0xAA, 0xBB]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].code, 2);
    assert_eq!(events[0].payload, vec![0xAA, 0xBB]);
}

#[test]
fn test_taking_buffer_ends_receive_window() {
    let (_ether, _sim_a, mut tx, sim_b, mut rx, recording) = link();

    let buffer = rx.rx_take_buffer().unwrap().unwrap();
    assert!(!rx.is_armed());
    assert!(!sim_b.gdo_enabled(GdoLine::Gdo0));
    assert_eq!(sim_b.state(), ChipState::Idle);

    // the idle receiver does not capture this one
    tx.send(&[0x07]).unwrap();
    assert!(!rx.handle_interrupt().unwrap());
    assert_eq!(sim_b.rx_fifo_len(), 0);
    assert_eq!(sim_b.frames_received(), 0);

    rx.rx_register_buffer(buffer, 61).unwrap();
    rx.rx_enter().unwrap();
    tx.send(&[0xAA, 0xBB]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload, vec![0xAA, 0xBB]);
}

#[test]
fn test_unarmed_edge_leaves_no_stale_frame() {
    let (_ether, _sim_a, mut tx, sim_b, mut rx, recording) = link();

    // a frame lands while the driver treats the receiver as unarmed
    rx.rx_take_buffer().unwrap();
    rx.rx_register_buffer(vec![0; 63], 61).unwrap();
    sim_b.inject_rx_fifo(&[1, 0x07, 0xF0, 0x81]);
    rx.rx_packet_eop().unwrap();
    assert_eq!(rx.stats().ignored_interrupts, 1);
    assert!(sim_b.rx_fifo_len() > 0);

    rx.rx_enter().unwrap();
    tx.send(&[0xAA, 0xBB]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload, vec![0xAA, 0xBB]);
}

#[test]
fn test_rx_overflow_flushed_and_reported() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();

    sim_b.force_rx_overflow();
    assert!(rx.handle_interrupt().unwrap());

    assert_eq!(recording.lock().unwrap()[0].code, -2);
    assert_eq!(rx.stats().rx_overflows, 1);
    assert_eq!(sim_b.state(), ChipState::Idle);
    assert_eq!(sim_b.rx_fifo_len(), 0);
}

#[test]
fn test_empty_fifo_interrupt() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();

    sim_b.inject_rx_fifo(&[]);
    assert!(rx.handle_interrupt().unwrap());

    assert_eq!(recording.lock().unwrap()[0].code, -1);
    assert_eq!(rx.stats().empty_interrupts, 1);
}

#[test]
fn test_size_marker_shorter_than_fifo_count() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();

    // Length byte says 2, the FIFO holds 5 more bytes. RXBYTES decides how
    // much is read and the marker only locates the status bytes; whether
    // CC2500 silicon ever produces such a frame, and what it appends after
    // the marker, is not yet confirmed on hardware.
    sim_b.inject_rx_fifo(&[2, 0xA1, 0xA2, 0x10, 0x85, 0x33]);
    assert!(rx.handle_interrupt().unwrap());

    let events = recording.lock().unwrap();
    assert_eq!(events[0].code, 2);
    assert_eq!(events[0].payload, vec![0xA1, 0xA2]);
    // status bytes are taken right after the marker
    assert_eq!(events[0].rssi_dbm, -64);
    assert_eq!(events[0].lqi, 5);
}

#[test]
fn test_size_marker_past_fifo_count_is_bad_crc() {
    let (_ether, _a, _tx, sim_b, mut rx, recording) = link();

    sim_b.inject_rx_fifo(&[9, 1, 2, 3]);
    assert!(rx.handle_interrupt().unwrap());

    assert_eq!(recording.lock().unwrap()[0].code, -3);
    assert_eq!(rx.stats().crc_errors, 1);
}

#[test]
fn test_frame_larger_than_buffer_is_clamped() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    let recording = record(&mut radio);
    radio.rx_register_buffer(vec![0; 6], 4).unwrap();
    radio.rx_enter().unwrap();

    let mut raw = vec![10u8];
    raw.extend(1..=10);
    raw.extend([0xF0, 0x81]);
    sim.inject_rx_fifo(&raw);
    assert!(radio.handle_interrupt().unwrap());

    assert_eq!(recording.lock().unwrap()[0].code, -2);
    assert_eq!(sim.rx_fifo_len(), 0);
    let buffer = radio.rx_take_buffer().unwrap().unwrap();
    assert_eq!(buffer, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_hardware_length_filter_drops_long_frames() {
    let (_ether, _a, mut tx, sim_b, mut rx, recording) = link();
    rx.rx_register_buffer(vec![0; 6], 4).unwrap();
    rx.rx_enter().unwrap();

    tx.send(&[0; 5]).unwrap();
    assert!(!rx.handle_interrupt().unwrap());
    assert_eq!(sim_b.frames_received(), 0);
    assert!(recording.lock().unwrap().is_empty());
}

#[test]
fn test_tx_underflow_reported_through_callback() {
    let (ether, sim_a, mut tx, sim_b, _rx, _) = link();
    let tx_events = record(&mut tx);

    sim_a.force_tx_underflow();
    tx.send(&[1, 2, 3]).unwrap();

    let events = tx_events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].code, -4);
    assert_eq!(tx.stats().tx_underflows, 1);
    assert_eq!(tx.stats().packets_sent, 0);
    assert_eq!(sim_a.state(), ChipState::Idle);
    assert!(sim_a.strobe_count(STROBE_SFTX) >= 1);
    assert_eq!(ether.frames_sent(), 0);
    assert_eq!(sim_b.frames_received(), 0);
}

#[test]
fn test_stalled_transmit_times_out() {
    let ether = Ether::new();
    let config = RadioConfig {
        tx_poll_limit: 16,
        ..RadioConfig::default()
    };
    let (sim, mut tx) = node(&ether, config);
    sim.set_tx_stall(true);

    assert!(matches!(
        tx.send(&[1, 2]),
        Err(RadioError::Timeout("TX FIFO drain"))
    ));
    assert_eq!(tx.stats().packets_sent, 0);
}

#[test]
fn test_send_rejects_oversize_payload() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    sim.clear_log();

    let result = radio.send(&[0; 62]);
    assert!(matches!(
        result,
        Err(RadioError::PacketTooLong { len: 62, max: 61 })
    ));
    assert!(sim.transactions().is_empty());
}

#[test]
fn test_send_wire_bytes() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    sim.clear_log();

    radio.send(&[0x11, 0x22]).unwrap();

    assert_eq!(
        sim.transactions(),
        vec![
            vec![0x3D],             // SNOP (TX underflow check)
            vec![0x3D],             // SNOP (RX overflow check)
            vec![0x36],             // SIDLE
            vec![0x3D],             // SNOP (wait for idle)
            vec![0x3F, 0x02],       // length byte
            vec![0x7F, 0x11, 0x22], // burst payload
            vec![0x35],             // STX
            vec![0xFA, 0x00],       // TXBYTES
        ]
    );
}

#[test]
fn test_receive_wire_bytes() {
    let (_ether, _a, mut tx, sim_b, mut rx, _recording) = link();
    tx.send(&[7, 8]).unwrap();
    sim_b.clear_log();

    assert!(rx.handle_interrupt().unwrap());

    assert_eq!(
        sim_b.transactions(),
        vec![
            vec![0xFB, 0x00],                   // RXBYTES
            vec![0xFB, 0x00],                   // RXBYTES again, stable
            vec![0xBF, 0x00],                   // length byte
            vec![0xFF, 0x00, 0x00, 0x00, 0x00], // payload + status
        ]
    );
}

#[test]
fn test_rx_buffer_registration() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();

    assert!(matches!(radio.rx_enter(), Err(RadioError::NoRxBuffer)));
    assert!(matches!(
        radio.rx_register_buffer(vec![0; 10], 9),
        Err(RadioError::BufferTooSmall {
            capacity: 10,
            length: 9
        })
    ));

    assert_eq!(radio.rx_register_buffer(vec![0; 11], 9).unwrap(), None);
    assert_eq!(sim.register(REG_PKTLEN), 9);

    let previous = radio.rx_register_buffer(vec![1; 4], 2).unwrap();
    assert_eq!(previous, Some(vec![0; 11]));
    assert_eq!(sim.register(REG_PKTLEN), 2);

    radio.rx_enter().unwrap();
    assert!(radio.is_armed());
    assert_eq!(radio.rx_take_buffer().unwrap(), Some(vec![1; 4]));
    assert!(!radio.is_armed());
}

#[test]
fn test_init_detects_dead_bus() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    sim.set_unresponsive(true);

    assert!(matches!(
        radio.init(),
        Err(RadioError::HardwareFault {
            wrote: 0xA5,
            read: 0x00
        })
    ));
}

#[test]
fn test_init_rejects_wrong_identity() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    sim.set_identity(0x81, 3);
    assert!(matches!(
        radio.init(),
        Err(RadioError::UnsupportedDevice {
            partnum: 0x81,
            version: 3
        })
    ));

    sim.set_identity(CC2500_PARTNUM, 2);
    assert!(matches!(
        radio.init(),
        Err(RadioError::UnsupportedDevice { version: 2, .. })
    ));

    sim.set_identity(CC2500_PARTNUM, 4);
    radio.init().unwrap();
}

#[test]
fn test_init_times_out_when_crystal_never_starts() {
    let config = RadioConfig {
        poll_limit: 16,
        ..RadioConfig::default()
    };
    let (sim, mut radio) = standalone(config);
    sim.set_miso_stuck(true);

    assert!(matches!(
        radio.init(),
        Err(RadioError::Timeout("crystal start"))
    ));
}

#[test]
fn test_state_wait_is_bounded() {
    let config = RadioConfig {
        poll_limit: 16,
        ..RadioConfig::default()
    };
    let (sim, mut radio) = standalone(config);
    radio.init().unwrap();
    radio.rx_register_buffer(vec![0; 8], 4).unwrap();
    sim.set_frozen(true);

    assert!(matches!(
        radio.rx_enter(),
        Err(RadioError::Timeout("receive"))
    ));
    assert!(!radio.is_armed());
}

#[test]
fn test_rx_enter_waits_for_settling() {
    let (_ether, _a, mut tx, sim_b, mut rx, recording) = link();
    sim_b.set_settle_polls(3);

    tx.send(&[1]).unwrap();
    rx.handle_interrupt().unwrap();
    rx.rx_enter().unwrap();
    assert_eq!(sim_b.state(), ChipState::Rx);

    tx.send(&[2]).unwrap();
    rx.handle_interrupt().unwrap();
    assert_eq!(recording.lock().unwrap().len(), 2);
}

#[test]
fn test_channels_are_isolated() {
    let (ether, _a, mut tx, sim_b, mut rx, recording) = link();

    tx.set_channel(5).unwrap();
    tx.send(&[1, 2]).unwrap();
    assert_eq!(ether.frames_sent(), 1);
    assert!(!rx.handle_interrupt().unwrap());
    assert_eq!(sim_b.frames_received(), 0);

    rx.set_channel(5).unwrap();
    rx.rx_enter().unwrap();
    tx.send(&[1, 2]).unwrap();
    assert!(rx.handle_interrupt().unwrap());
    assert_eq!(recording.lock().unwrap()[0].payload, vec![1, 2]);
    assert_eq!(sim_b.register(REG_CHANNR), 5);
}

#[test]
fn test_sleep_wakeup_and_calibrate() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    sim.set_calibrate_polls(3);

    radio.sleep().unwrap();
    assert!(sim.is_asleep());
    assert_eq!(sim.patable(), 0);

    radio.wakeup().unwrap();
    assert!(!sim.is_asleep());
    assert_eq!(sim.state(), ChipState::Idle);

    radio.set_pa_table(DEFAULT_PATABLE).unwrap();
    radio.calibrate().unwrap();
    assert_eq!(sim.patable(), DEFAULT_PATABLE);
    assert_eq!(sim.strobe_count(STROBE_SCAL), 1);
    assert_eq!(sim.state(), ChipState::Idle);
    assert!(radio.status().unwrap().chip_ready());
}

#[test]
fn test_reset_restores_power_on_registers() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();
    radio.set_channel(7).unwrap();
    assert_eq!(sim.register(REG_CHANNR), 7);

    radio.reset().unwrap();
    assert_eq!(sim.register(REG_CHANNR), 0);
    assert_eq!(sim.register(REG_PKTLEN), 0xFF);
    assert_eq!(sim.state(), ChipState::Idle);
}

#[test]
fn test_gdo_signal_selection() {
    let (sim, mut radio) = standalone(RadioConfig::default());
    radio.init().unwrap();

    radio.gdo0_set_signal(GDO_CCA).unwrap();
    radio.gdo2_set_signal(0xC6).unwrap();
    assert_eq!(sim.register(REG_IOCFG0), GDO_CCA);
    // only the 6 signal bits are written
    assert_eq!(sim.register(REG_IOCFG2), GDO_SYNC_WORD);
}

#[test]
fn test_sync_word_interrupt_counted() {
    let (_ether, _a, mut tx, sim_b, mut rx, recording) = link();
    let mut gdo = sim_b.gdo();
    gdo.enable_interrupt(GdoLine::Gdo2).unwrap();

    tx.send(&[4, 5, 6]).unwrap();
    assert!(rx.handle_interrupt().unwrap());

    assert_eq!(rx.stats().sync_words, 1);
    assert_eq!(recording.lock().unwrap()[0].code, 3);
}

#[test]
fn test_callback_posts_into_mailbox() {
    let (_ether, _a, mut tx, _b, mut rx, _) = link();
    let mailbox = Arc::new(RxMailbox::new());
    let sink = Arc::clone(&mailbox);
    rx.register_receive_callback(move |event| {
        sink.post_event(&event);
    });

    tx.send(b"hello").unwrap();
    rx.handle_interrupt().unwrap();

    let frame = mailbox.take().expect("frame posted");
    assert_eq!(frame.payload, b"hello".to_vec());
    assert_eq!(frame.rssi_dbm, -80);
    assert!(!mailbox.is_pending());
}
