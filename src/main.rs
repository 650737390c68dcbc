use anyhow::{bail, Context, Result};
use cc2500_rs::logging::{init_logger_with_level, log_debug, log_error, log_warn};
use cc2500_rs::radio::hal::sim::{Ether, SimulatedCc2500};
use cc2500_rs::radio::status::{ChipStatus, RxFrameStatus};
use cc2500_rs::util::{format_hex_compact, parse_byte, parse_payload};
use cc2500_rs::{log_info, Cc2500Driver, RadioConfig, ReceivedFrame, RxError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "cc2500-cli")]
#[command(about = "CLI tool for the CC2500 transceiver driver")]
struct Cli {
    /// JSON radio configuration; defaults apply to missing fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send packets between two simulated nodes and print what is received
    Loopback {
        /// Payload as hex, e.g. "01 02 03" or "0x010203"
        payload: String,
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
        /// Probability of a CRC failure per packet (0.0 - 1.0)
        #[arg(long, default_value = "0.0")]
        crc_error_rate: f64,
        /// Raw RSSI byte reported by the receiver
        #[arg(long, default_value = "0xF0")]
        rssi: String,
    },
    /// Decode the status bytes appended to a received frame
    DecodeStatus {
        /// RSSI byte (hex with 0x prefix, or decimal)
        rssi: String,
        /// LQI / CRC_OK byte
        lqi: String,
        /// Chip status byte from an SPI header exchange
        #[arg(long)]
        status: Option<String>,
    },
    /// Print the effective configuration as JSON
    ShowConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<RadioConfig> {
    match path {
        Some(path) => {
            log_debug(&format!("Loading configuration from {}", path.display()));
            RadioConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => {
            log_debug("No configuration file given, using defaults");
            Ok(RadioConfig::default())
        }
    }
}

fn loopback(
    config: RadioConfig,
    payload: &[u8],
    count: u32,
    crc_error_rate: f64,
    rssi_raw: u8,
) -> Result<()> {
    if !(0.0..=1.0).contains(&crc_error_rate) {
        bail!("CRC error rate must be between 0 and 1, got {crc_error_rate}");
    }

    let ether = Ether::new();
    ether.set_link(rssi_raw, 4);
    ether.set_crc_error_rate(crc_error_rate);

    let node_a = SimulatedCc2500::attached(&ether);
    let node_b = SimulatedCc2500::attached(&ether);
    let max_len = config.max_packet_len;

    let mut tx = Cc2500Driver::new(node_a.bus(), node_a.gdo(), config.clone());
    let mut rx = Cc2500Driver::new(node_b.bus(), node_b.gdo(), config);
    tx.init().context("initializing transmitter")?;
    rx.init().context("initializing receiver")?;

    let (sender, received) = mpsc::channel::<Result<ReceivedFrame, RxError>>();
    rx.register_receive_callback(move |event| {
        let outcome = event.result.map(|_| ReceivedFrame {
            payload: event.payload.to_vec(),
            rssi_dbm: event.rssi_dbm,
            lqi: event.lqi,
        });
        // receiver side of the channel lives until the end of the run
        let _ = sender.send(outcome);
    });
    rx.rx_register_buffer(vec![0; max_len as usize + 2], max_len)?;

    log_info(&format!(
        "Sending {count} packet(s) of {} bytes on channel {}",
        payload.len(),
        tx.config().channel
    ));

    for n in 1..=count {
        rx.rx_enter().context("arming receiver")?;
        tx.send(payload).context("sending packet")?;

        if !rx.handle_interrupt()? {
            println!("packet {n}: nothing received");
            continue;
        }
        match received.try_recv() {
            Ok(Ok(frame)) => println!(
                "packet {n}: {} bytes, RSSI {} dBm, LQI {}: {}",
                frame.payload.len(),
                frame.rssi_dbm,
                frame.lqi,
                format_hex_compact(&frame.payload)
            ),
            Ok(Err(err)) => {
                log_warn(&format!("Packet {n} failed: {err}"));
                println!("packet {n}: error {err} ({})", err.code());
            }
            Err(_) => println!("packet {n}: no callback"),
        }
    }

    println!("transmitter: {}", serde_json::to_string_pretty(&tx.stats())?);
    println!("receiver: {}", serde_json::to_string_pretty(&rx.stats())?);
    Ok(())
}

fn decode_status(rssi: &str, lqi: &str, status: Option<&str>, offset_db: i16) -> Result<()> {
    let rssi = parse_byte(rssi).context("parsing RSSI byte")?;
    let lqi = parse_byte(lqi).context("parsing LQI byte")?;
    let frame = RxFrameStatus::new(rssi, lqi);

    println!("RSSI:   {} dBm (raw 0x{rssi:02X})", frame.rssi_dbm(offset_db));
    println!("LQI:    {}", frame.lqi());
    println!("CRC:    {}", if frame.crc_ok() { "ok" } else { "bad" });

    if let Some(status) = status {
        let raw = parse_byte(status).context("parsing status byte")?;
        let chip = ChipStatus::from_raw(raw);
        println!("Ready:  {}", chip.chip_ready());
        println!("State:  {:?}", chip.state());
        println!("FIFO:   {} bytes", chip.fifo_bytes());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_level(if cli.verbose { "debug" } else { "info" });

    let result = run(cli);
    if let Err(err) = &result {
        log_error(&format!("{err:#}"));
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Loopback {
            payload,
            count,
            crc_error_rate,
            rssi,
        } => {
            let payload = parse_payload(&payload).context("parsing payload")?;
            let rssi = parse_byte(&rssi).context("parsing RSSI byte")?;
            loopback(config, &payload, count, crc_error_rate, rssi)?;
        }
        Commands::DecodeStatus { rssi, lqi, status } => {
            decode_status(&rssi, &lqi, status.as_deref(), config.rssi_offset_db)?;
        }
        Commands::ShowConfig => {
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}
