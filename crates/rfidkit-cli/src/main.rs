//! rfidkit - drive the UHF RFID engine from the command line
//!
//! Every command runs against a simulated reader whose field is seeded with
//! the `--tag` EPCs, which makes the binary handy for exercising bridge
//! integrations without hardware.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rfidkit_core::constants::DEFAULT_ACCESS_PASSWORD;
use rfidkit_core::{FilterSpec, MemoryBank, WriteRequest};
use rfidkit_engine::{EngineConfig, EventStream, RfidEngine, RfidEvent};
use rfidkit_hardware::HardwareButtonRouter;
use rfidkit_hardware::mock::MockUhfReader;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

const DEMO_TAGS: [&str; 2] = ["3000E2801160600002094A91C5D1", "3000E2801160600002094A91C5D2"];

/// Drive a UHF RFID reader through the rfidkit engine
#[derive(Parser, Debug)]
#[command(name = "rfidkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the batch-scan grace interval in milliseconds
    #[arg(long, global = true)]
    batch_grace_ms: Option<u64>,

    /// EPC placed in the simulated field (repeatable)
    #[arg(long = "tag", global = true, default_values_t = DEMO_TAGS.map(String::from))]
    tags: Vec<String>,

    /// Print results and events as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show connection and scan status
    Status,

    /// Run one single-tag inventory round
    Scan,

    /// Run continuous inventory, listen, then stop
    Batch {
        /// How long to keep scanning after the grace interval
        #[arg(long, default_value = "1000")]
        listen_ms: u64,
    },

    /// Read words from a memory bank
    Read {
        #[command(flatten)]
        target: BankTarget,

        /// Number of words to read
        #[arg(short, long, default_value = "6")]
        len: u32,
    },

    /// Write hex data into a memory bank
    Write {
        #[command(flatten)]
        target: BankTarget,

        /// Hex payload, four characters per word
        #[arg(short, long)]
        data: String,
    },

    /// Set or clear the inventory filter
    Filter(FilterArgs),

    /// Route a hardware key press and release through the engine
    Press {
        /// Android key code (311 is the trigger)
        key_code: i32,
    },
}

#[derive(Args, Debug)]
struct BankTarget {
    /// Memory bank: EPC, TID, USER or RESERVED
    #[arg(short, long, value_parser = parse_bank)]
    bank: MemoryBank,

    /// Word offset into the bank
    #[arg(short, long, default_value = "0")]
    ptr: u32,

    /// Access password
    #[arg(long, default_value = DEFAULT_ACCESS_PASSWORD)]
    password: String,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Clear the filter instead of setting one
    #[arg(long, conflicts_with_all = ["last", "bank", "data"])]
    clear: bool,

    /// Scan once and filter on the tag found
    #[arg(long, conflicts_with_all = ["bank", "data"])]
    last: bool,

    /// Memory bank to match against
    #[arg(short, long, value_parser = parse_bank, default_value = "EPC")]
    bank: MemoryBank,

    /// Bit offset of the match
    #[arg(short, long, default_value = "32")]
    offset: u32,

    /// Bit length of the match (defaults to four bits per hex character)
    #[arg(short, long)]
    len: Option<u32>,

    /// Hex data to match
    #[arg(short, long, default_value = "")]
    data: String,
}

fn parse_bank(name: &str) -> rfidkit_core::Result<MemoryBank> {
    name.to_ascii_uppercase().parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(grace) = cli.batch_grace_ms {
        config.batch_grace_ms = grace;
    }
    debug!(?config, "Engine configuration");

    let (reader, field) = MockUhfReader::new();
    let epcs: Vec<&str> = cli.tags.iter().map(String::as_str).collect();
    field.place_epcs(&epcs).context("Invalid --tag value")?;
    info!(tags = epcs.len(), reader = %field.name(), "Simulated field ready");

    let (mut engine, mut events) = RfidEngine::new(reader, config);
    run(&cli, &mut engine).await?;

    engine.close_reader().await;
    print_events(&mut events, cli.json)?;
    Ok(())
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    EngineConfig::from_json(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

async fn run(cli: &Cli, engine: &mut RfidEngine<MockUhfReader>) -> Result<()> {
    match &cli.command {
        Command::Status => {
            engine.init_reader().await;
            let status = engine.reader_status();
            emit(cli.json, &status, || {
                format!("connected: {}, status: {:?}", status.is_connected, status.status)
            })
        }
        Command::Scan => {
            let scan = engine.start_scan().await;
            emit(cli.json, &scan, || match &scan.tag {
                Some(tag) => format!("{} (rssi {:.1})", tag.epc, tag.rssi),
                None => scan.message.clone(),
            })
        }
        Command::Batch { listen_ms } => {
            let started = engine.start_batch_scan().await;
            if !started.success {
                return emit(cli.json, &started, || started.message.clone());
            }
            info!(initial = started.count, "Batch scan running");

            tokio::time::sleep(Duration::from_millis(*listen_ms)).await;
            let stopped = engine.stop_scan().await;
            debug!(message = %stopped.message, "Batch scan stopped");

            let tags = engine.discovered_tags().await;
            emit(cli.json, &tags, || {
                let mut out = format!("{} tag(s)", tags.len());
                for tag in &tags {
                    out.push_str(&format!("\n  {}", tag.epc));
                }
                out
            })
        }
        Command::Read { target, len } => {
            engine.init_reader().await;
            let report = engine
                .read_tag_data(target.bank, target.ptr, *len, &target.password)
                .await;
            let summary = report.summary();
            emit(cli.json, &summary, || {
                let head = match &report.result {
                    Ok(data) => format!("{} @ {}: {}", data.bank, data.ptr, data.data),
                    Err(e) => format!("read failed: {}", e),
                };
                with_trace(head, report.trace.lines())
            })
        }
        Command::Write { target, data } => {
            engine.init_reader().await;
            let request = WriteRequest::new(target.bank, target.ptr, data, &target.password);
            let report = engine.write_tag_data(&request).await;
            let summary = report.summary();
            emit(cli.json, &summary, || {
                let head = match &report.result {
                    Ok(ack) => format!(
                        "wrote {} word(s) to {} @ {}{}",
                        ack.word_count,
                        ack.bank,
                        ack.ptr,
                        if ack.chunked { " (chunked)" } else { "" }
                    ),
                    Err(e) => format!("write failed: {}", e),
                };
                with_trace(head, report.trace.lines())
            })
        }
        Command::Filter(args) => {
            let result = if args.last {
                engine.start_scan().await;
                engine.filter_last_tag().await
            } else {
                engine.init_reader().await;
                let spec = if args.clear {
                    FilterSpec::clear()
                } else {
                    let len = args.len.unwrap_or(args.data.len() as u32 * 4);
                    FilterSpec::new(args.bank, args.offset, len, &args.data)
                };
                engine.set_filter(&spec).await
            };
            emit(cli.json, &result, || result.message.clone())
        }
        Command::Press { key_code } => {
            let router = HardwareButtonRouter::shared();
            engine.attach_buttons(&router);
            let consumed = router.on_key_down(*key_code) && router.on_key_up(*key_code);
            engine.detach_buttons();
            emit(cli.json, &consumed, || {
                format!("key {} consumed: {}", key_code, consumed)
            })
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
        println!("{}", out);
    } else {
        println!("{}", human());
    }
    Ok(())
}

fn with_trace(head: String, lines: &[String]) -> String {
    let mut out = head;
    for line in lines {
        out.push_str("\n  | ");
        out.push_str(line);
    }
    out
}

fn print_events(events: &mut EventStream, json: bool) -> Result<()> {
    for event in events.drain() {
        if json {
            let out = serde_json::to_string(&event).context("Failed to serialize event")?;
            println!("{}", out);
            continue;
        }
        match event {
            RfidEvent::TagDiscovered { tag, .. } => println!("event: tag discovered {}", tag.epc),
            RfidEvent::ScanComplete(done) => {
                println!("event: scan complete, {} tag(s)", done.total_tags)
            }
            RfidEvent::ScanError { code, message, .. } => {
                println!("event: scan error {}: {}", code, message)
            }
            RfidEvent::HardwareButtonPress(button) => {
                println!("event: {} pressed", button.key_name)
            }
            RfidEvent::HardwareButtonRelease(button) => {
                println!("event: {} released", button.key_name)
            }
            RfidEvent::TagRead(summary) => println!("event: tag read, success {}", summary.success),
            RfidEvent::TagWritten(summary) => {
                println!("event: tag written, success {}", summary.success)
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_defaults() {
        let cli = Cli::try_parse_from(["rfidkit", "read", "--bank", "tid"]).unwrap();
        match cli.command {
            Command::Read { target, len } => {
                assert_eq!(target.bank, MemoryBank::Tid);
                assert_eq!(target.ptr, 0);
                assert_eq!(target.password, DEFAULT_ACCESS_PASSWORD);
                assert_eq!(len, 6);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.tags.len(), DEMO_TAGS.len());
    }

    #[test]
    fn test_unknown_bank_rejected() {
        assert!(Cli::try_parse_from(["rfidkit", "read", "--bank", "kill"]).is_err());
    }

    #[test]
    fn test_filter_clear_conflicts_with_data() {
        assert!(Cli::try_parse_from(["rfidkit", "filter", "--clear", "--data", "E2"]).is_err());
    }
}
