use std::time::Duration;

use anyhow::Context;
use arduiggler::cable::{Arduiggler, Cable, Signals};
use arduiggler::transport::ft232r::{Ft232Link, DEFAULT_DESCRIPTION};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Talk to an Arduiggler JTAG cable", long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// USB description of the FT232 in front of the Arduino
    #[arg(short, long, default_value = DEFAULT_DESCRIPTION)]
    description: String,

    /// How long to wait for the cable to answer
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bring the cable up and print its firmware version and status
    Info,
    /// Give COUNT clock pulses
    Clock {
        #[arg(long)]
        tms: bool,
        #[arg(long)]
        tdi: bool,
        count: u32,
    },
    /// Sample TDO once
    Tdo,
    /// Force the control lines in MASK to VALUE (TDI=0x01 TCK=0x02 TMS=0x04 TRST=0x08 RESET=0x10)
    Signals {
        #[arg(value_parser = parse_byte)]
        mask: u8,
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{}: {}", s, e))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.verbose.tracing_level_filter().into())
                .from_env_lossy(),
        )
        .init();

    let link = Ft232Link::new(&cli.description)
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    let mut cable = Arduiggler::connect(link)
        .with_context(|| format!("no Arduiggler at \"{}\"", cli.description))?;
    cable.init().context("cable did not come up")?;

    match cli.command {
        Command::Info => {
            println!("cable: {}", cable.link().description());
            if let Some(version) = cable.version() {
                println!("firmware: {}", version);
            }
            println!("status: {}", cable.query_status()?);
        }
        Command::Clock { tms, tdi, count } => {
            let sent = cable.clock(tms, tdi, count)?;
            if sent < count {
                anyhow::bail!("only {} of {} pulses were acknowledged", sent, count);
            }
            info!("{} pulses sent", sent);
        }
        Command::Tdo => {
            println!("{}", cable.sample_tdo()? as u8);
        }
        Command::Signals { mask, value } => {
            let sent = cable.set_signals(
                Signals::from_bits_retain(mask),
                Signals::from_bits_retain(value),
            )?;
            println!("{:#04x}", sent.bits());
        }
    }

    cable.disconnect();
    Ok(())
}
