use anyhow::{bail, Context, Result};
use chrono;
use log::{debug, info};

extern crate libbitbang;

use libbitbang::command;
use libbitbang::engine::Delay;
use libbitbang::interface::GpioInterface;
use libbitbang::{PinConfig, Session, Transport};

#[cfg(feature = "ftdi")]
const DEFAULT_SCRIPT: &str = "
gpio_jtag_nums 0 3 1 2
gpio_swd_nums 0 1
";

#[cfg(not(feature = "ftdi"))]
const DEFAULT_SCRIPT: &str = "
# ESP32 MTCK, MTMS, MTDI, MTDO
gpio_jtag_nums 13 14 12 15
gpio_swd_nums 4 5
gpio_blink_num 2
";

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .filter(|meta| !meta.target().contains("sim_gpio"))
        .apply()?;
    Ok(())
}

fn parse_transport(arg: &str) -> Result<Transport> {
    Ok(match arg {
        "jtag" => Transport::Jtag,
        "swd" => Transport::Swd,
        "both" => Transport::Both,
        _ => bail!("unknown transport {:?}, expected jtag, swd or both", arg),
    })
}

fn configure<G: GpioInterface, D: Delay>(session: &mut Session<G, D>, script: &str) -> Result<()> {
    for (n, line) in script.lines().enumerate() {
        let reply = session
            .execute(line)
            .with_context(|| format!("config line {}: {:?}", n + 1, line))?;
        if let Some(reply) = reply {
            info!("{}", reply);
        }
    }
    Ok(())
}

/// TAP reset on JTAG, line reset on SWD, with the indicator lit meanwhile.
fn smoke<G: GpioInterface, D: Delay>(session: &mut Session<G, D>, active: Transport) -> Result<()> {
    session.blink(true)?;

    if active.is_jtag() {
        session.reset(false, false)?;
        for _ in 0..5 {
            session.write(false, true, false)?;
            session.write(true, true, false)?;
        }
        session.write(false, true, false)?;
        info!("TDO after TAP reset: {}", session.read()? as u8);
    }

    if active.is_swd() {
        session.swdio_drive(true)?;
        for _ in 0..50 {
            session.swd_write(false, true)?;
            session.swd_write(true, true)?;
        }
        session.swd_write(false, false)?;
        session.swdio_drive(false)?;
        info!("SWDIO after line reset: {}", session.swdio_read()? as u8);
        session.swdio_drive(true)?;
    }

    session.blink(false)?;
    Ok(())
}

fn run<G: GpioInterface, D: Delay>(
    session: &mut Session<G, D>,
    transport: Transport,
    script: &str,
) -> Result<()> {
    configure(session, script)?;
    let active = session
        .activate(transport)
        .context("failed to activate transport")?;
    debug!("rate {} kHz, {} delay cycles", session.rate(), session.delay_cycles());

    let result = smoke(session, active);
    session.deactivate();
    result
}

fn main() -> Result<()> {
    setup_logger()?;

    let args: Vec<String> = std::env::args().collect();
    let transport = match args.get(1).map(String::as_str) {
        Some("help") | Some("--help") => {
            println!("usage: {} <jtag|swd|both> [script]\n", args[0]);
            println!("{}", command::help());
            return Ok(());
        }
        Some(arg) => parse_transport(arg)?,
        None => Transport::Jtag,
    };
    let script = match args.get(2) {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path))?,
        None => DEFAULT_SCRIPT.to_string(),
    };

    #[cfg(feature = "ftdi")]
    let gpio = libbitbang::interface::FtdiGpio::open(0x15ba, 0x002a)?;
    #[cfg(not(feature = "ftdi"))]
    let gpio = libbitbang::interface::SimGpio::esp32();

    let mut session = Session::new(gpio, PinConfig::new());
    run(&mut session, transport, &script)
}
