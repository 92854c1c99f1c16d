//! Bench checks for an AxleWatch transmitter on a serial port.

mod device;
mod protocol;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use device::{resolve_port, DeviceClient};
use protocol::Settings;
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Exercise the AxleWatch transmitter's serial command surface")]
struct Args {
    /// Serial port of the transmitter, or "auto"
    #[arg(short, long, default_value = "auto")]
    port: String,

    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Seconds to wait for the board to answer after opening the port
    #[arg(long, default_value = "10")]
    boot_wait: u64,
}

fn describe(settings: &Settings) -> String {
    let setup = if settings.configured {
        format!("{} probes mapped", settings.active_count)
    } else {
        "not configured".yellow().to_string()
    };
    format!(
        "'{}' TX{} power save {} ({})",
        settings.name,
        settings.transmitter_id,
        if settings.power_save { "on" } else { "off" },
        setup
    )
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let port = resolve_port(&args.port)?;

    println!("{}", "AxleWatch TX bench checks".bold());
    println!("{} @ {} baud\n", port, args.baud);

    let mut device = DeviceClient::new(&port, args.baud)?;
    let [major, minor, patch] =
        device.wait_until_responsive(Duration::from_secs(args.boot_wait))?;
    let before = device.read_settings()?;
    println!("Firmware v{}.{}.{}: {}", major, minor, patch, describe(&before));

    println!("\nRunning checks...\n");
    let results = run_all_tests(&mut device);
    print_results(&results);

    // The name round trip restores itself; report anything that drifted anyway
    match device.read_settings() {
        Ok(after) if after != before => {
            println!("{} {}", "Settings changed:".yellow(), describe(&after))
        }
        Ok(_) => {}
        Err(e) => println!("{} {}", "Could not re-read settings:".red(), e),
    }

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}
