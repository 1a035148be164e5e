use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{Bridge, BridgeDrivers, BridgeSettings};
use bridge_agent::host;
use infrastructure::config::{PowerKind, PrinterKind, ScannerKind};
use infrastructure::{BridgeConfig, DriverFactory};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory (defaults to the crate's config in development)
    #[arg(long)]
    config_dir: Option<String>,

    /// Run against the mock printer, simulated scanner and host-fed battery
    #[arg(long)]
    simulate: bool,

    /// Override printer host
    #[arg(long)]
    printer_host: Option<String>,

    /// Override printer port
    #[arg(long)]
    printer_port: Option<u16>,

    /// Override scanner serial port
    #[arg(long)]
    scanner_port: Option<String>,
}

fn apply_overrides(config: &mut BridgeConfig, args: &Args) {
    if args.simulate {
        config.printer.kind = PrinterKind::Mock;
        config.scanner.kind = ScannerKind::Simulated;
        config.power.kind = PowerKind::Manual;
    }
    if let Some(host) = &args.printer_host {
        config.printer.host = host.clone();
    }
    if let Some(port) = args.printer_port {
        config.printer.port = port;
    }
    if let Some(port) = &args.scanner_port {
        config.scanner.port = port.clone();
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    // stdout carries the host channel, logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,bridge_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("🤖 Peripheral Bridge Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    let config_dir = args.config_dir.clone().unwrap_or_else(|| {
        let dev_dir = "crates/bridge-agent/config";
        if std::path::Path::new(dev_dir).exists() {
            dev_dir.to_string()
        } else {
            "config".to_string()
        }
    });
    info!("📂 Config directory: {}", config_dir);

    let mut config = BridgeConfig::load(&config_dir)?;
    apply_overrides(&mut config, &args);
    info!(
        printer = ?config.printer.kind,
        scanner = ?config.scanner.kind,
        power = ?config.power.kind,
        capture = config.capture.command.as_deref().unwrap_or("none"),
        "✅ Configuration loaded"
    );

    let drivers = DriverFactory::create(&config)?;
    let (bridge, bridge_task) = Bridge::spawn(
        BridgeDrivers {
            printer: drivers.printer,
            decoder: drivers.decoder,
            launcher: drivers.launcher,
            power: drivers.power,
        },
        BridgeSettings {
            request_code_base: config.request_code_base,
            default_baud_rate: config.scanner.baud_rate,
        },
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        served = host::serve(bridge.clone(), stdin, stdout) => served?,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("🛑 Shutting down..."),
            Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
        },
    }

    bridge.shutdown();
    if let Err(e) = bridge_task.await {
        warn!(error = %e, "Bridge task ended abnormally");
    }

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    let outcome = rt.block_on(run());
    // A blocked stdin read would otherwise hold the runtime open
    rt.shutdown_timeout(std::time::Duration::from_millis(500));

    if let Err(e) = outcome {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        eprintln!("--------------------------------------------------");
        eprintln!("The bridge agent stopped because of a fatal error.");
        std::process::exit(1);
    }
}
