// hpsdr-bridge -- presents this host as an HPSDR Protocol-1 radio.
//
// Usage:
//   hpsdr-bridge                          run with ./hpsdr_bridge.yaml (or defaults)
//   hpsdr-bridge --config /etc/hpsdr.yaml --emulation hl2
//   hpsdr-bridge --output tx.cf32 --verbose
//   hpsdr-bridge profiles
//   hpsdr-bridge show-config

mod logging;
mod sinks;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use hpsdr_bridge::SessionBuilder;
use hpsdr_core::{BridgeConfig, DeviceProfile, SinkKind};

use crate::sinks::{FileSink, NullSink};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// HPSDR Protocol-1 bridge: emulates a Metis/Hermes-family radio on the LAN
/// and forwards the client's TX IQ to an output sink.
#[derive(Parser)]
#[command(name = "hpsdr-bridge", version, about)]
struct Cli {
    /// YAML configuration file. Missing file means built-in defaults.
    #[arg(long, short, default_value = "hpsdr_bridge.yaml")]
    config: PathBuf,

    /// Device to emulate (metis, hermes, griffin, angelia, orion, orion2,
    /// hermeslite, hl2, c25).
    #[arg(long)]
    emulation: Option<DeviceProfile>,

    /// Local address to bind.
    #[arg(long)]
    bind: Option<IpAddr>,

    /// UDP/TCP port.
    #[arg(long)]
    port: Option<u16>,

    /// Write TX IQ to this file instead of discarding it.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Debug logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bridge (default).
    Run,
    /// List the device profiles that can be emulated.
    Profiles,
    /// Print the effective configuration as YAML.
    ShowConfig,
}

/// Load the config file and fold the command-line overrides into it.
fn effective_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(profile) = cli.emulation {
        config.global.emulation = profile;
    }
    if let Some(bind) = cli.bind {
        config.network.bind = bind;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(path) = &cli.output {
        config.sink.kind = SinkKind::File;
        config.sink.path = path.clone();
    }
    if cli.verbose {
        config.global.debug = true;
    }
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_profiles() {
    println!("{:<14} {:>6} {:>8} {:>6}", "PROFILE", "CLASS", "VERSION", "ID");
    for profile in DeviceProfile::ALL {
        let info = profile.info();
        println!(
            "{:<14} {:>6} {:>8} {:>6}",
            info.name, info.device_class, info.firmware_version, info.device_id
        );
    }
}

fn cmd_show_config(config: &BridgeConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

async fn cmd_run(config: BridgeConfig) -> Result<()> {
    let builder = SessionBuilder::from_config(&config);
    let builder = match config.sink.kind {
        SinkKind::Discard => builder.sink(NullSink::new(config.sink.sample_rate)),
        SinkKind::File => builder.sink(FileSink::new(&config.sink.path, config.sink.sample_rate)),
    };
    let mut session = builder
        .build()
        .await
        .context("failed to start HPSDR session")?;

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for interrupt"),
        }
    });

    session.run(shutdown).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    logging::init(config.global.debug)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cmd_run(config).await,
        Command::Profiles => {
            cmd_profiles();
            Ok(())
        }
        Command::ShowConfig => cmd_show_config(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["hpsdr-bridge", "--config", "/nonexistent/hpsdr_bridge.yaml"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_config_file() {
        let config = effective_config(&cli(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config = effective_config(&cli(&[
            "--emulation",
            "hl2",
            "--port",
            "11024",
            "--output",
            "/tmp/tx.cf32",
            "-v",
        ]))
        .unwrap();
        assert_eq!(config.global.emulation, DeviceProfile::HermesLite2);
        assert_eq!(config.network.port, 11024);
        assert_eq!(config.sink.kind, SinkKind::File);
        assert_eq!(config.sink.path, PathBuf::from("/tmp/tx.cf32"));
        assert!(config.global.debug);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let argv = ["hpsdr-bridge", "--emulation", "ic7610"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn subcommands_parse() {
        assert!(matches!(cli(&["profiles"]).command, Some(Command::Profiles)));
        assert!(matches!(cli(&["show-config"]).command, Some(Command::ShowConfig)));
        assert!(cli(&[]).command.is_none());
    }
}
