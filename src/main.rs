use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use vpn_bridge::provider::{ExpressVpn, StatusReader};

#[derive(Parser)]
#[command(name = "vpn-bridge")]
#[command(about = "Bridge ExpressVPN connection state to MQTT and Home Assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./vpn-bridge.toml, then ~/.vpn-bridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge until interrupted
    Run,
    /// Show current VPN status
    Status,
    /// List known locations, favorites first
    Locations,
    /// Generate default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run => {
            let config = vpn_bridge::Config::load_or_default(cli.config.as_deref())?;
            info!(
                "Starting bridge: broker={}:{}, poll every {}s",
                config.mqtt.host, config.mqtt.port, config.vpn.poll_interval_secs
            );
            if let Err(e) = vpn_bridge::run(config).await {
                error!("Bridge failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            let config = vpn_bridge::Config::load_or_default(cli.config.as_deref())?;
            let vpn = ExpressVpn::from_config(&config.vpn);
            let status = vpn.poll().await?;
            let catalog = vpn.load_catalog(&config.vpn.favorites).await?;
            println!("VPN Status: {}", status);
            println!("  Location: {}", catalog.resolve(&status));
        }
        Commands::Locations => {
            let config = vpn_bridge::Config::load_or_default(cli.config.as_deref())?;
            let vpn = ExpressVpn::from_config(&config.vpn);
            let catalog = vpn.load_catalog(&config.vpn.favorites).await?;
            println!("{} locations:", catalog.len());
            for location in catalog.locations() {
                let marker = if config.vpn.favorites.contains(location) {
                    "*"
                } else {
                    " "
                };
                println!("  {} {}", marker, location);
            }
        }
        Commands::Init => {
            info!("Generating default config...");
            let config = vpn_bridge::Config::default();
            let path = PathBuf::from(vpn_bridge::config::LOCAL_CONFIG);
            config.save(&path)?;
            println!("Created default config: {}", path.display());
        }
    }

    Ok(())
}
