//! beacon CLI
//!
//! UDP address-discovery beacon for game servers behind NAT.

mod config;

use anyhow::Context;
use beacon_core::{LivenessProbe, Mode, ServerConfig, ServerRuntime};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use config::Config;

/// beacon - announce a UDP server's reachable address across NAT
#[derive(Parser)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the two server modes
#[derive(Args)]
struct ServeArgs {
    /// Local IP to bind to
    #[arg(long)]
    ip: Option<IpAddr>,

    /// UDP (and HTTP) listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Port announced in replies
    #[arg(long)]
    remote_port: Option<u16>,

    /// Disable the HTTP health endpoints
    #[arg(long)]
    no_http: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve in origin mode: announce our own public IP
    Origin {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Serve in relay mode: announce each caller's observed IP
    Relay {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Send one discovery ping and wait for the reply
    Ping {
        /// Target hostname
        #[arg(long, default_value = "localhost")]
        hostname: String,

        /// Target port
        #[arg(short, long)]
        port: Option<u16>,

        /// Local IP to bind the ephemeral socket to
        #[arg(long)]
        ip: Option<IpAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("could not load config from {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    config.validate()?;

    // Initialize logging; --verbose wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        })
        .init();

    match cli.command {
        Commands::Origin { serve } => run_server(Mode::Origin, &serve, &config).await,
        Commands::Relay { serve } => run_server(Mode::Relay, &serve, &config).await,
        Commands::Ping { hostname, port, ip } => ping(&hostname, port, ip, &config).await,
    }
}

/// Run a discovery server in the given mode until interrupted
async fn run_server(mode: Mode, args: &ServeArgs, config: &Config) -> anyhow::Result<()> {
    let server = ServerConfig {
        bind_ip: match args.ip {
            Some(ip) => ip,
            None => config.parse_bind_ip()?,
        },
        port: args.port.unwrap_or(config.network.port),
        remote_port: args.remote_port.unwrap_or_else(|| config.remote_port()),
        mode,
        http_enabled: !args.no_http && config.network.http,
    };

    tracing::info!(mode = %server.mode, addr = %server.udp_addr(), "starting beacon");

    let runtime = ServerRuntime::bind(server).await?;
    runtime.run().await?;
    Ok(())
}

/// Resolve the target and run one liveness probe against it
async fn ping(
    hostname: &str,
    port: Option<u16>,
    ip: Option<IpAddr>,
    config: &Config,
) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.network.port);
    let bind_ip = match ip {
        Some(ip) => ip,
        None => config.parse_bind_ip()?,
    };

    let mut addrs = tokio::net::lookup_host((hostname, port))
        .await
        .with_context(|| format!("could not resolve {hostname}"))?;
    // TODO: prefer an address whose family matches the bind IP
    let target = addrs
        .next()
        .with_context(|| format!("no addresses found for {hostname}"))?;

    tracing::debug!(%target, "probing");

    let probe = LivenessProbe::new(bind_ip);
    let outcome = probe
        .probe(target)
        .await
        .with_context(|| format!("probe against {target} failed"))?;

    println!(
        "reply from {} in {:?} (sequence {})",
        target, outcome.elapsed, outcome.sequence
    );
    Ok(())
}
