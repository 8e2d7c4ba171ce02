use anyhow::Context;
use clap::Parser;
use mockdir::config::Config;
use mockdir::http::{serve_metrics, MockServer};
use mockdir::{Dispatcher, StateDir};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mockdir")]
#[command(author, version, about = "HTTP test double backed by a state directory", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "MOCKDIR_CONFIG")]
    config: Option<PathBuf>,

    /// State directory (overrides the config file)
    #[arg(short, long, env = "MOCKDIR_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Listen host (overrides the config file)
    #[arg(long, env = "MOCKDIR_HOST")]
    host: Option<String>,

    /// Listen port (overrides the config file)
    #[arg(short, long, env = "MOCKDIR_PORT")]
    port: Option<u16>,

    /// Vendor prefix for direct-reference URLs (overrides the config file)
    #[arg(long, env = "MOCKDIR_VENDOR_PREFIX")]
    vendor_prefix: Option<String>,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match (&args.config, &args.state_dir) {
        (Some(path), _) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        (None, Some(state_dir)) => Config::new(state_dir),
        (None, None) => anyhow::bail!("either --config or --state-dir is required"),
    };

    if let Some(state_dir) = &args.state_dir {
        config.state_dir = state_dir.clone();
    }
    if let Some(host) = &args.host {
        config.listen.host = host.clone();
    }
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(prefix) = &args.vendor_prefix {
        config.vendor_prefix = prefix.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = load_config(&args)?;
    let dir = StateDir::create(&config.state_dir)
        .with_context(|| format!("Failed to prepare {}", config.state_dir.display()))?
        .with_locking(config.lock);
    let dispatcher = Arc::new(Dispatcher::with_vendor_prefix(
        dir,
        config.vendor_prefix.clone(),
    ));

    if config.metrics.enabled {
        let metrics_addr: SocketAddr = format!("{}:{}", config.listen.host, config.metrics.port)
            .parse()
            .context("Invalid metrics address")?;
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(metrics_addr).await {
                error!("Metrics server stopped: {}", e);
            }
        });
    }

    let addr: SocketAddr = config
        .listen
        .address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen.address()))?;
    let server = MockServer::bind(addr, dispatcher).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
