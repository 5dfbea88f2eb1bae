use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use throttle::config::ThrottleConfig;
use throttle::grpc::GrpcServer;
use throttle::ratelimit::RateLimiter;

/// Fixed-window rate limiting service.
#[derive(Parser, Debug)]
#[command(name = "throttle", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "THROTTLE_CONFIG")]
    config: Option<String>,

    /// Override the gRPC listen address
    #[arg(long)]
    grpc_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the gRPC service (default)
    Serve,
    /// Print the effective policy table as JSON and exit
    Policies,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let mut config = ThrottleConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.grpc_addr {
        config.server.grpc_addr = addr;
    }
    let policies = config.rate_limiting.policy_registry()?;

    if let Some(Command::Policies) = args.command {
        println!("{}", serde_json::to_string_pretty(&policies.to_rules())?);
        return Ok(());
    }

    info!("Starting Throttle Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        grpc_addr = %config.server.grpc_addr,
        policies = ?policies.names().collect::<Vec<_>>(),
        "Configuration loaded"
    );

    let rate_limiter = Arc::new(RateLimiter::start(config.rate_limiting.sweep_interval()));
    info!("Rate limiter initialized");

    let grpc_server = GrpcServer::new(
        config.server.grpc_addr,
        Arc::clone(&rate_limiter),
        Arc::new(policies),
    );

    // Run the server with graceful shutdown on Ctrl+C
    grpc_server.serve_with_shutdown(shutdown_signal()).await?;

    rate_limiter.shutdown().await;

    info!("Throttle Rate Limiting Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
