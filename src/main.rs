//! gateway-controller
//!
//! Runs the sidecar injector webhook and the ingress controller side by side.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │               GATEWAY CONTROLLER              │
//!                     │                                               │
//!   kube-apiserver    │  ┌───────────┐    ┌──────────┐                │
//!   AdmissionReview ──┼─▶│   http    │───▶│ injector │ (JSON patch)   │
//!                     │  │ WebServer │    └──────────┘                │
//!                     │  └───────────┘                                │
//!                     │                                               │
//!   Ingress events ───┼─▶┌───────────┐    ┌──────────┐                │
//!                     │  │  ingress  │───▶│ gateway  │────────────────┼──▶ Gateway
//!                     │  │controller │    │  client  │                │    admin API
//!                     │  └───────────┘    └──────────┘                │
//!                     │                                               │
//!                     │  lifecycle: start order, signals, shutdown    │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use gateway_controller::config::{self, ControllerConfig};
use gateway_controller::ingress::IngressController;
use gateway_controller::lifecycle::{listen_for_signals, Orchestrator};
use gateway_controller::observability::{logging, metrics};
use gateway_controller::WebServer;

#[derive(Parser)]
#[command(name = "gateway-controller")]
#[command(about = "Sidecar injector and ingress controller for the API gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook and the ingress controller until terminated
    Start {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load and validate a configuration file, then exit
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => start(&config).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

fn check_config(path: &Path) -> ExitCode {
    match config::load_config(path) {
        Ok(_) => {
            println!("{}: ok", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}

async fn start(path: &Path) -> ExitCode {
    let config = match config::load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        listen_address = %config.server.listen_address,
        tls = config.server.tls.is_some(),
        ingress_class = %config.ingress.ingress_class,
        "gateway-controller starting"
    );

    if let Err(e) = init_metrics(&config) {
        tracing::error!(error = %e, "Failed to start metrics exporter");
        return ExitCode::FAILURE;
    }

    // axum-server and reqwest both link rustls; pick the process-wide provider once.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Signal handlers go in before anything starts so an early signal is kept.
    let termination = match listen_for_signals() {
        Ok(termination) => termination,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let server = WebServer::new();
    let controller = IngressController::new(config.ingress.clone());

    match Orchestrator::new(server, controller, &config).run(termination).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "gateway-controller failed");
            ExitCode::FAILURE
        }
    }
}

fn init_metrics(config: &ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }

    let addr: SocketAddr = config.observability.metrics_address.parse()?;
    metrics::init_metrics(addr)?;
    Ok(())
}
