mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "gateflow")]
#[command(
    about = "Deploy a serverless function behind an API gateway and mint its keys",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the function, API, API config and gateway, then create keys
    Deploy(commands::deploy::DeployArgs),
    /// Create API keys for an already deployed API
    CreateKeys(commands::create_keys::CreateKeysArgs),
    /// Show the resource graph without calling the provider
    Plan {
        #[command(flatten)]
        stack: utils::StackArgs,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the endpoint and keys
    init_tracing();

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("Interrupted; letting in-flight calls finish");
        cancel_on_signal.cancel();
    });

    let outcome = match cli.command {
        Commands::Version => {
            println!("gateflow {}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
        Commands::Plan { stack } => commands::plan::handle(&stack),
        Commands::Deploy(args) => commands::deploy::handle(args, cancel).await,
        Commands::CreateKeys(args) => commands::create_keys::handle(args).await,
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "warn,gateflow=info,gateflow_cloud=info,gateflow_cloud_gcp=info,gateflow_config=info",
        )
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
