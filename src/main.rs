use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rosco_bdd::config::{Config, ConfigLoader};
use rosco_bdd::{logging, run_features, run_script, RoscoClient, ScenarioContext};

#[cfg(feature = "stub")]
use rosco_bdd::{config::EcuBehaviour, stub, StubOptions};
#[cfg(feature = "stub")]
use tokio::signal;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "rosco_bdd",
    version,
    about = "Acceptance-test step bindings for the Rosco ECU connection REST API.",
    long_about = "Runs Gherkin feature files (or plain step scripts) that connect to, assert on and disconnect from an engine control unit through the Rosco REST service. Can also serve a stub of that service for offline runs."
)]
struct Args {
    /// Configuration file (overrides the standard resolution).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the Rosco service.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run feature files against the service.
    Run {
        /// Feature file or directory (defaults to `runner.features`).
        path: Option<PathBuf>,
    },
    /// Run a file of step lines, one per line, as a single scenario.
    Script {
        file: PathBuf,
    },
    /// Serve the stub Rosco service until interrupted.
    #[cfg(feature = "stub")]
    Stub {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long, value_enum)]
        behaviour: Option<EcuBehaviour>,
    },
    /// Print the effective configuration as TOML, headed by the file it came from.
    Config,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = ConfigLoader::load_with(args.config.as_deref())?;
    let source = loader.config_path.clone();
    let mut config = loader.into_config();
    if let Some(base_url) = args.base_url {
        config.service.base_url = base_url;
        config.validate()?;
    }
    logging::init(&config.logging);

    match args.command {
        Command::Run { path } => {
            let client = RoscoClient::new(&config.service.base_url)?;
            let path = path.unwrap_or_else(|| config.runner.features.clone());
            let summary = run_features(path, client).await;
            Ok(exit_code(summary.succeeded()))
        }
        Command::Script { file } => {
            let client = RoscoClient::new(&config.service.base_url)?;
            let text = std::fs::read_to_string(&file)?;
            let result = tokio::task::spawn_blocking(move || {
                let mut ctx = ScenarioContext::new();
                run_script(&mut ctx, &client, text.lines())
            })
            .await?;
            match result {
                Ok(executed) => {
                    tracing::info!(executed, "script passed");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!("{e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        #[cfg(feature = "stub")]
        Command::Stub {
            host,
            port,
            behaviour,
        } => {
            run_stub(&config, host, port, behaviour).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            print_config(&config, source.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(feature = "stub")]
async fn run_stub(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    behaviour: Option<EcuBehaviour>,
) -> std::io::Result<()> {
    let mut stub_cfg = config.stub.clone();
    if let Some(host) = host {
        stub_cfg.host = host;
    }
    if let Some(port) = port {
        stub_cfg.port = port;
    }
    if let Some(behaviour) = behaviour {
        stub_cfg.behaviour = behaviour;
    }

    let listener = tokio::net::TcpListener::bind((stub_cfg.host.as_str(), stub_cfg.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        behaviour = ?stub_cfg.behaviour,
        "stub rosco service listening"
    );
    stub::serve(listener, StubOptions::from(&stub_cfg), shutdown_signal()).await
}

fn print_config(config: &Config, source: Option<&Path>) -> Result<(), rosco_bdd::ConfigError> {
    let text = toml::to_string_pretty(config)?;
    match source {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# no configuration file found, built-in defaults"),
    }
    print!("{text}");
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// --- Graceful Shutdown Handler ---
#[cfg(feature = "stub")]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, shutting down stub service");
}
