//! `luna` command-line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use luna_ssr::config::{check_app, load_config, EngineConfig, Environment};
use luna_ssr::lifecycle::{launch, signals, StartupError};
use luna_ssr::observability::logging;
use luna_ssr::{HttpServer, Shutdown};

const DEFAULT_CONFIG: &str = "luna.toml";

#[derive(Parser)]
#[command(name = "luna", version, about = "Server-side rendering engine for JSX/TSX frontends")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve pages (and live reload outside production).
    Serve(ServeArgs),
    /// Validate the configuration and frontend tree, then exit.
    Check(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Config file. Defaults to ./luna.toml when present.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Override the configured environment (development | production).
    #[arg(long)]
    env: Option<Environment>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Check(args) => check(args),
    }
}

async fn serve(args: ServeArgs) -> ExitCode {
    let mut config = match read_config(args.config.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("luna: {message}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(env) = args.env {
        config.env = env;
    }

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("luna: failed to initialize logging: {e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.env,
        bind_address = %config.listener.bind_address,
        "luna starting"
    );

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(Arc::clone(&shutdown));

    match launch(HttpServer::new(config), shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let StartupError::Checks(errors) = &e {
                for error in errors {
                    tracing::error!(%error, "Startup check failed");
                }
            }
            tracing::error!(error = %e, "luna failed");
            ExitCode::FAILURE
        }
    }
}

fn check(args: ConfigArgs) -> ExitCode {
    let config = match read_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("luna: {message}");
            return ExitCode::FAILURE;
        }
    };

    let routes = HttpServer::new(config.clone()).all_routes();
    match check_app(&config, &routes) {
        Ok(()) => {
            println!("ok: {} route(s), env {}", routes.len(), config.env);
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Explicit paths must exist; the default path falls back to built-in defaults.
fn read_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => {
            let mut config = EngineConfig::default();
            if let Ok(value) = std::env::var(luna_ssr::config::ENV_VAR) {
                config.env = value.parse()?;
            }
            return Ok(config);
        }
    };
    load_config(path).map_err(|e| e.to_string())
}
