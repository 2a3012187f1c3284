//! `grimm`: loads the application under `--root` and serves it until
//! SIGINT/SIGTERM.
//!
//! Exit status: 2 when the bundles directory cannot be read, 4 when the
//! process would keep running as root, 1 for any other startup failure.

mod cli;
mod config;
mod logging;
mod signals;

use cli::CliArgs;
use config::AppConfig;
use grimm_server::{Grimm, GrimmConfig, StartupError};
use logging::setup_logging;
use signals::shutdown_signal;
use std::sync::Arc;
use tracing::{error, info, warn};

async fn prepare(args: &CliArgs) -> Result<GrimmConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    config.apply_overrides(args);

    if let Err(e) = config.validate() {
        return Err(format!("Configuration validation failed: {}", e).into());
    }

    setup_logging(&config.logging)?;
    info!(
        "Config: {} | Root: {} | Env: {}",
        args.config_path.display(),
        config.app.root.display(),
        config.app.env
    );

    let environment = config.load_environment().await?;
    Ok(config.to_grimm_config(environment))
}

async fn run(config: GrimmConfig) -> Result<(), StartupError> {
    let grimm = Arc::new(Grimm::new(config).await?);
    info!("Starting {}", grimm);

    let mut server = grimm.start().await?;
    info!("Ready on {}", server.local_addr());

    match shutdown_signal().await {
        Ok(signal) => info!("Received {}, draining connections", signal),
        Err(e) => warn!("Signal handling unavailable, shutting down: {}", e),
    }

    server.shutdown();
    server.wait().await?;
    info!("Shutdown complete");
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    let config = match prepare(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to start grimm: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
