pub mod camera;
pub mod config;
pub mod controller;
pub mod mapping;

use crate::config::Config;
use crate::controller::controller_handle::ControllerHandle;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let (config, path) =
        Config::load_or_create().map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    info!("Using configuration {}", path.display());

    let settings = config
        .controller_settings()
        .map_err(|e| eyre!("Invalid configuration {}: {}", path.display(), e))?;

    info!("Starting controller, press Ctrl+C to stop");
    ControllerHandle::spawn(settings).run_until_shutdown().await?;

    info!("Controller stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
