use anyhow::{Context, Result};
use clap::Parser;
use picturephone_capture::{CameraSource, CaptureHandle};
use picturephone_term::Presenter;

mod cli;
mod config;
mod mirror;
mod redraw;
mod session;
mod status;
mod stdin_bridge;

use cli::Cli;
use config::Mode;

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_cameras {
        for id in cli::list_camera_ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let file_config = config::Config::load(cli.config.as_deref())
        .context("failed to load configuration file")?;
    let config = cli.apply(file_config);
    config.validate().context("invalid configuration")?;

    let presenter = Presenter::new().context("terminal is not available")?;

    let source = CameraSource::resolve(&config.camera);
    let capture = CaptureHandle::start(source, CAPTURE_WIDTH, CAPTURE_HEIGHT)
        .context("failed to start camera capture")?;

    let ramp = config.resolve_density();
    let stdin_rx = stdin_bridge::spawn();

    tracing::info!(mode = ?config.mode, camera = %config.camera, "picturephone starting");

    match config.mode {
        Mode::Mirror => mirror::run(presenter, capture, ramp, stdin_rx).await,
        Mode::Network => {
            session::run(
                config.role,
                config.port,
                config.peer,
                config.view,
                presenter,
                capture,
                ramp,
                stdin_rx,
            )
            .await
        }
    }
}
