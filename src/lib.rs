pub mod calibration;
pub mod capture;
pub mod channels;
pub mod db;
pub mod models;
pub mod operator;
pub mod presenter;
pub mod session;
pub mod settings;
pub mod utils;
pub mod vision;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use calibration::CalibrationTable;
use capture::{open_with_retry, station_loop, DirectoryFrameSource, FrameSource};
use db::Database;
use presenter::LogPresenter;
use session::StationController;
use settings::SettingsStore;
use vision::DetectionPipeline;

const CONFIG_ENV: &str = "RESPIRO_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "respiro.json";

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let store = SettingsStore::new(config_path)?;
    let settings = store.settings().clone();
    info!("Loaded settings from {}", store.path().display());

    let channels = CalibrationTable::load_or_default(&settings.calibration_path);
    let pipeline = DetectionPipeline::from_settings(&settings, channels)
        .context("invalid detection settings")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(async move {
        let database = Database::new(settings.database_path.clone())?;

        let mut source: Box<dyn FrameSource> =
            Box::new(DirectoryFrameSource::new(settings.frames_dir.clone()));
        if let Err(err) = open_with_retry(
            source.as_mut(),
            settings.camera_open_attempts,
            settings.camera_retry_delay(),
        )
        .await
        {
            error!("{err:#}");
            source.release();
            return Err(err);
        }

        let controller =
            StationController::new(pipeline, Arc::new(database), Box::new(LogPresenter::default()));

        let (line_tx, line_rx) = mpsc::channel(16);
        // Detached: the reader blocks on stdin and dies with the process.
        let _reader = operator::spawn_stdin_reader(line_tx)?;

        let cancel_token = CancellationToken::new();
        let ctrl_c_token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                ctrl_c_token.cancel();
            }
        });

        info!("Station ready. Scan a card to begin.");
        station_loop(
            controller,
            source,
            line_rx,
            cancel_token,
            settings.tick_interval(),
        )
        .await
    })
}
