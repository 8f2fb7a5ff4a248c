use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Region of the raw capture that contains the three columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameSettings {
    pub mirror: bool,
    pub crop: Option<CropRegion>,
    /// Gaussian sigma; 2.0 matches an 11x11 kernel. Zero disables smoothing.
    pub blur_sigma: f32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            mirror: true,
            crop: Some(CropRegion {
                x: 116,
                y: 0,
                width: 314,
                height: 352,
            }),
            blur_sigma: 2.0,
        }
    }
}

/// Vertical pixel bounds of the usable column range in the cropped frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MappingSettings {
    /// Maps to the channel maximum; anything above saturates.
    pub y_near: f64,
    /// Maps to the channel minimum.
    pub y_far: f64,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            y_near: 256.0,
            y_far: 352.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationSettings {
    pub tick_interval_ms: u64,
    pub camera_open_attempts: u32,
    pub camera_retry_delay_ms: u64,
    pub frames_dir: PathBuf,
    pub calibration_path: PathBuf,
    pub database_path: PathBuf,
    pub frame: FrameSettings,
    pub mapping: MappingSettings,
    pub min_blob_radius: f64,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            camera_open_attempts: 3,
            camera_retry_delay_ms: 500,
            frames_dir: PathBuf::from("frames"),
            calibration_path: PathBuf::from("hsv.json"),
            database_path: PathBuf::from("respiro.sqlite3"),
            frame: FrameSettings::default(),
            mapping: MappingSettings::default(),
            min_blob_radius: 10.0,
        }
    }
}

impl StationSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn camera_retry_delay(&self) -> Duration {
        Duration::from_millis(self.camera_retry_delay_ms)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: StationSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                StationSettings::default()
            })
        } else {
            StationSettings::default()
        };

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn settings(&self) -> &StationSettings {
        &self.data
    }
}
