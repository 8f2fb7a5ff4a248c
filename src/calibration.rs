use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::channels::{Channel, ChannelTable, HsvRange};

/// On-disk HSV threshold table written by the calibration tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalibrationTable {
    pub blue: HsvRange,
    pub orange: HsvRange,
    pub green: HsvRange,
}

impl CalibrationTable {
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Malformed calibration table {}", path.display()))
    }

    pub fn range(&self, channel: Channel) -> HsvRange {
        match channel {
            Channel::Blue => self.blue,
            Channel::Orange => self.orange,
            Channel::Green => self.green,
        }
    }

    pub fn apply(&self, table: ChannelTable) -> ChannelTable {
        Channel::ALL
            .into_iter()
            .fold(table, |acc, channel| acc.with_hsv(channel, self.range(channel)))
    }

    /// Builds the channel table for this run. A missing or unreadable table
    /// never blocks startup; the built-in thresholds are used instead.
    pub fn load_or_default(path: &Path) -> ChannelTable {
        if !path.exists() {
            info!(
                "No calibration table at {}; using built-in HSV defaults",
                path.display()
            );
            return ChannelTable::default();
        }

        match Self::read(path) {
            Ok(calibration) => {
                info!("Loaded HSV calibration from {}", path.display());
                calibration.apply(ChannelTable::default())
            }
            Err(err) => {
                warn!("{err:#}; falling back to built-in HSV defaults");
                ChannelTable::default()
            }
        }
    }
}
