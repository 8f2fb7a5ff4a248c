use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::{Channel, ReadingSet};

/// One user's exercise attempt, from identity capture to finish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub identity: String,
    pub started_at: DateTime<Utc>,
    pub latest_readings: ReadingSet,
    /// Readings captured when the current completion fired; what `Finish` stores.
    pub completed_readings: Option<ReadingSet>,
    pub completion_acknowledged: bool,
    /// Completions the operator answered with `Repeat`.
    pub repeats: u32,
}

/// The row handed to the result sink on `Finish`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub identity: String,
    pub started_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub readings: ReadingSet,
}

impl SessionRecord {
    /// Local wall-clock stamp in the `YYYY-MM-DD HH:MM:SS` form operators see.
    pub fn timestamp_label(&self) -> String {
        self.recorded_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    pub fn value(&self, channel: Channel) -> i32 {
        self.readings.get(channel)
    }
}
