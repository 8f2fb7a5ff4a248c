use log::{error, info};
use serde::Serialize;

use crate::channels::{Channel, ChannelTable, ReadingSet};
use crate::models::SessionRecord;
use crate::session::SessionPhase;
use crate::vision::{mapper::fill_fraction, PipelineOutput};

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIndicator {
    pub channel: Channel,
    pub value: i32,
    /// Whether a blob was found on this tick.
    pub present: bool,
    /// 0 at the bottom of the column (min), 1 at the top (max).
    pub fill: f64,
    pub column_center: u32,
    pub color: [u8; 3],
}

/// Everything a renderer needs for one tick; the core never draws pixels.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenterFrame {
    pub phase: SessionPhase,
    pub identity: Option<String>,
    pub readings: ReadingSet,
    pub indicators: [ChannelIndicator; 3],
}

impl PresenterFrame {
    pub fn build(
        channels: &ChannelTable,
        phase: SessionPhase,
        identity: Option<String>,
        readings: ReadingSet,
        output: Option<&PipelineOutput>,
    ) -> Self {
        let indicators = Channel::ALL.map(|channel| {
            let config = channels.get(channel);
            let value = readings.get(channel);
            ChannelIndicator {
                channel,
                value,
                present: output.is_some_and(|o| o.present(channel)),
                fill: fill_fraction(value, &config.value_range),
                column_center: config.column_center(),
                color: config.draw_color,
            }
        });
        Self {
            phase,
            identity,
            readings,
            indicators,
        }
    }

    pub fn presence(&self) -> [bool; 3] {
        self.indicators.map(|i| i.present)
    }
}

pub trait Presenter: Send {
    fn render(&mut self, frame: &PresenterFrame);

    fn session_started(&mut self, _identity: &str) {}

    fn confirmation_requested(&mut self, _readings: &ReadingSet) {}

    fn session_closed(&mut self, _record: &SessionRecord) {}

    fn persistence_failed(&mut self, _error: &anyhow::Error) {}
}

/// Headless presenter that logs readings whenever they change.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last: Option<(ReadingSet, [bool; 3], SessionPhase)>,
}

impl Presenter for LogPresenter {
    fn render(&mut self, frame: &PresenterFrame) {
        let current = (frame.readings, frame.presence(), frame.phase);
        if self.last == Some(current) {
            return;
        }
        self.last = Some(current);
        info!(
            "[{}] {} (present: {:?})",
            frame.phase.as_str(),
            frame.readings,
            frame.presence()
        );
    }

    fn session_started(&mut self, identity: &str) {
        info!("Session started for card {identity}");
    }

    fn confirmation_requested(&mut self, readings: &ReadingSet) {
        info!("Column full at {readings}. Repeat or finished? [r/f]");
    }

    fn session_closed(&mut self, record: &SessionRecord) {
        info!(
            "Saved {} at {}: {}. Please scan the next card.",
            record.identity,
            record.timestamp_label(),
            record.readings
        );
    }

    fn persistence_failed(&mut self, err: &anyhow::Error) {
        error!("Could not save data: {err:#}. Choose finished again to retry.");
    }
}
