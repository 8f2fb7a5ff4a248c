//! Per-color channel identity, calibration and per-tick readings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Blue,
    Orange,
    Green,
}

impl Channel {
    /// Fixed channel order used for readings, records and iteration.
    pub const ALL: [Channel; 3] = [Channel::Blue, Channel::Orange, Channel::Green];

    pub fn index(self) -> usize {
        match self {
            Channel::Blue => 0,
            Channel::Orange => 1,
            Channel::Green => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Blue => "Blue",
            Channel::Orange => "Orange",
            Channel::Green => "Green",
        }
    }
}

/// Inclusive HSV threshold in the 8-bit convention (H in 0..=179).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueRange {
    pub min: i32,
    pub max: i32,
}

impl ValueRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Static calibration for one channel. Immutable once the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: Channel,
    pub hsv: HsvRange,
    /// Horizontal pixel interval `(x0, x1)` of the column.
    pub column_bounds: (u32, u32),
    pub value_range: ValueRange,
    /// Indicator color (RGB) for renderers.
    pub draw_color: [u8; 3],
}

impl ChannelConfig {
    pub fn default_for(channel: Channel) -> Self {
        match channel {
            Channel::Blue => Self {
                channel,
                hsv: HsvRange::new([94, 80, 2], [126, 255, 255]),
                column_bounds: (150, 200),
                value_range: ValueRange::new(0, 600),
                draw_color: [0, 0, 255],
            },
            Channel::Orange => Self {
                channel,
                hsv: HsvRange::new([4, 100, 20], [25, 255, 255]),
                column_bounds: (250, 300),
                value_range: ValueRange::new(600, 900),
                draw_color: [255, 165, 0],
            },
            Channel::Green => Self {
                channel,
                hsv: HsvRange::new([23, 42, 0], [100, 255, 255]),
                column_bounds: (350, 400),
                value_range: ValueRange::new(900, 1200),
                draw_color: [0, 255, 0],
            },
        }
    }

    pub fn column_center(&self) -> u32 {
        (self.column_bounds.0 + self.column_bounds.1) / 2
    }
}

/// The three channel configurations, indexed by [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTable {
    configs: [ChannelConfig; 3],
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self {
            configs: Channel::ALL.map(ChannelConfig::default_for),
        }
    }
}

impl ChannelTable {
    /// Replaces the HSV thresholds, keeping column bounds and value ranges.
    pub fn with_hsv(mut self, channel: Channel, hsv: HsvRange) -> Self {
        self.configs[channel.index()].hsv = hsv;
        self
    }

    pub fn get(&self, channel: Channel) -> &ChannelConfig {
        &self.configs[channel.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.configs.iter()
    }

    /// Every channel at its minimum, the state of a freshly started session.
    pub fn min_readings(&self) -> ReadingSet {
        ReadingSet::new(Channel::ALL.map(|c| self.get(c).value_range.min))
    }

    /// Channels whose reading sits exactly at their configured maximum.
    pub fn saturated(&self, readings: &ReadingSet) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|&c| readings.get(c) == self.get(c).value_range.max)
            .collect()
    }
}

/// One calibrated integer per channel, in [`Channel::ALL`] order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSet {
    values: [i32; 3],
}

impl ReadingSet {
    pub const fn new(values: [i32; 3]) -> Self {
        Self { values }
    }

    pub fn get(&self, channel: Channel) -> i32 {
        self.values[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, value: i32) {
        self.values[channel.index()] = value;
    }

    pub fn values(&self) -> [i32; 3] {
        self.values
    }
}

impl std::fmt::Display for ReadingSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Blue={} Orange={} Green={}",
            self.values[0], self.values[1], self.values[2]
        )
    }
}
