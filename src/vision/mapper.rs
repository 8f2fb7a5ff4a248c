use anyhow::{bail, Result};

use crate::channels::ValueRange;
use crate::settings::MappingSettings;

/// Converts a blob's vertical pixel coordinate into a channel reading.
///
/// Smaller y is higher in the frame and reads larger: `y_near` maps to the
/// channel maximum, `y_far` to its minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMapper {
    y_near: f64,
    y_far: f64,
}

impl PositionMapper {
    pub fn new(y_near: f64, y_far: f64) -> Result<Self> {
        if !(y_near.is_finite() && y_far.is_finite()) || y_near >= y_far {
            bail!("invalid mapping bounds: y_near ({y_near}) must be above y_far ({y_far})");
        }
        Ok(Self { y_near, y_far })
    }

    pub fn from_settings(settings: &MappingSettings) -> Result<Self> {
        Self::new(settings.y_near, settings.y_far)
    }

    /// Position along the column, 0 at `y_near` and 1 at `y_far`.
    pub fn normalize(&self, y: f64) -> f64 {
        let clamped = y.max(self.y_near);
        ((clamped - self.y_near) / (self.y_far - self.y_near)).clamp(0.0, 1.0)
    }

    /// No detection reads as the channel minimum, never as an interpolated
    /// pixel position.
    pub fn map(&self, y: Option<i32>, range: &ValueRange) -> i32 {
        let Some(y) = y else {
            return range.min;
        };
        let t = self.normalize(y as f64);
        let value = ((1.0 - t) * range.span() as f64 + range.min as f64).round() as i32;
        range.clamp(value)
    }
}

/// Height of a reading within its column: 0 at `min`, 1 at `max`.
pub fn fill_fraction(value: i32, range: &ValueRange) -> f64 {
    if range.span() <= 0 {
        return 0.0;
    }
    ((value - range.min) as f64 / range.span() as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: ValueRange = ValueRange::new(0, 600);
    const GREEN: ValueRange = ValueRange::new(900, 1200);

    fn mapper() -> PositionMapper {
        PositionMapper::new(256.0, 352.0).unwrap()
    }

    #[test]
    fn worked_example() {
        // round((1 - 4/96) * 600) = round(575.0)
        assert_eq!(mapper().map(Some(260), &BLUE), 575);
    }

    #[test]
    fn clamps_at_both_ends() {
        let m = mapper();
        for y in [0, 100, 255, 256] {
            assert_eq!(m.map(Some(y), &GREEN), 1200, "y={y}");
        }
        for y in [352, 353, 480] {
            assert_eq!(m.map(Some(y), &GREEN), 900, "y={y}");
        }
    }

    #[test]
    fn absence_reads_min() {
        assert_eq!(mapper().map(None, &BLUE), 0);
        assert_eq!(mapper().map(None, &GREEN), 900);
    }

    #[test]
    fn monotone_over_usable_range() {
        let m = mapper();
        let readings: Vec<i32> = (256..=352).map(|y| m.map(Some(y), &BLUE)).collect();
        assert!(readings.windows(2).all(|w| w[0] >= w[1]));
        assert!(readings.iter().all(|v| BLUE.min <= *v && *v <= BLUE.max));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(PositionMapper::new(352.0, 256.0).is_err());
        assert!(PositionMapper::new(256.0, 256.0).is_err());
    }

    #[test]
    fn fill_fraction_spans_column() {
        assert_eq!(fill_fraction(600, &BLUE), 1.0);
        assert_eq!(fill_fraction(0, &BLUE), 0.0);
        assert_eq!(fill_fraction(1050, &GREEN), 0.5);
    }
}
