use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use log::{info, warn};

/// Camera capability. `capture` may block; it is the only suspension point
/// of a tick.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<()>;

    /// `Ok(None)` means the device produced no frame this time.
    fn capture(&mut self) -> Result<Option<RgbImage>>;

    fn release(&mut self);
}

/// Try to open the source a few times before giving up for good.
pub async fn open_with_retry(
    source: &mut dyn FrameSource,
    attempts: u32,
    delay: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match source.open() {
            Ok(()) => {
                info!("Camera ready after {attempt} attempt(s)");
                return Ok(());
            }
            Err(err) => {
                warn!("Camera open attempt {attempt}/{attempts} failed: {err:#}");
                last_err = Some(err);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| anyhow!("no open attempt made"))
        .context(format!("camera failed to initialize after {attempts} attempts")))
}

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays still frames from a directory in name order, looping at the end.
/// Stands in for the camera on a bench or in tests.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    next: usize,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frames: Vec::new(),
            next: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn is_frame(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl FrameSource for DirectoryFrameSource {
    fn open(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("frame directory {} unavailable", self.dir.display()))?;

        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if Self::is_frame(&path) {
                frames.push(path);
            }
        }
        if frames.is_empty() {
            bail!("no frames found in {}", self.dir.display());
        }
        frames.sort();

        info!("Replaying {} frames from {}", frames.len(), self.dir.display());
        self.frames = frames;
        self.next = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<RgbImage>> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        let path = &self.frames[self.next];
        self.next = (self.next + 1) % self.frames.len();
        let frame = image::open(path)
            .with_context(|| format!("failed to decode frame {}", path.display()))?;
        Ok(Some(frame.to_rgb8()))
    }

    fn release(&mut self) {
        self.frames.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyCamera {
        failures_left: u32,
        opens: u32,
    }

    impl FrameSource for FlakyCamera {
        fn open(&mut self) -> Result<()> {
            self.opens += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                bail!("device busy");
            }
            Ok(())
        }
        fn capture(&mut self) -> Result<Option<RgbImage>> {
            Ok(None)
        }
        fn release(&mut self) {}
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let mut camera = FlakyCamera {
            failures_left: 2,
            opens: 0,
        };
        open_with_retry(&mut camera, 3, Duration::ZERO).await.unwrap();
        assert_eq!(camera.opens, 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_attempts() {
        let mut camera = FlakyCamera {
            failures_left: 10,
            opens: 0,
        };
        let err = open_with_retry(&mut camera, 3, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(camera.opens, 3);
        assert!(format!("{err:#}").contains("device busy"));
    }

    #[test]
    fn directory_source_cycles_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(4, 2).save(dir.path().join("b.png")).unwrap();
        RgbImage::new(3, 2).save(dir.path().join("a.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = DirectoryFrameSource::new(dir.path());
        source.open().unwrap();
        assert_eq!(source.frame_count(), 2);

        let widths: Vec<u32> = (0..3)
            .map(|_| source.capture().unwrap().unwrap().width())
            .collect();
        assert_eq!(widths, [3, 4, 3]);

        source.release();
        assert!(source.capture().unwrap().is_none());
    }

    #[test]
    fn missing_or_empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryFrameSource::new(dir.path()).open().is_err());
        assert!(DirectoryFrameSource::new(dir.path().join("nope")).open().is_err());
    }
}
