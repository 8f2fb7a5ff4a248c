use anyhow::Result;
use image::RgbImage;

use crate::channels::{Channel, ChannelTable, ReadingSet};
use crate::settings::StationSettings;

use super::{BlobDetector, ColorSegmenter, Detection, FramePrep, HsvImage, PositionMapper};

/// Result of one pipeline pass over a captured frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOutput {
    pub readings: ReadingSet,
    pub detections: [Option<Detection>; 3],
}

impl PipelineOutput {
    pub fn detection(&self, channel: Channel) -> Option<&Detection> {
        self.detections[channel.index()].as_ref()
    }

    pub fn present(&self, channel: Channel) -> bool {
        self.detections[channel.index()].is_some()
    }
}

pub struct DetectionPipeline {
    prep: FramePrep,
    segmenter: ColorSegmenter,
    detector: BlobDetector,
    mapper: PositionMapper,
    channels: ChannelTable,
}

impl DetectionPipeline {
    pub fn new(
        prep: FramePrep,
        segmenter: ColorSegmenter,
        detector: BlobDetector,
        mapper: PositionMapper,
        channels: ChannelTable,
    ) -> Self {
        Self {
            prep,
            segmenter,
            detector,
            mapper,
            channels,
        }
    }

    pub fn from_settings(settings: &StationSettings, channels: ChannelTable) -> Result<Self> {
        Ok(Self::new(
            FramePrep::new(settings.frame.clone()),
            ColorSegmenter::default(),
            BlobDetector::new(settings.min_blob_radius),
            PositionMapper::from_settings(&settings.mapping)?,
            channels,
        ))
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Prepare, segment, detect and map all three channels of a raw frame.
    /// Masks live only for the duration of this call.
    pub fn process(&self, frame: &RgbImage) -> PipelineOutput {
        let prepared = self.prep.prepare(frame);
        let hsv = HsvImage::from_rgb(&prepared);

        let mut readings = self.channels.min_readings();
        let mut detections = [None; 3];
        for config in self.channels.iter() {
            let mask = self.segmenter.segment(&hsv, &config.hsv);
            let detection = self.detector.detect(&mask);
            let value = self
                .mapper
                .map(detection.map(|d| d.position.y), &config.value_range);
            readings.set(config.channel, value);
            detections[config.channel.index()] = detection;
        }

        PipelineOutput {
            readings,
            detections,
        }
    }
}
