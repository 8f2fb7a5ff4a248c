pub mod blob;
pub mod hsv;
pub mod mapper;
pub mod pipeline;
pub mod prep;
pub mod segmenter;

pub use blob::{BlobDetector, Detection};
pub use hsv::HsvImage;
pub use mapper::PositionMapper;
pub use pipeline::{DetectionPipeline, PipelineOutput};
pub use prep::FramePrep;
pub use segmenter::ColorSegmenter;
