pub mod loop_worker;
pub mod source;

pub use loop_worker::station_loop;
pub use source::{open_with_retry, DirectoryFrameSource, FrameSource};
