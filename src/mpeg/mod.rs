// MPEG audio frame parsing and duration calculation
pub mod duration;
pub mod header;

pub use duration::{read_properties, MpegProperties, DEFAULT_MAX_VBR_FRAMES};
pub use header::{ChannelMode, FrameHeader, Layer, MpegVersion};
