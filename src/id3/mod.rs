// ID3v2 tag handling
pub mod frames;
pub mod tag;
pub mod v2;

pub use tag::Id3v2Tag;
pub use v2::{Id3Frame, Id3v2Extractor, Id3v2Header};
