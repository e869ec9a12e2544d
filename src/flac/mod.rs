// FLAC metadata handling
pub mod metadata;
pub mod picture;
pub mod streaminfo;
pub mod tag;
pub mod vorbis;

pub use metadata::{BlockHeader, BlockType, FlacBlock, FlacExtractor, FLAC_SIGNATURE};
pub use picture::{FlacPicture, PictureType};
pub use streaminfo::StreamInfo;
pub use tag::FlacTag;
pub use vorbis::VorbisComment;
