// Error kinds shared by the extractors

use crate::utils::encoding::EncodingError;

/// Errors raised while locating or walking a tag (ID3v2 or FLAC)
#[derive(thiserror::Error, Debug)]
pub enum TagError {
    /// The file simply carries no tag of this format
    #[error("No tag present")]
    NoTag,
    /// Bytes are present but belong to some other format
    #[error("Unknown tag")]
    UnknownTag,
    /// The marker matched but the version is not supported
    #[error("Unknown tag version: {0}")]
    UnknownTagVersion(u8),
    /// The marker matched but the structure is broken
    #[error("Invalid tag: {0}")]
    InvalidTag(&'static str),
    /// Recognized feature that is deliberately not handled
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TagError {
    /// `NoTag` and `UnknownTag` mean "carry on without textual metadata"
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TagError::NoTag | TagError::UnknownTag)
    }
}

/// Errors raised while walking MPEG audio frames
#[derive(thiserror::Error, Debug)]
pub enum MpegError {
    /// Normal end of the frame walk
    #[error("End of stream")]
    Eof,
    /// Not a single valid frame at the expected position
    #[error("No MPEG frame found")]
    NoFrame,
    #[error("Invalid frame header: {0}")]
    InvalidFrameHeader(&'static str),
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for MpegError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            MpegError::Eof
        } else {
            MpegError::Io(e)
        }
    }
}

/// Errors raised by field decoders while materializing a single frame
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LayoutError {
    /// Fewer bytes remain than the field requires
    #[error("Truncated frame: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    /// A typed accessor asked for a different kind of value than was decoded
    #[error("Expected {expected} field, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Accessor ran past the end of the decoded values
    #[error("No more fields")]
    Exhausted,
    #[error(transparent)]
    Text(#[from] EncodingError),
}

pub type Result<T> = std::result::Result<T, TagError>;
