// VORBIS_COMMENT block decoding

use crate::error::LayoutError;
use crate::layout::{Endian, Field, FrameLayout};
use crate::utils::encoding::TextEncoding;

/// Vendor string, then a counted list of `KEY=value` strings, all
/// little-endian length-prefixed UTF-8
const VORBIS_COMMENT: FrameLayout = FrameLayout::new(&[
    Field::SizeOfData(Endian::Little),
    Field::EncodedSized,
    Field::SizeOfData(Endian::Little),
    Field::ListOfEncodedStrings(Endian::Little),
]);

/// Common Vorbis comment field names
pub mod fields {
    pub const TITLE: &str = "TITLE";
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const DATE: &str = "DATE";
    pub const TRACKNUMBER: &str = "TRACKNUMBER";
    pub const GENRE: &str = "GENRE";
    pub const COMMENT: &str = "COMMENT";
    pub const LYRICS: &str = "LYRICS";
}

/// Vorbis comment structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VorbisComment {
    pub vendor: String,
    pub comments: Vec<(String, String)>,
}

impl VorbisComment {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        let mut values = VORBIS_COMMENT.read(data, TextEncoding::Utf8)?;
        values.skip()?;
        let vendor = values.text()?;
        values.skip()?;

        let comments = values
            .text_list()?
            .into_iter()
            .filter_map(|comment| match comment.split_once('=') {
                Some((key, value)) => Some((key.to_string(), value.to_string())),
                None => {
                    log::debug!("Vorbis comment without '=': {:?}", comment);
                    None
                }
            })
            .collect();

        Ok(VorbisComment { vendor, comments })
    }

    /// First value for `field`, compared case-insensitively
    pub fn get(&self, field: &str) -> Option<&str> {
        self.get_all(field).next()
    }

    pub fn get_all<'a, 'b>(&'a self, field: &'b str) -> impl Iterator<Item = &'a str> + 'b
    where
        'a: 'b,
    {
        self.comments
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }
}
