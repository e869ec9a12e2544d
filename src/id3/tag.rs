// ID3v2 tag facade

use std::io::{Read, Seek};

use super::frames::{
    is_text_frame, is_url_frame, read_text_frame, read_url_frame, CommentFrame, PictureFrame,
    UserTextFrame, UserUrlFrame,
};
use super::v2::Id3v2Extractor;
use crate::error::{LayoutError, Result};
use crate::field_mapping::{FieldMappings, StandardField, ValueConverter};

type FrameReader<T> = fn(&[u8]) -> std::result::Result<T, LayoutError>;

/// Semantic access to an extracted ID3v2 tag.
///
/// Getters return an empty string (or list) when the frame is absent or
/// cannot be decoded.
#[derive(Debug, Clone)]
pub struct Id3v2Tag {
    extractor: Id3v2Extractor,
}

impl Id3v2Tag {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Id3v2Extractor::read(reader).map(Self::new)
    }

    pub fn new(extractor: Id3v2Extractor) -> Self {
        Id3v2Tag { extractor }
    }

    pub fn extractor(&self) -> &Id3v2Extractor {
        &self.extractor
    }

    pub fn version(&self) -> u8 {
        self.extractor.version()
    }

    /// Value of the first text (T***) or URL (W***) frame `id`
    pub fn text(&self, id: &str) -> String {
        self.texts(id).into_iter().next().unwrap_or_default()
    }

    /// Values of every text or URL frame `id`, in file order
    pub fn texts(&self, id: &str) -> Vec<String> {
        let decode: FrameReader<String> = if is_text_frame(id) {
            read_text_frame
        } else if is_url_frame(id) {
            read_url_frame
        } else {
            return Vec::new();
        };

        self.extractor
            .frames(id)
            .iter()
            .filter_map(|frame| decoded(id, decode(&frame.data)))
            .collect()
    }

    /// Standard field, trying each frame ID the tag version may use
    pub fn get(&self, field: StandardField) -> String {
        let ids = FieldMappings::to_id3v2(field, self.version());
        let value = match field {
            StandardField::Comment => self.comments().into_iter().next().map(|c| c.text),
            StandardField::Lyrics => self.lyrics_frames().into_iter().next().map(|l| l.text),
            StandardField::Cover => None,
            _ => ids
                .iter()
                .map(|id| self.text(id))
                .find(|value| !value.is_empty()),
        };
        value.unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.get(StandardField::Title)
    }

    pub fn artist(&self) -> String {
        self.get(StandardField::Artist)
    }

    pub fn album(&self) -> String {
        self.get(StandardField::Album)
    }

    pub fn year(&self) -> String {
        ValueConverter::normalize_year(&self.get(StandardField::Year))
    }

    pub fn track(&self) -> String {
        self.get(StandardField::Track)
    }

    pub fn genre(&self) -> String {
        ValueConverter::normalize_genre(&self.get(StandardField::Genre))
    }

    pub fn comment(&self) -> String {
        self.get(StandardField::Comment)
    }

    pub fn lyrics(&self) -> String {
        self.get(StandardField::Lyrics)
    }

    pub fn comments(&self) -> Vec<CommentFrame> {
        self.decode_all(StandardField::Comment, CommentFrame::read)
    }

    pub fn lyrics_frames(&self) -> Vec<CommentFrame> {
        self.decode_all(StandardField::Lyrics, CommentFrame::read)
    }

    /// Embedded pictures (APIC, or PIC for v2.2)
    pub fn pictures(&self) -> Vec<PictureFrame> {
        let read: FrameReader<PictureFrame> = if self.version() == 2 {
            PictureFrame::read_v22
        } else {
            PictureFrame::read
        };
        self.decode_all(StandardField::Cover, read)
    }

    /// TXXX / TXX frames
    pub fn user_texts(&self) -> Vec<UserTextFrame> {
        let id = if self.version() == 2 { "TXX" } else { "TXXX" };
        self.decode_frames(id, UserTextFrame::read)
    }

    /// WXXX / WXX frames
    pub fn user_urls(&self) -> Vec<UserUrlFrame> {
        let id = if self.version() == 2 { "WXX" } else { "WXXX" };
        self.decode_frames(id, UserUrlFrame::read)
    }

    fn decode_all<T>(&self, field: StandardField, read: FrameReader<T>) -> Vec<T> {
        FieldMappings::to_id3v2(field, self.version())
            .iter()
            .flat_map(|id| self.decode_frames(id, read))
            .collect()
    }

    fn decode_frames<T>(&self, id: &str, read: FrameReader<T>) -> Vec<T> {
        self.extractor
            .frames(id)
            .iter()
            .filter_map(|frame| decoded(id, read(&frame.data)))
            .collect()
    }
}

fn decoded<T>(id: &str, result: std::result::Result<T, LayoutError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Skipping undecodable {} frame: {}", id, e);
            None
        }
    }
}
