// Format-independent tag access

use crate::field_mapping::{FieldMappings, StandardField};
use crate::flac::{FlacExtractor, FlacTag};
use crate::id3::{Id3v2Extractor, Id3v2Tag};
use crate::CoverArt;

/// Raw view shared by every extractor: which frames exist and their bytes
pub trait Extractor {
    /// Frame identifiers (or FLAC block type names) present, sorted
    fn frame_titles(&self) -> Vec<String>;

    /// Payloads of every frame with this identifier, in file order
    fn frames_data(&self, id: &str) -> Vec<&[u8]>;
}

impl Extractor for Id3v2Extractor {
    fn frame_titles(&self) -> Vec<String> {
        self.ids().map(str::to_string).collect()
    }

    fn frames_data(&self, id: &str) -> Vec<&[u8]> {
        self.frames(id).iter().map(|frame| frame.data.as_slice()).collect()
    }
}

impl Extractor for FlacExtractor {
    fn frame_titles(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    fn frames_data(&self, id: &str) -> Vec<&[u8]> {
        self.blocks_named(id)
            .iter()
            .map(|block| block.data.as_slice())
            .collect()
    }
}

/// A decoded tag of any supported format
#[derive(Debug, Clone)]
pub enum Tag {
    Id3v2(Id3v2Tag),
    Flac(FlacTag),
}

impl Tag {
    pub fn extractor(&self) -> &dyn Extractor {
        match self {
            Tag::Id3v2(tag) => tag.extractor(),
            Tag::Flac(tag) => tag.extractor(),
        }
    }

    pub fn frame_titles(&self) -> Vec<String> {
        self.extractor().frame_titles()
    }

    pub fn frames_data(&self, id: &str) -> Vec<&[u8]> {
        self.extractor().frames_data(id)
    }

    /// "ID3v2.3", "FLAC", ...
    pub fn format_name(&self) -> String {
        match self {
            Tag::Id3v2(tag) => format!("ID3v2.{}", tag.version()),
            Tag::Flac(_) => "FLAC".to_string(),
        }
    }

    /// Common field behind an ID3v2 frame identifier or a Vorbis comment key
    pub fn field_for(&self, key: &str) -> Option<StandardField> {
        match self {
            Tag::Id3v2(_) => FieldMappings::from_id3v2(key),
            Tag::Flac(_) => FieldMappings::from_vorbis(key),
        }
    }

    pub fn get(&self, field: StandardField) -> String {
        match field {
            StandardField::Year => self.year(),
            StandardField::Genre => self.genre(),
            _ => match self {
                Tag::Id3v2(tag) => tag.get(field),
                Tag::Flac(tag) => tag.get(field),
            },
        }
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
        match self {
            Tag::Id3v2(tag) => tag.year(),
            Tag::Flac(tag) => tag.year(),
        }
    }

    pub fn track(&self) -> String {
        self.get(StandardField::Track)
    }

    pub fn genre(&self) -> String {
        match self {
            Tag::Id3v2(tag) => tag.genre(),
            Tag::Flac(tag) => tag.genre(),
        }
    }

    pub fn comment(&self) -> String {
        self.get(StandardField::Comment)
    }

    pub fn lyrics(&self) -> String {
        self.get(StandardField::Lyrics)
    }

    /// Embedded pictures in file order, empty when there are none
    pub fn images(&self) -> Vec<CoverArt> {
        match self {
            Tag::Id3v2(tag) => tag.pictures().into_iter().map(CoverArt::from).collect(),
            Tag::Flac(tag) => tag.pictures().iter().cloned().map(CoverArt::from).collect(),
        }
    }

    /// Duration known from the tag itself (FLAC STREAMINFO only)
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Tag::Id3v2(_) => None,
            Tag::Flac(tag) => Some(tag.duration_ms()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flac::metadata::tests::block;
    use crate::flac::metadata::FLAC_SIGNATURE;
    use crate::flac::streaminfo::tests::streaminfo_bytes;
    use crate::flac::vorbis::tests::vorbis_bytes;
    use crate::id3::v2::tests::build_tag;
    use std::io::Cursor;

    #[test]
    fn test_flac_frame_titles() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &streaminfo_bytes(0)));
        data.extend(block(4, true, &vorbis_bytes("v", &["TITLE=x"])));

        let tag = Tag::Flac(FlacTag::read(&mut Cursor::new(data)).unwrap());
        assert_eq!(tag.frame_titles(), vec!["STREAMINFO", "VORBIS_COMMENT"]);
        assert_eq!(tag.frames_data("STREAMINFO")[0].len(), 34);
        assert!(tag.frames_data("PICTURE").is_empty());
        assert_eq!(tag.title(), "x");
        assert_eq!(tag.format_name(), "FLAC");
    }

    #[test]
    fn test_id3_frames_data_keeps_duplicates() {
        let data = build_tag(
            3,
            0,
            &[("APIC", b"\x00image/png\x00\x03\x00A"), ("APIC", b"\x00image/png\x00\x04\x00B")],
            0,
        );
        let tag = Tag::Id3v2(Id3v2Tag::read(&mut Cursor::new(data)).unwrap());
        assert_eq!(tag.frame_titles(), vec!["APIC"]);
        assert_eq!(tag.frames_data("APIC").len(), 2);
        assert_eq!(tag.format_name(), "ID3v2.3");

        let images = tag.images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].data, b"B");
        assert_eq!(images[1].picture_type, "Cover (back)");
        assert_eq!(tag.title(), "");
        assert_eq!(tag.duration_ms(), None);
    }

    #[test]
    fn test_field_for_follows_tag_format() {
        let data = build_tag(3, 0, &[("TIT2", b"\x00x")], 0);
        let tag = Tag::Id3v2(Id3v2Tag::read(&mut Cursor::new(data)).unwrap());
        assert_eq!(tag.field_for("TIT2"), Some(StandardField::Title));
        assert_eq!(tag.field_for("TYER"), Some(StandardField::Year));
        assert_eq!(tag.field_for("TITLE"), None);

        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &streaminfo_bytes(0)));
        data.extend(block(4, true, &vorbis_bytes("v", &["tracknumber=3"])));
        let tag = Tag::Flac(FlacTag::read(&mut Cursor::new(data)).unwrap());
        assert_eq!(tag.field_for("tracknumber"), Some(StandardField::Track));
        assert_eq!(tag.field_for("DESCRIPTION"), Some(StandardField::Comment));
        assert_eq!(tag.field_for("TIT2"), None);
        assert_eq!(tag.field_for("STREAMINFO"), None);
    }
}
