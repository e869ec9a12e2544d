// FLAC tag facade

use std::io::{Read, Seek};

use super::metadata::{BlockType, FlacExtractor};
use super::picture::FlacPicture;
use super::streaminfo::StreamInfo;
use super::vorbis::VorbisComment;
use crate::error::{Result, TagError};
use crate::field_mapping::{FieldMappings, StandardField, ValueConverter};

/// Decoded view of a FLAC stream's metadata blocks
#[derive(Debug, Clone)]
pub struct FlacTag {
    extractor: FlacExtractor,
    stream_info: StreamInfo,
    vorbis: VorbisComment,
    pictures: Vec<FlacPicture>,
}

impl FlacTag {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        FlacExtractor::read(reader).and_then(Self::new)
    }

    /// Decode STREAMINFO, the first VORBIS_COMMENT and every PICTURE block.
    ///
    /// A broken STREAMINFO is fatal; broken comment or picture blocks are
    /// skipped.
    pub fn new(extractor: FlacExtractor) -> Result<Self> {
        let stream_info = extractor
            .blocks(BlockType::StreamInfo)
            .first()
            .ok_or(TagError::InvalidTag("missing STREAMINFO"))
            .and_then(|block| StreamInfo::parse(&block.data))?;

        let vorbis = match extractor.blocks(BlockType::VorbisComment).first() {
            Some(block) => VorbisComment::read(&block.data).unwrap_or_else(|e| {
                log::warn!("Unreadable VORBIS_COMMENT block: {}", e);
                VorbisComment::default()
            }),
            None => VorbisComment::default(),
        };

        let pictures = extractor
            .blocks(BlockType::Picture)
            .iter()
            .filter_map(|block| match FlacPicture::read(&block.data) {
                Ok(picture) => Some(picture),
                Err(e) => {
                    log::warn!("Unreadable PICTURE block: {}", e);
                    None
                }
            })
            .collect();

        Ok(FlacTag {
            extractor,
            stream_info,
            vorbis,
            pictures,
        })
    }

    pub fn extractor(&self) -> &FlacExtractor {
        &self.extractor
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    pub fn vorbis_comment(&self) -> &VorbisComment {
        &self.vorbis
    }

    pub fn pictures(&self) -> &[FlacPicture] {
        &self.pictures
    }

    pub fn duration_ms(&self) -> u64 {
        self.stream_info.duration_ms()
    }

    /// Standard field from the Vorbis comments, empty when absent
    pub fn get(&self, field: StandardField) -> String {
        self.vorbis
            .get(FieldMappings::to_vorbis(field))
            .unwrap_or_default()
            .to_string()
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
        self.get(StandardField::Genre)
    }

    pub fn comment(&self) -> String {
        self.get(StandardField::Comment)
    }

    pub fn lyrics(&self) -> String {
        self.get(StandardField::Lyrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flac::metadata::tests::block;
    use crate::flac::metadata::FLAC_SIGNATURE;
    use crate::flac::picture::tests::picture_bytes;
    use crate::flac::streaminfo::tests::streaminfo_bytes;
    use crate::flac::vorbis::tests::vorbis_bytes;
    use std::io::Cursor;

    #[test]
    fn test_full_tag() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &streaminfo_bytes(44100 * 185)));
        data.extend(block(
            4,
            false,
            &vorbis_bytes("libFLAC", &["TITLE=Song", "Artist=Someone", "DATE=1999-12-31"]),
        ));
        data.extend(block(6, true, &picture_bytes("image/png", "", &[1, 2, 3])));

        let tag = FlacTag::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.title(), "Song");
        assert_eq!(tag.artist(), "Someone");
        assert_eq!(tag.year(), "1999");
        assert_eq!(tag.album(), "");
        assert_eq!(tag.duration_ms(), 185_000);
        assert_eq!(tag.stream_info().channels, 2);
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_broken_comment_block_is_skipped() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &streaminfo_bytes(0)));
        data.extend(block(4, true, &[0xFF, 0xFF, 0xFF, 0x7F]));

        let tag = FlacTag::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.title(), "");
        assert_eq!(tag.duration_ms(), 0);
    }

    #[test]
    fn test_short_streaminfo_is_invalid() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, true, &[0u8; 10]));
        assert!(matches!(
            FlacTag::read(&mut Cursor::new(data)),
            Err(TagError::InvalidTag(_))
        ));
    }
}
