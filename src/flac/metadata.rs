// FLAC metadata block walking

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::error::{Result, TagError};
use crate::utils::io::{be_u24, read_up_to, stream_len};

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockType {
    StreamInfo = 0,
    Padding = 1,
    Application = 2,
    SeekTable = 3,
    VorbisComment = 4,
    CueSheet = 5,
    Picture = 6,
}

impl BlockType {
    /// `None` for the reserved (7..=126) and invalid (127) codes
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BlockType::StreamInfo),
            1 => Some(BlockType::Padding),
            2 => Some(BlockType::Application),
            3 => Some(BlockType::SeekTable),
            4 => Some(BlockType::VorbisComment),
            5 => Some(BlockType::CueSheet),
            6 => Some(BlockType::Picture),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockType::StreamInfo => "STREAMINFO",
            BlockType::Padding => "PADDING",
            BlockType::Application => "APPLICATION",
            BlockType::SeekTable => "SEEKTABLE",
            BlockType::VorbisComment => "VORBIS_COMMENT",
            BlockType::CueSheet => "CUESHEET",
            BlockType::Picture => "PICTURE",
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    pub length: u32,
}

impl BlockHeader {
    pub const LEN: usize = 4;

    pub fn parse(bytes: [u8; 4]) -> Result<Self> {
        let block_type = BlockType::from_byte(bytes[0] & 0x7F)
            .ok_or(TagError::InvalidTag("reserved FLAC block type"))?;
        Ok(BlockHeader {
            is_last: bytes[0] & 0x80 != 0,
            block_type,
            length: be_u24([bytes[1], bytes[2], bytes[3]]),
        })
    }
}

/// One metadata block with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacBlock {
    pub header: BlockHeader,
    pub data: Vec<u8>,
}

/// Every metadata block of a FLAC stream, grouped by type name in file order
#[derive(Debug, Clone)]
pub struct FlacExtractor {
    blocks: BTreeMap<&'static str, Vec<FlacBlock>>,
}

impl FlacExtractor {
    /// Validate the marker and walk blocks until the last-block flag.
    ///
    /// On success the reader sits at the first audio frame.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file_len = stream_len(reader)?;

        let mut marker = [0u8; 4];
        if read_up_to(reader, &mut marker)? < marker.len() || &marker != FLAC_SIGNATURE {
            return Err(TagError::InvalidTag("missing fLaC marker"));
        }

        let mut blocks: BTreeMap<&'static str, Vec<FlacBlock>> = BTreeMap::new();
        let mut first = true;
        loop {
            let mut raw = [0u8; BlockHeader::LEN];
            if read_up_to(reader, &mut raw)? < raw.len() {
                if first {
                    return Err(TagError::InvalidTag("missing STREAMINFO"));
                }
                log::warn!("FLAC metadata ends without a last-block flag");
                break;
            }
            let header = BlockHeader::parse(raw)?;
            if first && header.block_type != BlockType::StreamInfo {
                return Err(TagError::InvalidTag("first block is not STREAMINFO"));
            }

            let position = reader.stream_position()?;
            if position + u64::from(header.length) > file_len {
                if first {
                    return Err(TagError::InvalidTag("truncated STREAMINFO"));
                }
                log::warn!(
                    "FLAC {} block claims {} bytes, only {} left in file",
                    header.block_type.name(),
                    header.length,
                    file_len.saturating_sub(position)
                );
                break;
            }

            let mut data = vec![0u8; header.length as usize];
            reader.read_exact(&mut data)?;
            log::trace!(
                "FLAC block {} ({} bytes, last: {})",
                header.block_type.name(),
                header.length,
                header.is_last
            );
            blocks
                .entry(header.block_type.name())
                .or_default()
                .push(FlacBlock { header, data });

            first = false;
            if header.is_last {
                break;
            }
        }

        Ok(FlacExtractor { blocks })
    }

    /// Blocks of one type, in file order
    pub fn blocks(&self, block_type: BlockType) -> &[FlacBlock] {
        self.blocks_named(block_type.name())
    }

    pub fn blocks_named(&self, name: &str) -> &[FlacBlock] {
        self.blocks.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.blocks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlacBlock> {
        self.blocks.values().flatten()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn block(block_type: u8, is_last: bool, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![block_type | if is_last { 0x80 } else { 0 }];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_walk_until_last_block() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &[0u8; 34]));
        data.extend(block(1, false, &[0u8; 16]));
        data.extend(block(1, true, &[0u8; 8]));
        let audio_start = data.len() as u64;
        data.extend_from_slice(&[0xFF, 0xF8, 0x69, 0x08]);

        let mut reader = Cursor::new(data);
        let flac = FlacExtractor::read(&mut reader).unwrap();
        assert_eq!(flac.names().collect::<Vec<_>>(), vec!["PADDING", "STREAMINFO"]);
        assert_eq!(flac.blocks(BlockType::Padding).len(), 2);
        assert_eq!(flac.blocks(BlockType::Padding)[1].data.len(), 8);
        assert!(flac.blocks(BlockType::Picture).is_empty());
        assert_eq!(reader.position(), audio_start);
    }

    #[test]
    fn test_missing_marker() {
        assert!(matches!(
            FlacExtractor::read(&mut Cursor::new(b"ID3\x03\x00".to_vec())),
            Err(TagError::InvalidTag("missing fLaC marker"))
        ));
    }

    #[test]
    fn test_first_block_must_be_streaminfo() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(4, true, &[0u8; 8]));
        assert!(matches!(
            FlacExtractor::read(&mut Cursor::new(data)),
            Err(TagError::InvalidTag("first block is not STREAMINFO"))
        ));
    }

    #[test]
    fn test_reserved_block_type() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &[0u8; 34]));
        data.extend(block(127, true, &[]));
        assert!(matches!(
            FlacExtractor::read(&mut Cursor::new(data)),
            Err(TagError::InvalidTag("reserved FLAC block type"))
        ));
    }

    #[test]
    fn test_oversized_block_ends_walk() {
        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend(block(0, false, &[0u8; 34]));
        data.extend_from_slice(&[0x84, 0x00, 0x10, 0x00, b'x']);
        let flac = FlacExtractor::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(flac.names().collect::<Vec<_>>(), vec!["STREAMINFO"]);

        let mut data = FLAC_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 0x22, 0x00]);
        assert!(matches!(
            FlacExtractor::read(&mut Cursor::new(data)),
            Err(TagError::InvalidTag("truncated STREAMINFO"))
        ));
    }
}
