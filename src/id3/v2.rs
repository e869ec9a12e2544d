// ID3v2 tag extraction and stream resynchronization

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, TagError};
use crate::mpeg::header::is_frame_sync;
use crate::utils::io::{be_u24, read_synchsafe_u32, read_up_to, stream_len, synchsafe_decode};

use super::frames::frame_ids;

const HEADER_SIZE: u64 = 10;
const FOOTER_SIZE: u64 = 10;
const ID: [u8; 3] = *b"ID3";
const RIFF: [u8; 4] = *b"RIFF";

/// How far past a RIFF marker resync looks for audio
const RIFF_SCAN_LIMIT: usize = 4096;
/// Back-to-back tags skipped before giving up on finding audio
const MAX_CHAINED_TAGS: usize = 64;

/// ID3v2 header: version, flags byte and the syncsafe tag size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3v2Header {
    version: u8,
    flags: u8,
    size: u32,
}

impl Id3v2Header {
    pub fn new(version: u8, flags: u8, size: u32) -> Self {
        Id3v2Header {
            version,
            flags,
            size,
        }
    }

    /// Major version: 2, 3 or 4
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Size of the tag body, excluding header and footer
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn unsynchronisation(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// v2.3 and later; in v2.2 the same bit means compression
    pub fn extended_header(&self) -> bool {
        self.version >= 3 && self.flags & 0x40 != 0
    }

    pub fn compression(&self) -> bool {
        self.version == 2 && self.flags & 0x40 != 0
    }

    pub fn experimental(&self) -> bool {
        self.version >= 3 && self.flags & 0x20 != 0
    }

    pub fn has_footer(&self) -> bool {
        self.version == 4 && self.flags & 0x10 != 0
    }

    /// Bytes occupied on disk by the whole tag
    pub fn total_len(&self) -> u64 {
        let footer = if self.has_footer() { FOOTER_SIZE } else { 0 };
        HEADER_SIZE + u64::from(self.size) + footer
    }

    fn frame_header_len(&self) -> u64 {
        if self.version == 2 {
            6
        } else {
            10
        }
    }
}

/// One raw frame as stored in the tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3Frame {
    pub id: String,
    pub size: u32,
    /// Always zero for v2.2, which has no frame flags
    pub flags: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unchecked,
    HeaderRead,
    FramesWalked,
    Done,
    Failed,
}

/// Progress of one extraction; remembers the header so the stream can be
/// resynchronized whatever the outcome.
struct Extraction {
    state: State,
    start: u64,
    header: Option<Id3v2Header>,
}

impl Extraction {
    fn new(start: u64) -> Self {
        Extraction {
            state: State::Unchecked,
            start,
            header: None,
        }
    }

    fn advance(&mut self, next: State) {
        log::trace!("ID3v2 extraction: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run<R: Read + Seek>(
        &mut self,
        reader: &mut R,
    ) -> Result<(Id3v2Header, BTreeMap<String, Vec<Id3Frame>>)> {
        let file_len = stream_len(reader)?;

        let mut marker = [0u8; 5];
        let got = read_up_to(reader, &mut marker)?;
        let version = check_file(&marker[..got])?;

        let header = read_flags_and_size(reader, version).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TagError::InvalidTag("truncated tag header"),
            _ => TagError::Io(e),
        })?;
        self.header = Some(header);
        self.advance(State::HeaderRead);

        if header.has_footer() {
            return Err(TagError::NotImplemented("ID3v2.4 footer"));
        }
        if header.compression() {
            return Err(TagError::NotImplemented("ID3v2.2 compression"));
        }
        if header.unsynchronisation() {
            log::debug!("ID3v2 unsynchronisation flag set, not applied");
        }
        if header.extended_header() {
            log::debug!("ID3v2 extended header flag set, not applied");
        }

        let frames = walk_frames(reader, &header, file_len)?;
        self.advance(State::FramesWalked);
        Ok((header, frames))
    }

    /// Where the next look for audio starts
    fn resume_position(&self) -> u64 {
        match self.header {
            Some(header) => self.start + header.total_len(),
            None => self.start,
        }
    }
}

/// Classify the first five bytes of the stream, returning the major version
fn check_file(marker: &[u8]) -> Result<u8> {
    let lead = marker.iter().position(|&b| b != 0);
    let looks_like_audio = match lead {
        None => true,
        Some(i) => match marker.get(i + 1) {
            Some(&next) => is_frame_sync(marker[i], next),
            None => marker[i] == 0xFF,
        },
    };
    if looks_like_audio {
        return Err(TagError::NoTag);
    }
    if marker.len() < 3 || marker[..3] != ID {
        return Err(TagError::UnknownTag);
    }
    if marker.len() < 5 {
        return Err(TagError::InvalidTag("truncated tag header"));
    }

    let (version, revision) = (marker[3], marker[4]);
    if !(2..=4).contains(&version) || revision != 0 {
        return Err(TagError::UnknownTagVersion(version));
    }
    Ok(version)
}

/// Flags byte and syncsafe tag size, following the version bytes
fn read_flags_and_size<R: Read>(reader: &mut R, version: u8) -> std::io::Result<Id3v2Header> {
    let mut flags = [0u8; 1];
    reader.read_exact(&mut flags)?;
    let size = read_synchsafe_u32(reader)?;
    Ok(Id3v2Header::new(version, flags[0], size))
}

fn walk_frames<R: Read + Seek>(
    reader: &mut R,
    header: &Id3v2Header,
    file_len: u64,
) -> Result<BTreeMap<String, Vec<Id3Frame>>> {
    let mut frames: BTreeMap<String, Vec<Id3Frame>> = BTreeMap::new();
    let tag_size = u64::from(header.size());
    let header_len = header.frame_header_len();
    let mut consumed = 0u64;

    while consumed + header_len <= tag_size {
        let mut raw = [0u8; 10];
        let raw = &mut raw[..header_len as usize];
        if read_up_to(reader, raw)? < raw.len() {
            log::warn!("ID3v2 frame header cut off by end of file");
            break;
        }
        if raw[0] == 0 {
            log::trace!("ID3v2 padding at tag offset {}", consumed);
            break;
        }

        let (id, size, flags) = match header.version() {
            2 => (&raw[..3], be_u24([raw[3], raw[4], raw[5]]), 0),
            3 => (
                &raw[..4],
                u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
                u16::from_be_bytes([raw[8], raw[9]]),
            ),
            _ => (
                &raw[..4],
                synchsafe_decode([raw[4], raw[5], raw[6], raw[7]]),
                u16::from_be_bytes([raw[8], raw[9]]),
            ),
        };

        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            log::warn!("ID3v2 frame with invalid identifier {:?}, stopping", id);
            break;
        }
        let id = String::from_utf8_lossy(id).into_owned();
        if size == 0 {
            log::trace!("ID3v2 zero-size frame {}, stopping", id);
            break;
        }
        if header.version() == 4 && id == frame_ids::SEEK {
            return Err(TagError::NotImplemented("ID3v2.4 SEEK frame"));
        }

        let position = reader.stream_position()?;
        if position + u64::from(size) > file_len {
            log::warn!(
                "ID3v2 frame {} claims {} bytes, only {} left in file",
                id,
                size,
                file_len.saturating_sub(position)
            );
            break;
        }
        consumed += header_len + u64::from(size);
        if consumed > tag_size {
            return Err(TagError::InvalidTag("frame exceeds declared tag size"));
        }

        let mut data = vec![0u8; size as usize];
        reader.read_exact(&mut data)?;
        log::trace!("ID3v2 frame {} ({} bytes)", id, size);
        frames.entry(id.clone()).or_default().push(Id3Frame {
            id,
            size,
            flags,
            data,
        });
    }

    Ok(frames)
}

/// Position `reader` at the best-effort start of audio data.
///
/// Starts at `from`, skips zero padding, then follows chained ID3 tags and
/// RIFF headers until an MPEG sync word or something unrecognized is hit.
pub fn resync<R: Read + Seek>(reader: &mut R, from: u64) -> std::io::Result<u64> {
    let mut pos = from;
    for _ in 0..MAX_CHAINED_TAGS {
        reader.seek(SeekFrom::Start(pos))?;
        pos = skip_zero_padding(reader)?;

        let mut head = [0u8; 10];
        let got = read_up_to(reader, &mut head)?;

        if got >= 2 && is_frame_sync(head[0], head[1]) {
            log::debug!("Audio sync found at {}", pos);
            return reader.seek(SeekFrom::Start(pos));
        }
        if got == 10 && head[..3] == ID {
            let chained = Id3v2Header::new(
                head[3],
                head[5],
                synchsafe_decode([head[6], head[7], head[8], head[9]]),
            );
            log::debug!(
                "Skipping chained ID3v2 tag at {} ({} bytes)",
                pos,
                chained.total_len()
            );
            pos += chained.total_len();
            continue;
        }
        if got >= 4 && head[..4] == RIFF {
            let after_marker = pos + RIFF.len() as u64;
            reader.seek(SeekFrom::Start(after_marker))?;
            let mut window = vec![0u8; RIFF_SCAN_LIMIT];
            let filled = read_up_to(reader, &mut window)?;
            let found = window[..filled]
                .windows(2)
                .position(|pair| is_frame_sync(pair[0], pair[1]));
            return match found {
                Some(offset) => {
                    log::debug!("Audio sync found inside RIFF at {}", after_marker + offset as u64);
                    reader.seek(SeekFrom::Start(after_marker + offset as u64))
                }
                None => {
                    log::debug!("No audio sync within {} bytes of RIFF marker", RIFF_SCAN_LIMIT);
                    reader.seek(SeekFrom::Start(after_marker))
                }
            };
        }

        log::debug!("No audio sync at {}, leaving stream there", pos);
        return reader.seek(SeekFrom::Start(pos));
    }

    log::warn!("Gave up after {} chained ID3v2 tags", MAX_CHAINED_TAGS);
    reader.seek(SeekFrom::Start(pos))
}

/// Advance past zero bytes, returning the position of the first non-zero
/// byte (or the end of the stream)
fn skip_zero_padding<R: Read + Seek>(reader: &mut R) -> std::io::Result<u64> {
    let mut pos = reader.stream_position()?;
    let mut chunk = [0u8; 4096];
    loop {
        let got = read_up_to(reader, &mut chunk)?;
        match chunk[..got].iter().position(|&b| b != 0) {
            Some(i) => return Ok(pos + i as u64),
            None if got < chunk.len() => return Ok(pos + got as u64),
            None => pos += got as u64,
        }
    }
}

/// Frames of one ID3v2 tag, grouped by identifier in file order
#[derive(Debug, Clone)]
pub struct Id3v2Extractor {
    header: Id3v2Header,
    frames: BTreeMap<String, Vec<Id3Frame>>,
}

impl Id3v2Extractor {
    /// Extract the tag at the reader's current position.
    ///
    /// Whether this succeeds or fails, the reader is left at the start of
    /// audio data (see [`resync`]). `NoTag` and `UnknownTag` are the normal
    /// outcome for files without a tag.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;
        let mut extraction = Extraction::new(start);
        let outcome = extraction.run(reader);

        match &outcome {
            Ok(_) => extraction.advance(State::Done),
            Err(e) => {
                extraction.advance(State::Failed);
                if e.is_recoverable() {
                    log::debug!("No ID3v2 tag: {}", e);
                } else {
                    log::warn!("ID3v2 extraction failed: {}", e);
                }
            }
        }

        let resynced = resync(reader, extraction.resume_position());
        let (header, frames) = outcome?;
        resynced?;
        Ok(Id3v2Extractor { header, frames })
    }

    pub fn header(&self) -> &Id3v2Header {
        &self.header
    }

    pub fn version(&self) -> u8 {
        self.header.version()
    }

    /// Frames sharing `id`, in file order
    pub fn frames(&self, id: &str) -> &[Id3Frame] {
        self.frames.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, id: &str) -> Option<&Id3Frame> {
        self.frames(id).first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Id3Frame> {
        self.frames.values().flatten()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::io::synchsafe_encode;
    use std::io::Cursor;

    /// MPEG-1 Layer III, 128 kbps, 44.1 kHz, no padding
    pub(crate) const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    pub(crate) fn build_frame(version: u8, id: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = id.as_bytes().to_vec();
        match version {
            2 => out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]),
            3 => {
                out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                out.extend_from_slice(&[0, 0]);
            }
            _ => {
                out.extend_from_slice(&synchsafe_encode(payload.len() as u32).unwrap());
                out.extend_from_slice(&[0, 0]);
            }
        }
        out.extend_from_slice(payload);
        out
    }

    pub(crate) fn build_tag(version: u8, flags: u8, frames: &[(&str, &[u8])], padding: usize) -> Vec<u8> {
        let mut body = Vec::new();
        for (id, payload) in frames {
            body.extend(build_frame(version, id, payload));
        }
        body.extend(std::iter::repeat(0).take(padding));

        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[version, 0, flags]);
        out.extend_from_slice(&synchsafe_encode(body.len() as u32).unwrap());
        out.extend(body);
        out
    }

    #[test]
    fn test_v3_frames_and_resync() {
        let mut data = build_tag(
            3,
            0,
            &[("TIT2", b"\x00Title"), ("COMM", b"\x00engx\x00a"), ("COMM", b"\x00engy\x00b")],
            32,
        );
        let audio_start = data.len() as u64;
        data.extend_from_slice(&MP3_FRAME_HEADER);

        let mut reader = Cursor::new(data);
        let tag = Id3v2Extractor::read(&mut reader).unwrap();
        assert_eq!(tag.version(), 3);
        assert_eq!(tag.ids().collect::<Vec<_>>(), vec!["COMM", "TIT2"]);
        let comments = tag.frames("COMM");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].data, b"\x00engx\x00a");
        assert_eq!(comments[1].data, b"\x00engy\x00b");
        assert_eq!(reader.position(), audio_start);
    }

    #[test]
    fn test_v2_three_byte_ids() {
        let data = build_tag(2, 0, &[("TAL", b"\x00Album"), ("TT2", b"\x00Song")], 0);
        let tag = Id3v2Extractor::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.first("TAL").unwrap().data, b"\x00Album");
        assert_eq!(tag.first("TAL").unwrap().size, 6);
        assert_eq!(tag.first("TT2").unwrap().flags, 0);
    }

    #[test]
    fn test_v4_syncsafe_frame_size() {
        let payload = vec![0x41u8; 200];
        let data = build_tag(4, 0, &[("APIC", &payload)], 0);
        let tag = Id3v2Extractor::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.first("APIC").unwrap().size, 200);
    }

    #[test]
    fn test_zero_padding_then_sync_is_no_tag() {
        let mut data = vec![0u8; 37];
        data.extend_from_slice(&MP3_FRAME_HEADER);
        let mut reader = Cursor::new(data);
        assert!(matches!(Id3v2Extractor::read(&mut reader), Err(TagError::NoTag)));
        assert_eq!(reader.position(), 37);
    }

    #[test]
    fn test_short_padding_then_sync_is_no_tag() {
        let mut data = vec![0u8; 2];
        data.extend_from_slice(&MP3_FRAME_HEADER);
        let mut reader = Cursor::new(data);
        assert!(matches!(Id3v2Extractor::read(&mut reader), Err(TagError::NoTag)));
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_foreign_bytes_are_unknown_tag() {
        let mut reader = Cursor::new(b"OggS\x00\x02rest".to_vec());
        assert!(matches!(Id3v2Extractor::read(&mut reader), Err(TagError::UnknownTag)));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_unknown_version() {
        let mut data = build_tag(3, 0, &[], 4);
        data[3] = 5;
        assert!(matches!(
            Id3v2Extractor::read(&mut Cursor::new(data)),
            Err(TagError::UnknownTagVersion(5))
        ));
    }

    #[test]
    fn test_header_size_is_syncsafe() {
        let data = build_tag(3, 0, &[("TIT2", &[0x00; 200])], 0);
        assert_eq!(&data[6..10], &[0x00, 0x00, 0x01, 0x52]);
        let tag = Id3v2Extractor::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.header().size(), 210);
    }

    #[test]
    fn test_truncated_size_is_invalid() {
        let mut reader = Cursor::new(b"ID3\x03\x00\x00\x00\x01".to_vec());
        assert!(matches!(
            Id3v2Extractor::read(&mut reader),
            Err(TagError::InvalidTag("truncated tag header"))
        ));
    }

    #[test]
    fn test_footer_not_implemented_but_resynced() {
        let mut data = build_tag(4, 0x10, &[("TIT2", b"\x00x")], 0);
        data.extend_from_slice(b"3DI\x04\x00\x10\x00\x00\x00\x0c");
        let audio_start = data.len() as u64;
        data.extend_from_slice(&MP3_FRAME_HEADER);

        let mut reader = Cursor::new(data);
        assert!(matches!(
            Id3v2Extractor::read(&mut reader),
            Err(TagError::NotImplemented(_))
        ));
        assert_eq!(reader.position(), audio_start);
    }

    #[test]
    fn test_seek_frame_not_implemented() {
        let data = build_tag(4, 0, &[("SEEK", &[0, 0, 0, 1])], 0);
        assert!(matches!(
            Id3v2Extractor::read(&mut Cursor::new(data)),
            Err(TagError::NotImplemented("ID3v2.4 SEEK frame"))
        ));
    }

    #[test]
    fn test_frame_past_end_of_file_ends_walk() {
        let mut data = build_tag(3, 0, &[("TIT2", b"\x00Title")], 0);
        // Claim a 4 KiB frame with only a handful of bytes behind it
        let bogus = build_frame(3, "TALB", &[0u8; 4096]);
        let size = (data.len() - 10 + bogus.len()) as u32;
        data[6..10].copy_from_slice(&synchsafe_encode(size).unwrap());
        data.extend_from_slice(&bogus[..16]);

        let tag = Id3v2Extractor::read(&mut Cursor::new(data)).unwrap();
        assert_eq!(tag.ids().collect::<Vec<_>>(), vec!["TIT2"]);
    }

    #[test]
    fn test_frame_past_tag_size_is_invalid() {
        let mut data = build_tag(3, 0, &[("TIT2", b"\x00Title")], 0);
        data.extend_from_slice(&[0u8; 64]);
        // Frame claims 64 bytes more than the declared tag holds
        data[17] += 64;
        assert!(matches!(
            Id3v2Extractor::read(&mut Cursor::new(data)),
            Err(TagError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_chained_tags_are_skipped() {
        let mut data = build_tag(3, 0, &[("TIT2", b"\x00First")], 8);
        data.extend(build_tag(4, 0, &[("TIT2", b"\x00Second")], 0));
        let audio_start = data.len() as u64;
        data.extend_from_slice(&MP3_FRAME_HEADER);

        let mut reader = Cursor::new(data);
        let tag = Id3v2Extractor::read(&mut reader).unwrap();
        assert_eq!(tag.first("TIT2").unwrap().data, b"\x00First");
        assert_eq!(reader.position(), audio_start);
    }

    #[test]
    fn test_riff_scan() {
        let mut data = build_tag(3, 0, &[("TIT2", b"\x00x")], 0);
        let riff = data.len() as u64;
        data.extend_from_slice(b"RIFF\x24\x00\x00\x00WAVEfmt ");
        let audio_start = data.len() as u64;
        data.extend_from_slice(&MP3_FRAME_HEADER);

        let mut reader = Cursor::new(data.clone());
        Id3v2Extractor::read(&mut reader).unwrap();
        assert_eq!(reader.position(), audio_start);

        // No sync behind the marker: stay just after it
        data.truncate(audio_start as usize);
        let mut reader = Cursor::new(data);
        Id3v2Extractor::read(&mut reader).unwrap();
        assert_eq!(reader.position(), riff + 4);
    }

    #[test]
    fn test_header_flags() {
        let header = Id3v2Header::new(4, 0xF0, 100);
        assert!(header.unsynchronisation());
        assert!(header.extended_header());
        assert!(header.experimental());
        assert!(header.has_footer());
        assert_eq!(header.total_len(), 120);

        let v2 = Id3v2Header::new(2, 0x40, 100);
        assert!(!v2.extended_header());
        assert!(v2.compression());
        assert!(!v2.has_footer());
    }
}
