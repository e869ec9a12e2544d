// Stream properties and duration from MPEG frame headers

use std::io::{Read, Seek, SeekFrom};

use super::header::{is_frame_sync, FrameHeader, Layer, MpegVersion};
use crate::error::MpegError;
use crate::utils::io::{read_up_to, stream_len};

/// Frame ceiling for a VBR walk; about 30 hours of MPEG-1 Layer III audio
pub const DEFAULT_MAX_VBR_FRAMES: u64 = 1 << 22;

const XING: [u8; 4] = *b"Xing";

/// Audio properties of an MPEG stream
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MpegProperties {
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u8,
    /// kbps; the average over all frames for VBR streams
    pub bitrate: u32,
    pub vbr: bool,
    pub version: MpegVersion,
    pub layer: Layer,
    /// Frames counted (VBR) or estimated from the stream length (CBR)
    pub frames: u64,
}

fn read_frame_header<R: Read>(reader: &mut R) -> Result<FrameHeader, MpegError> {
    let mut bytes = [0u8; FrameHeader::LEN];
    reader.read_exact(&mut bytes)?;
    FrameHeader::parse(bytes)
}

/// Read stream properties starting at the reader's current position, which
/// must be the first audio frame (as left by the ID3v2 resync).
///
/// CBR streams are measured from the first frame alone: the frame count is
/// the byte span from that frame to the end of the stream divided by its
/// length, so a leading ID3v2 tag is not counted as audio. Streams carrying
/// a Xing header are walked frame by frame, stopping at the end of the
/// stream, at the first bad header, or after `max_vbr_frames` frames.
pub fn read_properties<R: Read + Seek>(
    reader: &mut R,
    max_vbr_frames: Option<u64>,
) -> Result<MpegProperties, MpegError> {
    let start = reader.stream_position()?;
    let file_len = stream_len(reader)?;

    let mut sync = [0u8; FrameHeader::LEN];
    if read_up_to(reader, &mut sync)? < sync.len() || !is_frame_sync(sync[0], sync[1]) {
        return Err(MpegError::NoFrame);
    }
    let first = FrameHeader::parse(sync)?;
    log::trace!("First MPEG frame at {}: {:?}", start, first);

    if has_xing_marker(reader, start, &first)? {
        log::debug!("Xing header found, walking every frame");
        walk_vbr(reader, start, first, max_vbr_frames)
    } else {
        let frames = (file_len - start) / u64::from(first.frame_len());
        Ok(MpegProperties {
            duration_ms: (first.duration_ms() * frames as f64).round() as u64,
            sample_rate: first.sample_rate,
            channels: first.channels(),
            bitrate: first.bitrate,
            vbr: false,
            version: first.version,
            layer: first.layer,
            frames,
        })
    }
}

fn has_xing_marker<R: Read + Seek>(
    reader: &mut R,
    frame_start: u64,
    header: &FrameHeader,
) -> Result<bool, MpegError> {
    reader.seek(SeekFrom::Start(frame_start + header.xing_offset() as u64))?;
    let mut marker = [0u8; 4];
    let got = read_up_to(reader, &mut marker)?;
    reader.seek(SeekFrom::Start(frame_start))?;
    Ok(got == marker.len() && marker == XING)
}

fn walk_vbr<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    first: FrameHeader,
    max_frames: Option<u64>,
) -> Result<MpegProperties, MpegError> {
    let mut position = start;
    let mut duration_ms = 0f64;
    let mut frames = 0u64;
    let mut bitrate_sum = 0u64;

    loop {
        if max_frames.is_some_and(|max| frames >= max) {
            log::warn!("VBR walk stopped after {} frames", frames);
            break;
        }

        reader.seek(SeekFrom::Start(position))?;
        let header = match read_frame_header(reader) {
            Ok(header) => header,
            Err(MpegError::Eof) => break,
            Err(MpegError::Io(e)) => return Err(MpegError::Io(e)),
            Err(e) => {
                log::debug!("VBR walk ends at {}: {}", position, e);
                break;
            }
        };

        duration_ms += header.duration_ms();
        bitrate_sum += u64::from(header.bitrate);
        frames += 1;
        position += u64::from(header.frame_len());
    }

    let bitrate = if frames > 0 {
        (bitrate_sum / frames) as u32
    } else {
        first.bitrate
    };

    Ok(MpegProperties {
        duration_ms: duration_ms.round() as u64,
        sample_rate: first.sample_rate,
        channels: first.channels(),
        bitrate,
        vbr: true,
        version: first.version,
        layer: first.layer,
        frames,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// One MPEG-1 Layer III 44.1 kHz stereo frame of `bitrate_bits` (index)
    pub(crate) fn frame(bitrate_bits: u8) -> Vec<u8> {
        let bytes = [0xFF, 0xFB, bitrate_bits << 4, 0x00];
        let len = FrameHeader::parse(bytes).unwrap().frame_len() as usize;
        let mut out = vec![0u8; len];
        out[..4].copy_from_slice(&bytes);
        out
    }

    fn xing_frame() -> Vec<u8> {
        let mut out = frame(0b1001);
        out[36..40].copy_from_slice(b"Xing");
        out
    }

    #[test]
    fn test_cbr_duration() {
        let data: Vec<u8> = (0..100).flat_map(|_| frame(0b1001)).collect();
        let size = data.len() as u64;
        let props = read_properties(&mut Cursor::new(data), None).unwrap();

        let expected = 1152.0 / 44100.0 * 1000.0 * (size / 417) as f64;
        assert!(!props.vbr);
        assert_eq!(props.frames, 100);
        assert_eq!(props.bitrate, 128);
        assert_eq!(props.sample_rate, 44100);
        assert_eq!(props.channels, 2);
        assert!((props.duration_ms as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_cbr_measures_from_first_frame() {
        let mut data = vec![0x55u8; 1000];
        data.extend((0..10).flat_map(|_| frame(0b1001)));
        let mut reader = Cursor::new(data);
        reader.set_position(1000);
        let props = read_properties(&mut reader, None).unwrap();
        assert_eq!(props.frames, 10);
        assert_eq!(props.duration_ms, 261);
    }

    #[test]
    fn test_vbr_walk() {
        let mut data = xing_frame();
        for bits in [0b0101, 0b0101, 0b0101, 0b1001, 0b1001] {
            data.extend(frame(bits));
        }
        data.extend_from_slice(b"TAGtrailing garbage");

        let props = read_properties(&mut Cursor::new(data), None).unwrap();
        assert!(props.vbr);
        assert_eq!(props.frames, 6);
        assert_eq!(props.bitrate, 96);
        assert_eq!(props.duration_ms, 157);
    }

    #[test]
    fn test_vbr_walk_mpeg2() {
        // MPEG-2 Layer III, 64 kbps, 22.05 kHz, stereo: 208 bytes, 576 samples
        let header = [0xFF, 0xF3, 0x80, 0x00];
        let parsed = FrameHeader::parse(header).unwrap();
        assert_eq!(parsed.bitrate, 64);
        assert_eq!(parsed.frame_len(), 208);
        assert_eq!(parsed.xing_offset(), 21);

        let mut frame = vec![0u8; 208];
        frame[..4].copy_from_slice(&header);
        let mut data = frame.repeat(10);
        data[21..25].copy_from_slice(b"Xing");

        let props = read_properties(&mut Cursor::new(data), None).unwrap();
        assert!(props.vbr);
        assert_eq!(props.frames, 10);
        assert_eq!(props.sample_rate, 22050);
        assert_eq!(props.bitrate, 64);
        assert_eq!(props.version, MpegVersion::V2);
        let expected = 576.0 / 22050.0 * 1000.0 * 10.0;
        assert!((props.duration_ms as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_vbr_frame_ceiling() {
        let mut data = xing_frame();
        for _ in 0..20 {
            data.extend(frame(0b0101));
        }
        let props = read_properties(&mut Cursor::new(data), Some(4)).unwrap();
        assert_eq!(props.frames, 4);
    }

    #[test]
    fn test_no_frame() {
        assert!(matches!(
            read_properties(&mut Cursor::new(b"not an mpeg stream".to_vec()), None),
            Err(MpegError::NoFrame)
        ));
        assert!(matches!(
            read_properties(&mut Cursor::new(Vec::new()), None),
            Err(MpegError::NoFrame)
        ));
    }

    #[test]
    fn test_unsupported_first_frame() {
        assert!(matches!(
            read_properties(&mut Cursor::new(vec![0xFF, 0xFB, 0x00, 0x00]), None),
            Err(MpegError::NotImplemented(_))
        ));
    }
}
