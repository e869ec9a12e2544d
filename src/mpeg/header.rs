// MPEG audio frame header parsing

use crate::error::MpegError;

/// Bitrates in kbps for MPEG-1, by layer (I, II, III) and bitrate index
const BITRATES_V1: [[u32; 16]; 3] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
];

/// Bitrates in kbps for MPEG-2 and 2.5; layers II and III share a row
const BITRATES_V2: [[u32; 16]; 3] = [
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
];

/// Sample rates by raw version bits, then sample-rate index
const SAMPLE_RATES: [[u32; 4]; 4] = [
    [11025, 12000, 8000, 0],
    [0, 0, 0, 0],
    [22050, 24000, 16000, 0],
    [44100, 48000, 32000, 0],
];

/// `0xFF` followed by a byte with its top three bits set
pub fn is_frame_sync(first: u8, second: u8) -> bool {
    first == 0xFF && second >> 5 == 0b111
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

impl std::fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpegVersion::V1 => write!(f, "MPEG-1"),
            MpegVersion::V2 => write!(f, "MPEG-2"),
            MpegVersion::V2_5 => write!(f, "MPEG-2.5"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Layer {
    Layer1 = 1,
    Layer2 = 2,
    Layer3 = 3,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Layer1 => write!(f, "Layer I"),
            Layer::Layer2 => write!(f, "Layer II"),
            Layer::Layer3 => write!(f, "Layer III"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

/// One decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// Followed by a 16-bit CRC
    pub crc_protected: bool,
    /// kbps
    pub bitrate: u32,
    /// Hz
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

impl FrameHeader {
    pub const LEN: usize = 4;

    /// Decode a 4-byte frame header
    pub fn parse(bytes: [u8; 4]) -> Result<Self, MpegError> {
        if !is_frame_sync(bytes[0], bytes[1]) {
            return Err(MpegError::InvalidFrameHeader("missing frame sync"));
        }
        let header = u32::from_be_bytes(bytes);

        let version_bits = ((header >> 19) & 0b11) as usize;
        let version = match version_bits {
            0 => MpegVersion::V2_5,
            2 => MpegVersion::V2,
            3 => MpegVersion::V1,
            _ => return Err(MpegError::InvalidFrameHeader("reserved MPEG version")),
        };

        let layer = match (header >> 17) & 0b11 {
            1 => Layer::Layer3,
            2 => Layer::Layer2,
            3 => Layer::Layer1,
            _ => return Err(MpegError::InvalidFrameHeader("reserved layer")),
        };

        let bitrate_index = ((header >> 12) & 0xF) as usize;
        match bitrate_index {
            0b1111 => return Err(MpegError::InvalidFrameHeader("bad bitrate index")),
            0b0000 => return Err(MpegError::NotImplemented("free bitrate")),
            _ => {}
        }

        let sample_rate_index = ((header >> 10) & 0b11) as usize;
        if sample_rate_index == 0b11 {
            return Err(MpegError::NotImplemented("reserved sample rate"));
        }

        let table = if version == MpegVersion::V1 {
            &BITRATES_V1
        } else {
            &BITRATES_V2
        };
        let bitrate = table[layer as usize - 1][bitrate_index];
        let sample_rate = SAMPLE_RATES[version_bits][sample_rate_index];

        let channel_mode = match (header >> 6) & 0b11 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };

        Ok(FrameHeader {
            version,
            layer,
            crc_protected: (header >> 16) & 1 == 0,
            bitrate,
            sample_rate,
            padding: (header >> 9) & 1 == 1,
            channel_mode,
        })
    }

    pub fn channels(&self) -> u8 {
        if self.channel_mode == ChannelMode::SingleChannel {
            1
        } else {
            2
        }
    }

    /// Samples coded in one frame
    pub fn samples(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer2, _) | (Layer::Layer3, MpegVersion::V1) => 1152,
            (Layer::Layer3, _) => 576,
        }
    }

    /// Frame length in bytes, header included, rounded down
    pub fn frame_len(&self) -> u32 {
        let bitrate = self.bitrate * 1000;
        match self.layer {
            Layer::Layer1 => (12 * bitrate / self.sample_rate + u32::from(self.padding)) * 4,
            _ => {
                let slots = self.samples() / 8;
                slots * bitrate / self.sample_rate + u32::from(self.padding)
            }
        }
    }

    pub fn duration_ms(&self) -> f64 {
        f64::from(self.samples()) / f64::from(self.sample_rate) * 1000.0
    }

    /// Offset from the frame start where a Xing/Info header would sit,
    /// just past the Layer III side information
    pub fn xing_offset(&self) -> usize {
        let mono = self.channel_mode == ChannelMode::SingleChannel;
        let side_info = match (self.version, mono) {
            (MpegVersion::V1, false) => 32,
            (MpegVersion::V1, true) => 17,
            (_, false) => 17,
            (_, true) => 9,
        };
        Self::LEN + side_info
    }
}
