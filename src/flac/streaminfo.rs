// STREAMINFO block decoding

use crate::error::{Result, TagError};
use crate::utils::io::be_u24;

/// Decoded STREAMINFO block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    /// 0 when unknown
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// 0 when unknown
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfo {
    pub const LEN: usize = 34;

    /// Unpack the fixed 34-byte layout.
    ///
    /// Bytes 10..18 hold, MSB first: sample rate (20 bits), channels - 1
    /// (3 bits), bits per sample - 1 (5 bits), total samples (36 bits).
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(TagError::InvalidTag("STREAMINFO shorter than 34 bytes"));
        }

        let mut packed = [0u8; 8];
        packed.copy_from_slice(&data[10..18]);
        let packed = u64::from_be_bytes(packed);

        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&data[18..34]);

        Ok(StreamInfo {
            min_block_size: u16::from_be_bytes([data[0], data[1]]),
            max_block_size: u16::from_be_bytes([data[2], data[3]]),
            min_frame_size: be_u24([data[4], data[5], data[6]]),
            max_frame_size: be_u24([data[7], data[8], data[9]]),
            sample_rate: (packed >> 44) as u32,
            channels: ((packed >> 41) & 0x7) as u8 + 1,
            bits_per_sample: ((packed >> 36) & 0x1F) as u8 + 1,
            total_samples: packed & 0xF_FFFF_FFFF,
            md5,
        })
    }

    /// Duration in milliseconds, 0 when the sample count or rate is unknown
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.total_samples * 1000 / u64::from(self.sample_rate)
    }

    pub fn md5_hex(&self) -> String {
        self.md5.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
