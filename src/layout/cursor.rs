// Read cursor over a single frame payload

use crate::error::LayoutError;
use crate::utils::encoding::TextEncoding;

/// Mutable view over one frame's bytes.
///
/// Every field decoder reads at `offset` and advances it. The cursor also
/// carries the text encoding declared by the frame (set by an encoding
/// marker byte) and the last length/count read by a size-prefix field, which
/// a following sized string or list consumes.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    data: &'a [u8],
    offset: usize,
    encoding: TextEncoding,
    declared_size: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(data: &'a [u8], encoding: TextEncoding) -> Self {
        ReadCursor {
            data,
            offset: 0,
            encoding,
            declared_size: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    pub fn declared_size(&self) -> usize {
        self.declared_size
    }

    pub fn set_declared_size(&mut self, size: usize) {
        self.declared_size = size;
    }

    /// Take exactly `n` bytes or fail without moving
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        if n > self.remaining() {
            return Err(LayoutError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let data = self.data;
        let bytes = &data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LayoutError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Everything left in the frame
    pub fn take_rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let bytes = &data[self.offset..];
        self.offset = data.len();
        bytes
    }

    /// Bytes up to the next terminator of width `width`, skipping the terminator.
    ///
    /// Two-byte terminators are only matched on even offsets relative to
    /// the cursor. A missing terminator consumes the rest of the frame.
    pub fn take_terminated(&mut self, width: usize) -> &'a [u8] {
        let data = self.data;
        let rest = &data[self.offset..];
        let end = if width == 2 {
            rest.chunks_exact(2)
                .position(|pair| pair[0] == 0 && pair[1] == 0)
                .map(|i| i * 2)
        } else {
            rest.iter().position(|&b| b == 0)
        };

        match end {
            Some(end) => {
                self.offset += end + width;
                &rest[..end]
            }
            None => self.take_rest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_bounds_checked() {
        let data = [1u8, 2, 3];
        let mut cursor = ReadCursor::new(&data, TextEncoding::Iso8859_1);
        assert_eq!(cursor.take(2).unwrap(), &[1, 2]);
        assert_eq!(
            cursor.take(2),
            Err(LayoutError::Truncated {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(cursor.offset(), 2);
    }

    #[test]
    fn test_terminated_single_byte() {
        let data = *b"abc\0def";
        let mut cursor = ReadCursor::new(&data, TextEncoding::Iso8859_1);
        assert_eq!(cursor.take_terminated(1), b"abc");
        assert_eq!(cursor.take_terminated(1), b"def");
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.take_terminated(1), b"");
    }

    #[test]
    fn test_terminated_double_byte_respects_alignment() {
        // "a\u{100}" in UTF-16LE: 61 00 00 01, then terminator
        let data = [0x61u8, 0x00, 0x00, 0x01, 0x00, 0x00, 0x42, 0x00];
        let mut cursor = ReadCursor::new(&data, TextEncoding::Utf16);
        assert_eq!(cursor.take_terminated(2), &[0x61, 0x00, 0x00, 0x01]);
        assert_eq!(cursor.offset(), 6);
        assert_eq!(cursor.take_terminated(2), &[0x42, 0x00]);
    }
}
