// Field descriptors and the frame layouts built from them

use super::cursor::ReadCursor;
use crate::error::LayoutError;
use crate::utils::encoding::{decode_text, latin1_to_utf8, EncodingError, TextEncoding};

/// Byte order of a fixed-size integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// One primitive decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    U8,
    U32(Endian),
    /// Leading byte declaring the text encoding for the rest of the frame
    EncodingByte,
    /// Latin-1 string ended by a single zero byte
    Latin1Terminated,
    /// Latin-1 string of a fixed width (language codes, v2.2 image formats)
    Latin1Sized(usize),
    /// Latin-1 string running to the end of the frame
    Latin1Rest,
    /// String in the current encoding ended by its terminator
    EncodedTerminated,
    /// String in the current encoding running to the end of the frame
    EncodedRest,
    /// 32-bit length or count, remembered for the next sized field
    SizeOfData(Endian),
    /// String in the current encoding of the remembered size
    EncodedSized,
    /// Remembered-count list of 32-bit length-prefixed strings
    ListOfEncodedStrings(Endian),
    /// Raw bytes of the remembered size
    BinarySized,
    /// Raw bytes to the end of the frame
    Binary,
}

/// Decoded value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uint(u64),
    Encoding(TextEncoding),
    Text(String),
    TextList(Vec<String>),
    Bytes(Vec<u8>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Uint(_) => "integer",
            FieldValue::Encoding(_) => "encoding",
            FieldValue::Text(_) => "text",
            FieldValue::TextList(_) => "text list",
            FieldValue::Bytes(_) => "binary",
        }
    }
}

impl Field {
    /// Run this decoder against the cursor
    pub fn read(self, cursor: &mut ReadCursor<'_>) -> Result<FieldValue, LayoutError> {
        let value = match self {
            Field::U8 => FieldValue::Uint(u64::from(cursor.take_array::<1>()?[0])),
            Field::U32(endian) => FieldValue::Uint(u64::from(read_u32(cursor, endian)?)),
            Field::EncodingByte => {
                let byte = cursor.take_array::<1>()?[0];
                let encoding =
                    TextEncoding::from_byte(byte).ok_or(EncodingError::UnknownEncoding(byte))?;
                cursor.set_encoding(encoding);
                FieldValue::Encoding(encoding)
            }
            Field::Latin1Terminated => FieldValue::Text(latin1_to_utf8(cursor.take_terminated(1))),
            Field::Latin1Sized(n) => FieldValue::Text(latin1_to_utf8(cursor.take(n)?)),
            Field::Latin1Rest => FieldValue::Text(latin1_to_utf8(trim_terminators(
                cursor.take_rest(),
                1,
            ))),
            Field::EncodedTerminated => {
                let encoding = cursor.encoding();
                let bytes = cursor.take_terminated(encoding.terminator_len());
                FieldValue::Text(decode_text(bytes, encoding)?)
            }
            Field::EncodedRest => {
                let encoding = cursor.encoding();
                let bytes = trim_terminators(cursor.take_rest(), encoding.terminator_len());
                FieldValue::Text(decode_text(bytes, encoding)?)
            }
            Field::SizeOfData(endian) => {
                let size = read_u32(cursor, endian)?;
                cursor.set_declared_size(size as usize);
                FieldValue::Uint(u64::from(size))
            }
            Field::EncodedSized => {
                let bytes = cursor.take(cursor.declared_size())?;
                FieldValue::Text(decode_text(bytes, cursor.encoding())?)
            }
            Field::ListOfEncodedStrings(endian) => {
                let mut items = Vec::new();
                if cursor.remaining() > 0 {
                    for _ in 0..cursor.declared_size() {
                        Field::SizeOfData(endian).read(cursor)?;
                        let bytes = cursor.take(cursor.declared_size())?;
                        items.push(decode_text(bytes, cursor.encoding())?);
                    }
                }
                FieldValue::TextList(items)
            }
            Field::BinarySized => FieldValue::Bytes(cursor.take(cursor.declared_size())?.to_vec()),
            Field::Binary => FieldValue::Bytes(cursor.take_rest().to_vec()),
        };
        log::trace!("{:?} -> {} at offset {}", self, value.kind(), cursor.offset());
        Ok(value)
    }
}

fn read_u32(cursor: &mut ReadCursor<'_>, endian: Endian) -> Result<u32, LayoutError> {
    let bytes = cursor.take_array::<4>()?;
    Ok(match endian {
        Endian::Big => u32::from_be_bytes(bytes),
        Endian::Little => u32::from_le_bytes(bytes),
    })
}

/// Drop trailing string terminators (one or more) from a run of text bytes
fn trim_terminators(bytes: &[u8], width: usize) -> &[u8] {
    let mut end = bytes.len();
    if width == 2 {
        // Odd lengths are left for the decoder to reject
        if end % 2 != 0 {
            return bytes;
        }
        while end >= 2 && bytes[end - 2] == 0 && bytes[end - 1] == 0 {
            end -= 2;
        }
    } else {
        while end > 0 && bytes[end - 1] == 0 {
            end -= 1;
        }
    }
    &bytes[..end]
}

/// Ordered list of field decoders describing one frame shape
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    fields: &'static [Field],
}

impl FrameLayout {
    pub const fn new(fields: &'static [Field]) -> Self {
        FrameLayout { fields }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Apply every field in order to `data`, starting in `encoding`
    pub fn read(&self, data: &[u8], encoding: TextEncoding) -> Result<FieldValues, LayoutError> {
        let mut cursor = ReadCursor::new(data, encoding);
        let values = self
            .fields
            .iter()
            .map(|field| field.read(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldValues {
            values: values.into_iter(),
        })
    }
}

/// Decoded values of a layout, consumed in declaration order
#[derive(Debug)]
pub struct FieldValues {
    values: std::vec::IntoIter<FieldValue>,
}

impl FieldValues {
    fn next_value(&mut self) -> Result<FieldValue, LayoutError> {
        self.values.next().ok_or(LayoutError::Exhausted)
    }

    fn mismatch(expected: &'static str, found: &FieldValue) -> LayoutError {
        LayoutError::TypeMismatch {
            expected,
            found: found.kind(),
        }
    }

    pub fn uint(&mut self) -> Result<u64, LayoutError> {
        match self.next_value()? {
            FieldValue::Uint(v) => Ok(v),
            other => Err(Self::mismatch("integer", &other)),
        }
    }

    pub fn encoding(&mut self) -> Result<TextEncoding, LayoutError> {
        match self.next_value()? {
            FieldValue::Encoding(e) => Ok(e),
            other => Err(Self::mismatch("encoding", &other)),
        }
    }

    pub fn text(&mut self) -> Result<String, LayoutError> {
        match self.next_value()? {
            FieldValue::Text(s) => Ok(s),
            other => Err(Self::mismatch("text", &other)),
        }
    }

    pub fn text_list(&mut self) -> Result<Vec<String>, LayoutError> {
        match self.next_value()? {
            FieldValue::TextList(list) => Ok(list),
            other => Err(Self::mismatch("text list", &other)),
        }
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, LayoutError> {
        match self.next_value()? {
            FieldValue::Bytes(b) => Ok(b),
            other => Err(Self::mismatch("binary", &other)),
        }
    }

    /// Skip a value whose content is not needed
    pub fn skip(&mut self) -> Result<(), LayoutError> {
        self.next_value().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PICTURE: FrameLayout = FrameLayout::new(&[
        Field::EncodingByte,
        Field::Latin1Terminated,
        Field::U8,
        Field::EncodedTerminated,
        Field::Binary,
    ]);

    #[test]
    fn test_picture_shape() {
        let mut data = vec![0x01];
        data.extend_from_slice(b"image/png\0");
        data.push(3);
        data.extend_from_slice(&[0xFF, 0xFE, b'h', 0, b'i', 0, 0, 0]);
        data.extend_from_slice(&[0x89, b'P', b'N', b'G']);

        let mut values = PICTURE.read(&data, TextEncoding::Iso8859_1).unwrap();
        assert_eq!(values.encoding().unwrap(), TextEncoding::Utf16);
        assert_eq!(values.text().unwrap(), "image/png");
        assert_eq!(values.uint().unwrap(), 3);
        assert_eq!(values.text().unwrap(), "hi");
        assert_eq!(values.bytes().unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(values.uint(), Err(LayoutError::Exhausted));
    }

    #[test]
    fn test_size_prefixed_list() {
        const COMMENTS: FrameLayout = FrameLayout::new(&[
            Field::SizeOfData(Endian::Little),
            Field::EncodedSized,
            Field::SizeOfData(Endian::Little),
            Field::ListOfEncodedStrings(Endian::Little),
        ]);
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"lib");
        data.extend_from_slice(&2u32.to_le_bytes());
        for comment in ["A=1", "BB=22"] {
            data.extend_from_slice(&(comment.len() as u32).to_le_bytes());
            data.extend_from_slice(comment.as_bytes());
        }

        let mut values = COMMENTS.read(&data, TextEncoding::Utf8).unwrap();
        assert_eq!(values.uint().unwrap(), 3);
        assert_eq!(values.text().unwrap(), "lib");
        assert_eq!(values.uint().unwrap(), 2);
        assert_eq!(values.text_list().unwrap(), vec!["A=1", "BB=22"]);
    }

    #[test]
    fn test_truncated_fixed_field_fails() {
        const WIDE: FrameLayout = FrameLayout::new(&[Field::U8, Field::U32(Endian::Big)]);
        let err = WIDE.read(&[1, 2, 3], TextEncoding::Iso8859_1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::Truncated {
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_oversized_declared_length_fails() {
        const SIZED: FrameLayout =
            FrameLayout::new(&[Field::SizeOfData(Endian::Big), Field::BinarySized]);
        let mut data = 100u32.to_be_bytes().to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            SIZED.read(&data, TextEncoding::Iso8859_1),
            Err(LayoutError::Truncated { needed: 100, .. })
        ));
    }

    #[test]
    fn test_unknown_encoding_byte() {
        const TEXT: FrameLayout = FrameLayout::new(&[Field::EncodingByte, Field::EncodedRest]);
        assert_eq!(
            TEXT.read(&[7, b'x'], TextEncoding::Iso8859_1).unwrap_err(),
            LayoutError::Text(EncodingError::UnknownEncoding(7))
        );
    }

    #[test]
    fn test_rest_strips_terminators() {
        const TEXT: FrameLayout = FrameLayout::new(&[Field::EncodingByte, Field::EncodedRest]);
        let mut values = TEXT.read(b"\x00Album\x00", TextEncoding::Iso8859_1).unwrap();
        values.skip().unwrap();
        assert_eq!(values.text().unwrap(), "Album");

        let mut values = TEXT
            .read(&[0x02, 0x00, b'A', 0x01, 0x00, 0x00, 0x00], TextEncoding::Iso8859_1)
            .unwrap();
        values.skip().unwrap();
        assert_eq!(values.text().unwrap(), "A\u{100}");
    }

    #[test]
    fn test_type_mismatch() {
        let mut values = PICTURE
            .read(b"\x00image/jpeg\x00\x03desc\x00", TextEncoding::Iso8859_1)
            .unwrap();
        assert!(matches!(
            values.text(),
            Err(LayoutError::TypeMismatch {
                expected: "text",
                found: "encoding"
            })
        ));
    }
}
