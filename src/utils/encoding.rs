// Text transcoding between Latin-1, UTF-16 and UTF-8
//
// Everything here works on borrowed byte runs and builds the UTF-8 output
// byte by byte. Nothing panics on malformed input; failures are reported as
// `EncodingError`.

/// Text encoding declared by an ID3v2 encoding byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Iso8859_1 = 0,
    /// UTF-16 with a byte order mark
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TextEncoding::Iso8859_1),
            1 => Some(TextEncoding::Utf16),
            2 => Some(TextEncoding::Utf16BE),
            3 => Some(TextEncoding::Utf8),
            _ => None,
        }
    }

    /// Width of the string terminator in this encoding
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16BE => 2,
            TextEncoding::Iso8859_1 | TextEncoding::Utf8 => 1,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("UTF-16 data has an odd length")]
    OddLength,
    #[error("UTF-16 data contains an unpaired or malformed surrogate")]
    UnpairedSurrogate,
    #[error("UTF-16 data has no valid byte order mark")]
    InvalidByteOrderMark,
    #[error("Invalid UTF-8 data")]
    InvalidUtf8,
    #[error("Character {0:?} cannot be represented in the target encoding")]
    Unrepresentable(char),
    #[error("Unknown text encoding byte {0}")]
    UnknownEncoding(u8),
}

/// Decode `data` declared as `encoding` into a UTF-8 string
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> Result<String, EncodingError> {
    if data.is_empty() {
        return Ok(String::new());
    }
    match encoding {
        TextEncoding::Iso8859_1 => Ok(latin1_to_utf8(data)),
        TextEncoding::Utf16 => decode_utf16_with_bom(data),
        TextEncoding::Utf16BE => decode_utf16be(data),
        TextEncoding::Utf8 => std::str::from_utf8(data)
            .map(str::to_owned)
            .map_err(|_| EncodingError::InvalidUtf8),
    }
}

/// Latin-1 to UTF-8: bytes up to 0x7F pass through, 0x80-0xFF become two bytes
pub fn latin1_to_utf8(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        if byte <= 0x7F {
            out.push(byte);
        } else {
            out.push(0xC0 | (byte >> 6));
            out.push(0x80 | (byte & 0x3F));
        }
    }
    // Every sequence pushed above is well formed
    String::from_utf8(out).unwrap_or_default()
}

/// UTF-16 with a leading BOM: `FE FF` is big endian, `FF FE` little endian
pub fn decode_utf16_with_bom(data: &[u8]) -> Result<String, EncodingError> {
    match data {
        [0xFE, 0xFF, rest @ ..] => decode_utf16be(rest),
        [0xFF, 0xFE, rest @ ..] => decode_utf16le(rest),
        _ => Err(EncodingError::InvalidByteOrderMark),
    }
}

/// UTF-16 big endian without a BOM
pub fn decode_utf16be(data: &[u8]) -> Result<String, EncodingError> {
    utf16_to_utf8(&code_units(data, u16::from_be_bytes)?)
}

/// UTF-16 little endian without a BOM
pub fn decode_utf16le(data: &[u8]) -> Result<String, EncodingError> {
    utf16_to_utf8(&code_units(data, u16::from_le_bytes)?)
}

fn code_units(data: &[u8], convert: fn([u8; 2]) -> u16) -> Result<Vec<u16>, EncodingError> {
    if data.len() % 2 != 0 {
        return Err(EncodingError::OddLength);
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| convert([pair[0], pair[1]]))
        .collect())
}

/// Transcode UTF-16 code units into UTF-8
pub fn utf16_to_utf8(units: &[u16]) -> Result<String, EncodingError> {
    let mut out = Vec::with_capacity(units.len() * 3);
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        match unit {
            0x0000..=0x007F => out.push(unit as u8),
            0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            0x0800..=0xD7FF | 0xE000..=0xFFFF => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            0xD800..=0xDBFF => {
                let low = match units.get(i + 1) {
                    Some(&low @ 0xDC00..=0xDFFF) => low,
                    _ => return Err(EncodingError::UnpairedSurrogate),
                };
                let code_point =
                    0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                out.push(0xF0 | (code_point >> 18) as u8);
                out.push(0x80 | ((code_point >> 12) & 0x3F) as u8);
                out.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
                out.push(0x80 | (code_point & 0x3F) as u8);
                i += 1;
            }
            // Low surrogate with no preceding high surrogate
            0xDC00..=0xDFFF => return Err(EncodingError::UnpairedSurrogate),
        }
        i += 1;
    }
    String::from_utf8(out).map_err(|_| EncodingError::InvalidUtf8)
}

/// Transcode UTF-8 into UTF-16 code units, splitting supplementary planes into surrogate pairs
pub fn utf8_to_utf16(text: &str) -> Vec<u16> {
    let bytes = text.as_bytes();
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        // `text` is a valid str, so continuation bytes are always present
        let (code_point, width) = if lead < 0x80 {
            (u32::from(lead), 1)
        } else if lead & 0xE0 == 0xC0 {
            (
                (u32::from(lead & 0x1F) << 6) | u32::from(bytes[i + 1] & 0x3F),
                2,
            )
        } else if lead & 0xF0 == 0xE0 {
            (
                (u32::from(lead & 0x0F) << 12)
                    | (u32::from(bytes[i + 1] & 0x3F) << 6)
                    | u32::from(bytes[i + 2] & 0x3F),
                3,
            )
        } else {
            (
                (u32::from(lead & 0x07) << 18)
                    | (u32::from(bytes[i + 1] & 0x3F) << 12)
                    | (u32::from(bytes[i + 2] & 0x3F) << 6)
                    | u32::from(bytes[i + 3] & 0x3F),
                4,
            )
        };

        if code_point >= 0x10000 {
            let offset = code_point - 0x10000;
            units.push(0xD800 + (offset >> 10) as u16);
            units.push(0xDC00 + (offset & 0x3FF) as u16);
        } else {
            units.push(code_point as u16);
        }
        i += width;
    }
    units
}

/// UTF-8 to Latin-1; anything above U+00FF is rejected
pub fn utf8_to_latin1(text: &str) -> Result<Vec<u8>, EncodingError> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| EncodingError::Unrepresentable(c)))
        .collect()
}

/// UTF-16 little endian prefixed with the `FF FE` BOM
pub fn encode_utf16_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in utf8_to_utf16(text) {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// UTF-16 big endian without a BOM
pub fn encode_utf16be(text: &str) -> Vec<u8> {
    utf8_to_utf16(text)
        .into_iter()
        .flat_map(u16::to_be_bytes)
        .collect()
}

/// Encode text with specified encoding
pub fn encode_text(text: &str, encoding: TextEncoding) -> Result<Vec<u8>, EncodingError> {
    match encoding {
        TextEncoding::Iso8859_1 => utf8_to_latin1(text),
        TextEncoding::Utf16 => Ok(encode_utf16_with_bom(text)),
        TextEncoding::Utf16BE => Ok(encode_utf16be(text)),
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
    }
}
