// ID3 frame definitions and parsers
//
// Each frame shape is a `FrameLayout`; the typed records below are built
// from the decoded field values. v2.2 uses three-character identifiers and
// a slightly different picture frame, everything else is shared.

use crate::error::LayoutError;
use crate::layout::{Field, FrameLayout};
use crate::utils::encoding::TextEncoding;

/// Common ID3v2.3 / v2.4 frame identifiers
pub mod frame_ids {
    pub const TITLE: &str = "TIT2";
    pub const ARTIST: &str = "TPE1";
    pub const ALBUM: &str = "TALB";
    pub const YEAR: &str = "TYER";
    pub const RECORDING_TIME: &str = "TDRC";
    pub const TRACK: &str = "TRCK";
    pub const GENRE: &str = "TCON";
    pub const COMMENT: &str = "COMM";
    pub const LYRICS: &str = "USLT";
    pub const PICTURE: &str = "APIC";
    pub const USER_TEXT: &str = "TXXX";
    pub const USER_URL: &str = "WXXX";
    /// v2.4 only; its presence is refused
    pub const SEEK: &str = "SEEK";
}

/// ID3v2.2 frame identifiers
pub mod frame_ids_v22 {
    pub const TITLE: &str = "TT2";
    pub const ARTIST: &str = "TP1";
    pub const ALBUM: &str = "TAL";
    pub const YEAR: &str = "TYE";
    pub const TRACK: &str = "TRK";
    pub const GENRE: &str = "TCO";
    pub const COMMENT: &str = "COM";
    pub const LYRICS: &str = "ULT";
    pub const PICTURE: &str = "PIC";
    pub const USER_TEXT: &str = "TXX";
    pub const USER_URL: &str = "WXX";
}

const TEXT: FrameLayout = FrameLayout::new(&[Field::EncodingByte, Field::EncodedRest]);

const URL: FrameLayout = FrameLayout::new(&[Field::Latin1Rest]);

const USER_TEXT: FrameLayout = FrameLayout::new(&[
    Field::EncodingByte,
    Field::EncodedTerminated,
    Field::EncodedRest,
]);

const USER_URL: FrameLayout = FrameLayout::new(&[
    Field::EncodingByte,
    Field::EncodedTerminated,
    Field::Latin1Rest,
]);

/// Shared by COMM and USLT (and COM / ULT)
const COMMENT: FrameLayout = FrameLayout::new(&[
    Field::EncodingByte,
    Field::Latin1Sized(3),
    Field::EncodedTerminated,
    Field::EncodedRest,
]);

const PICTURE: FrameLayout = FrameLayout::new(&[
    Field::EncodingByte,
    Field::Latin1Terminated,
    Field::U8,
    Field::EncodedTerminated,
    Field::Binary,
]);

/// v2.2 PIC: three-character image format instead of a MIME type
const PICTURE_V22: FrameLayout = FrameLayout::new(&[
    Field::EncodingByte,
    Field::Latin1Sized(3),
    Field::U8,
    Field::EncodedTerminated,
    Field::Binary,
]);

/// Text information frame (T***, except the user-defined one)
pub fn read_text_frame(data: &[u8]) -> Result<String, LayoutError> {
    let mut values = TEXT.read(data, TextEncoding::Iso8859_1)?;
    values.skip()?;
    values.text()
}

/// URL link frame (W***, except the user-defined one)
pub fn read_url_frame(data: &[u8]) -> Result<String, LayoutError> {
    URL.read(data, TextEncoding::Iso8859_1)?.text()
}

/// TXXX / TXX
#[derive(Debug, Clone, PartialEq)]
pub struct UserTextFrame {
    pub encoding: TextEncoding,
    pub description: String,
    pub value: String,
}

impl UserTextFrame {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        let mut values = USER_TEXT.read(data, TextEncoding::Iso8859_1)?;
        Ok(UserTextFrame {
            encoding: values.encoding()?,
            description: values.text()?,
            value: values.text()?,
        })
    }
}

/// WXXX / WXX
#[derive(Debug, Clone, PartialEq)]
pub struct UserUrlFrame {
    pub encoding: TextEncoding,
    pub description: String,
    pub url: String,
}

impl UserUrlFrame {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        let mut values = USER_URL.read(data, TextEncoding::Iso8859_1)?;
        Ok(UserUrlFrame {
            encoding: values.encoding()?,
            description: values.text()?,
            url: values.text()?,
        })
    }
}

/// COMM / USLT (and their v2.2 forms)
#[derive(Debug, Clone, PartialEq)]
pub struct CommentFrame {
    pub encoding: TextEncoding,
    pub language: String,
    pub description: String,
    pub text: String,
}

impl CommentFrame {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        let mut values = COMMENT.read(data, TextEncoding::Iso8859_1)?;
        Ok(CommentFrame {
            encoding: values.encoding()?,
            language: values.text()?,
            description: values.text()?,
            text: values.text()?,
        })
    }
}

/// APIC / PIC
#[derive(Debug, Clone, PartialEq)]
pub struct PictureFrame {
    pub encoding: TextEncoding,
    /// MIME type, or the v2.2 three-letter format ("JPG", "PNG")
    pub mime_type: String,
    pub picture_type: u8,
    pub description: String,
    pub data: Vec<u8>,
}

impl PictureFrame {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        Self::from_layout(PICTURE, data)
    }

    pub fn read_v22(data: &[u8]) -> Result<Self, LayoutError> {
        Self::from_layout(PICTURE_V22, data)
    }

    fn from_layout(layout: FrameLayout, data: &[u8]) -> Result<Self, LayoutError> {
        let mut values = layout.read(data, TextEncoding::Iso8859_1)?;
        Ok(PictureFrame {
            encoding: values.encoding()?,
            mime_type: values.text()?,
            picture_type: values.uint()? as u8,
            description: values.text()?,
            data: values.bytes()?,
        })
    }

    /// MIME type regardless of tag version
    pub fn normalized_mime_type(&self) -> String {
        match self.mime_type.to_ascii_uppercase().as_str() {
            "JPG" => "image/jpeg".to_string(),
            "PNG" => "image/png".to_string(),
            "GIF" => "image/gif".to_string(),
            "BMP" => "image/bmp".to_string(),
            _ => self.mime_type.clone(),
        }
    }
}

/// Text and URL frames share a first letter convention
pub fn is_text_frame(id: &str) -> bool {
    id.starts_with('T') && id != frame_ids::USER_TEXT && id != frame_ids_v22::USER_TEXT
}

pub fn is_url_frame(id: &str) -> bool {
    id.starts_with('W') && id != frame_ids::USER_URL && id != frame_ids_v22::USER_URL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::encode_utf16_with_bom;

    #[test]
    fn test_text_frame_encodings() {
        let latin1 = b"\x00Caf\xe9\x00";
        assert_eq!(read_text_frame(latin1).unwrap(), "Café");

        let mut utf16 = vec![0x01];
        utf16.extend(encode_utf16_with_bom("虹"));
        utf16.extend_from_slice(&[0, 0]);
        assert_eq!(read_text_frame(&utf16).unwrap(), "虹");

        let utf8 = "\u{3}ねこ".as_bytes();
        assert_eq!(read_text_frame(utf8).unwrap(), "ねこ");
    }

    #[test]
    fn test_empty_text_frame() {
        assert_eq!(read_text_frame(&[0x00]).unwrap(), "");
        assert!(read_text_frame(&[]).is_err());
    }

    #[test]
    fn test_comment_frame() {
        let data = b"\x00engshort\x00The comment";
        let frame = CommentFrame::read(data).unwrap();
        assert_eq!(frame.language, "eng");
        assert_eq!(frame.description, "short");
        assert_eq!(frame.text, "The comment");
    }

    #[test]
    fn test_user_frames() {
        let txxx = UserTextFrame::read(b"\x03REPLAYGAIN\x00-6.5 dB").unwrap();
        assert_eq!(txxx.encoding, TextEncoding::Utf8);
        assert_eq!(txxx.description, "REPLAYGAIN");
        assert_eq!(txxx.value, "-6.5 dB");

        let mut wxxx = vec![0x01];
        wxxx.extend(encode_utf16_with_bom("home"));
        wxxx.extend_from_slice(&[0, 0]);
        wxxx.extend_from_slice(b"https://example.org");
        let wxxx = UserUrlFrame::read(&wxxx).unwrap();
        assert_eq!(wxxx.description, "home");
        assert_eq!(wxxx.url, "https://example.org");
    }

    #[test]
    fn test_picture_v22() {
        let data = b"\x00JPG\x03cover\x00\xff\xd8\xff";
        let frame = PictureFrame::read_v22(data).unwrap();
        assert_eq!(frame.mime_type, "JPG");
        assert_eq!(frame.normalized_mime_type(), "image/jpeg");
        assert_eq!(frame.picture_type, 3);
        assert_eq!(frame.description, "cover");
        assert_eq!(frame.data, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_frame_classification() {
        assert!(is_text_frame("TIT2"));
        assert!(is_text_frame("TAL"));
        assert!(!is_text_frame("TXXX"));
        assert!(is_url_frame("WOAR"));
        assert!(!is_url_frame("WXX"));
    }
}
