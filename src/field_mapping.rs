// Unified metadata field mapping
//
// Each tag format names the same fields differently:
// - ID3v2.2: three-character frame IDs (TT2, TP1, TAL, ...)
// - ID3v2.3/2.4: four-character frame IDs (TIT2, TPE1, TALB, ...)
// - FLAC: Vorbis comment keys (TITLE, ARTIST, ALBUM, ...)
//
// The facades look fields up through this module so that callers only deal
// with `StandardField`.

use crate::flac::vorbis::fields as vorbis;
use crate::id3::frames::{frame_ids, frame_ids_v22};

/// Standard metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardField {
    Title,
    Artist,
    Album,
    Year,
    Track,
    Genre,
    Comment,
    Lyrics,
    Cover,
}

impl StandardField {
    pub const ALL: [StandardField; 9] = [
        StandardField::Title,
        StandardField::Artist,
        StandardField::Album,
        StandardField::Year,
        StandardField::Track,
        StandardField::Genre,
        StandardField::Comment,
        StandardField::Lyrics,
        StandardField::Cover,
    ];

    /// Get standard field name (lowercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardField::Title => "title",
            StandardField::Artist => "artist",
            StandardField::Album => "album",
            StandardField::Year => "year",
            StandardField::Track => "track",
            StandardField::Genre => "genre",
            StandardField::Comment => "comment",
            StandardField::Lyrics => "lyrics",
            StandardField::Cover => "cover",
        }
    }

    /// Parse from string, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
    }
}

/// Format-specific field mappings
pub struct FieldMappings;

impl FieldMappings {
    /// Frame IDs carrying `field`, most specific first.
    ///
    /// v2.4 dropped TYER in favour of TDRC, but plenty of v2.4 writers still
    /// emit TYER, so both are tried.
    pub fn to_id3v2(field: StandardField, version: u8) -> &'static [&'static str] {
        if version == 2 {
            return match field {
                StandardField::Title => &[frame_ids_v22::TITLE],
                StandardField::Artist => &[frame_ids_v22::ARTIST],
                StandardField::Album => &[frame_ids_v22::ALBUM],
                StandardField::Year => &[frame_ids_v22::YEAR],
                StandardField::Track => &[frame_ids_v22::TRACK],
                StandardField::Genre => &[frame_ids_v22::GENRE],
                StandardField::Comment => &[frame_ids_v22::COMMENT],
                StandardField::Lyrics => &[frame_ids_v22::LYRICS],
                StandardField::Cover => &[frame_ids_v22::PICTURE],
            };
        }
        match field {
            StandardField::Title => &[frame_ids::TITLE],
            StandardField::Artist => &[frame_ids::ARTIST],
            StandardField::Album => &[frame_ids::ALBUM],
            StandardField::Year if version == 4 => &[frame_ids::RECORDING_TIME, frame_ids::YEAR],
            StandardField::Year => &[frame_ids::YEAR, frame_ids::RECORDING_TIME],
            StandardField::Track => &[frame_ids::TRACK],
            StandardField::Genre => &[frame_ids::GENRE],
            StandardField::Comment => &[frame_ids::COMMENT],
            StandardField::Lyrics => &[frame_ids::LYRICS],
            StandardField::Cover => &[frame_ids::PICTURE],
        }
    }

    /// Get Vorbis comment key for a standard field
    pub fn to_vorbis(field: StandardField) -> &'static str {
        match field {
            StandardField::Title => vorbis::TITLE,
            StandardField::Artist => vorbis::ARTIST,
            StandardField::Album => vorbis::ALBUM,
            StandardField::Year => vorbis::DATE,
            StandardField::Track => vorbis::TRACKNUMBER,
            StandardField::Genre => vorbis::GENRE,
            StandardField::Comment => vorbis::COMMENT,
            StandardField::Lyrics => vorbis::LYRICS,
            // Pictures live in PICTURE blocks, not in comments
            StandardField::Cover => "METADATA_BLOCK_PICTURE",
        }
    }

    /// Convert an ID3v2 frame ID of any version to a standard field
    pub fn from_id3v2(frame_id: &str) -> Option<StandardField> {
        match frame_id {
            frame_ids::TITLE | frame_ids_v22::TITLE => Some(StandardField::Title),
            frame_ids::ARTIST | frame_ids_v22::ARTIST => Some(StandardField::Artist),
            frame_ids::ALBUM | frame_ids_v22::ALBUM => Some(StandardField::Album),
            frame_ids::YEAR | frame_ids::RECORDING_TIME | frame_ids_v22::YEAR => {
                Some(StandardField::Year)
            }
            frame_ids::TRACK | frame_ids_v22::TRACK => Some(StandardField::Track),
            frame_ids::GENRE | frame_ids_v22::GENRE => Some(StandardField::Genre),
            frame_ids::COMMENT | frame_ids_v22::COMMENT => Some(StandardField::Comment),
            frame_ids::LYRICS | frame_ids_v22::LYRICS => Some(StandardField::Lyrics),
            frame_ids::PICTURE | frame_ids_v22::PICTURE => Some(StandardField::Cover),
            _ => None,
        }
    }

    /// Convert Vorbis comment key to standard field
    pub fn from_vorbis(key: &str) -> Option<StandardField> {
        match key.to_ascii_uppercase().as_str() {
            vorbis::TITLE => Some(StandardField::Title),
            vorbis::ARTIST => Some(StandardField::Artist),
            vorbis::ALBUM => Some(StandardField::Album),
            vorbis::DATE | "YEAR" => Some(StandardField::Year),
            vorbis::TRACKNUMBER => Some(StandardField::Track),
            vorbis::GENRE => Some(StandardField::Genre),
            vorbis::COMMENT | "DESCRIPTION" => Some(StandardField::Comment),
            vorbis::LYRICS | "UNSYNCEDLYRICS" => Some(StandardField::Lyrics),
            "METADATA_BLOCK_PICTURE" => Some(StandardField::Cover),
            _ => None,
        }
    }
}

/// ID3v1 genre names, also referenced by ID3v2 TCON values like "(17)"
const GENRES: [&str; 80] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock", "Techno",
    "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack", "Euro-Techno",
    "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical", "Instrumental",
    "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise", "AlternRock", "Bass", "Soul",
    "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic",
    "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychedelic", "Rave", "Showtunes", "Trailer",
    "Lo-Fi", "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll",
    "Hard Rock",
];

/// Metadata value converter for format-specific value conventions
pub struct ValueConverter;

impl ValueConverter {
    /// Extract the 4-digit year from dates like "2024-01-15"
    pub fn normalize_year(year: &str) -> String {
        let year = year.trim();
        match year.get(..4) {
            Some(prefix) => prefix.to_string(),
            None => year.to_string(),
        }
    }

    /// Genre name for an ID3v1 genre index
    pub fn genre_name(genre_id: u8) -> Option<&'static str> {
        GENRES.get(usize::from(genre_id)).copied()
    }

    /// Resolve "(17)", "17" or "(17)Rock" style TCON values; anything else is
    /// returned unchanged
    pub fn normalize_genre(genre: &str) -> String {
        let genre = genre.trim();
        let inner = genre
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
            .map(|(index, refinement)| (index, refinement.trim()));

        match inner {
            Some((_, refinement)) if !refinement.is_empty() => refinement.to_string(),
            Some((index, _)) => index
                .parse()
                .ok()
                .and_then(Self::genre_name)
                .map(str::to_string)
                .unwrap_or_else(|| genre.to_string()),
            None => genre
                .parse()
                .ok()
                .and_then(Self::genre_name)
                .map(str::to_string)
                .unwrap_or_else(|| genre.to_string()),
        }
    }
}
