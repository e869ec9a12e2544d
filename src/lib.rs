// Tagscout - ID3v2 / FLAC metadata and MPEG duration extraction

use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};

pub mod error;
pub mod field_mapping;
pub mod flac;
pub mod id3;
pub mod layout;
pub mod mpeg;
pub mod scan;
pub mod tag;
pub mod utils;

pub use error::{LayoutError, MpegError, Result, TagError};
pub use tag::{Extractor, Tag};

use flac::{FlacPicture, FlacTag, FLAC_SIGNATURE};
use id3::frames::PictureFrame;
use id3::Id3v2Tag;
use mpeg::{MpegProperties, DEFAULT_MAX_VBR_FRAMES};

/// Container formats recognized by [`AudioFile::detect_file_type`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FileType {
    Mp3,
    Flac,
    /// Detected only; no tag or duration is read
    Wav,
    Unknown,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Mp3 => "mp3",
            FileType::Flac => "flac",
            FileType::Wav => "wav",
            FileType::Unknown => "unknown",
        }
    }

    fn from_extension(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("mp3") => FileType::Mp3,
            Some("flac") => FileType::Flac,
            Some("wav") => FileType::Wav,
            _ => FileType::Unknown,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for [`AudioFile::read_metadata`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Compute the duration (MPEG frame walk or FLAC STREAMINFO)
    pub read_duration: bool,
    /// Ceiling on frames visited for VBR streams; `None` walks to the end
    pub max_vbr_frames: Option<u64>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            read_duration: true,
            max_vbr_frames: Some(DEFAULT_MAX_VBR_FRAMES),
        }
    }
}

/// Audio file metadata handler
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
    file_type: FileType,
}

impl AudioFile {
    /// Open `path` and detect its format
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_type = Self::detect_file_type(&path)?;
        Ok(AudioFile { path, file_type })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Detect the format from magic bytes, falling back to the extension
    pub fn detect_file_type(path: impl AsRef<Path>) -> Result<FileType> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        let got = utils::io::read_up_to(&mut file, &mut magic)?;
        let magic = &magic[..got];

        let detected = if magic.starts_with(FLAC_SIGNATURE) {
            FileType::Flac
        } else if magic.starts_with(b"ID3") {
            FileType::Mp3
        } else if magic.starts_with(b"RIFF") {
            FileType::Wav
        } else if got >= 2 && mpeg::header::is_frame_sync(magic[0], magic[1]) {
            FileType::Mp3
        } else {
            FileType::from_extension(path)
        };
        log::debug!("{}: detected {}", path.display(), detected);
        Ok(detected)
    }

    fn open(&self) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.path)?))
    }

    /// Read the tag, if the format carries one.
    ///
    /// MP3 files without an ID3v2 tag give `Ok(None)`; structural errors
    /// are returned as is.
    pub fn read_tag(&self) -> Result<Option<Tag>> {
        match self.file_type {
            FileType::Mp3 => match Id3v2Tag::read(&mut self.open()?) {
                Ok(tag) => Ok(Some(Tag::Id3v2(tag))),
                Err(e) if e.is_recoverable() => Ok(None),
                Err(e) => Err(e),
            },
            FileType::Flac => Ok(Some(Tag::Flac(FlacTag::read(&mut self.open()?)?))),
            FileType::Wav | FileType::Unknown => Ok(None),
        }
    }

    /// Read tag fields and stream properties.
    ///
    /// A broken tag does not stop duration extraction: the error is kept in
    /// [`Metadata::tag_error`] and the MPEG walk starts from the
    /// resynchronized position.
    pub fn read_metadata(&self, options: &ReadOptions) -> Result<Metadata> {
        self.read_all(options).map(|(metadata, _)| metadata)
    }

    /// Tag and stream properties from a single open of the file.
    ///
    /// The tag outcome comes back next to the metadata so that `NoTag` and
    /// `UnknownTag` stay distinguishable; WAV and unknown files report
    /// `UnknownTag`. Only I/O failures are returned as `Err`.
    pub fn read_all(&self, options: &ReadOptions) -> Result<(Metadata, Result<Tag>)> {
        let mut metadata = Metadata::new(self.file_type);
        let tag = match self.file_type {
            FileType::Mp3 => {
                let mut reader = self.open()?;
                let tag = io_fatal(Id3v2Tag::read(&mut reader))?.map(Tag::Id3v2);
                if options.read_duration {
                    self.read_mpeg(&mut reader, &mut metadata, options)?;
                }
                tag
            }
            FileType::Flac => {
                let tag = io_fatal(FlacTag::read(&mut self.open()?))?;
                if let Ok(tag) = &tag {
                    let info = *tag.stream_info();
                    metadata.sample_rate = Some(info.sample_rate);
                    metadata.channels = Some(info.channels);
                    metadata.bits_per_sample = Some(info.bits_per_sample);
                    if options.read_duration {
                        metadata.duration_ms = Some(info.duration_ms());
                    }
                }
                tag.map(Tag::Flac)
            }
            FileType::Wav | FileType::Unknown => Err(TagError::UnknownTag),
        };

        match &tag {
            Ok(tag) => metadata.apply_tag(tag),
            Err(e) if e.is_recoverable() => {}
            Err(e) => {
                log::warn!("{}: {}", self.path.display(), e);
                metadata.tag_error = Some(e.to_string());
            }
        }
        Ok((metadata, tag))
    }

    /// MPEG properties from the reader's position, as left by the tag read
    fn read_mpeg(
        &self,
        reader: &mut BufReader<File>,
        metadata: &mut Metadata,
        options: &ReadOptions,
    ) -> Result<()> {
        let audio_start = reader.stream_position()?;
        match mpeg::read_properties(reader, options.max_vbr_frames) {
            Ok(properties) => metadata.apply_mpeg(&properties),
            Err(e) => log::warn!(
                "{}: no duration from offset {}: {}",
                self.path.display(),
                audio_start,
                e
            ),
        }
        Ok(())
    }

    /// Every embedded picture, in file order
    pub fn extract_covers(&self) -> Result<Vec<CoverArt>> {
        Ok(self.read_tag()?.map(|tag| tag.images()).unwrap_or_default())
    }
}

/// Embedded picture, independent of the tag format
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CoverArt {
    pub mime_type: String,
    pub picture_type: String,
    /// Zero when the tag does not record it (ID3v2)
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub description: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl CoverArt {
    /// Save cover art to file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }

    /// File extension for the MIME type, "jpg" when unknown
    pub fn get_extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            _ => "jpg",
        }
    }
}

impl From<PictureFrame> for CoverArt {
    fn from(frame: PictureFrame) -> Self {
        CoverArt {
            mime_type: frame.normalized_mime_type(),
            picture_type: flac::PictureType::from_u32(u32::from(frame.picture_type))
                .as_str()
                .to_string(),
            width: 0,
            height: 0,
            depth: 0,
            description: frame.description,
            data: frame.data,
        }
    }
}

impl From<FlacPicture> for CoverArt {
    fn from(picture: FlacPicture) -> Self {
        CoverArt {
            mime_type: picture.mime_type,
            picture_type: picture.picture_type.as_str().to_string(),
            width: picture.width,
            height: picture.height,
            depth: picture.depth,
            description: picture.description,
            data: picture.data,
        }
    }
}

impl std::fmt::Display for CoverArt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CoverArt(type={}, mime_type={}, {}x{}, depth={}, {} bytes)",
            self.picture_type,
            self.mime_type,
            self.width,
            self.height,
            self.depth,
            self.data.len()
        )
    }
}

/// Audio metadata structure
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Metadata {
    pub file_type: String,
    /// Tag format, e.g. "ID3v2.3" or "FLAC"; empty without a tag
    pub version: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub track: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    pub duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub bits_per_sample: Option<u8>,
    /// kbps
    pub bitrate: Option<u32>,
    pub vbr: Option<bool>,
    pub picture_count: usize,
    /// Frame identifiers or FLAC block names present in the tag
    pub frames: Vec<String>,
    /// Set when a tag was found but could not be read
    pub tag_error: Option<String>,
}

// I/O failures abort a read; any other tag error is an outcome
fn io_fatal<T>(result: Result<T>) -> Result<Result<T>> {
    match result {
        Err(TagError::Io(e)) => Err(TagError::Io(e)),
        other => Ok(other),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Metadata {
    pub fn new(file_type: FileType) -> Self {
        Metadata {
            file_type: file_type.as_str().to_string(),
            ..Metadata::default()
        }
    }

    pub fn apply_tag(&mut self, tag: &Tag) {
        self.version = tag.format_name();
        self.title = non_empty(tag.title());
        self.artist = non_empty(tag.artist());
        self.album = non_empty(tag.album());
        self.year = non_empty(tag.year());
        self.track = non_empty(tag.track());
        self.genre = non_empty(tag.genre());
        self.comment = non_empty(tag.comment());
        self.lyrics = non_empty(tag.lyrics());
        self.picture_count = tag.images().len();
        self.frames = tag.frame_titles();
    }

    pub fn apply_mpeg(&mut self, properties: &MpegProperties) {
        self.duration_ms = Some(properties.duration_ms);
        self.sample_rate = Some(properties.sample_rate);
        self.channels = Some(properties.channels);
        self.bitrate = Some(properties.bitrate);
        self.vbr = Some(properties.vbr);
    }
}

impl std::fmt::Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Metadata(file_type={}, version={}, title={}, artist={}, album={})",
            self.file_type,
            self.version,
            self.title.as_deref().unwrap_or("None"),
            self.artist.as_deref().unwrap_or("None"),
            self.album.as_deref().unwrap_or("None")
        )
    }
}
