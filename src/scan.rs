// Directory scanning: which files carry which frames, and how long they play

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use glob::{glob, Pattern, PatternError};

use crate::error::TagError;
use crate::tag::Tag;
use crate::{AudioFile, ReadOptions};

/// Bucket for files whose tag is ID3v2.4
pub const V4_BUCKET: &str = "v4";
/// Bucket for files starting with something other than a known tag
pub const UNKNOWN_BUCKET: &str = "unknown";
/// Bucket for files that could not be read at all
pub const ERROR_BUCKET: &str = "error";

const EXTENSIONS: [&str; 2] = ["mp3", "flac"];

/// Aggregated view of every `.mp3` / `.flac` file below a directory
#[derive(Debug, Default)]
pub struct TagScout {
    frame_paths: BTreeMap<String, Vec<PathBuf>>,
    durations: BTreeMap<PathBuf, u64>,
}

impl TagScout {
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, PatternError> {
        Self::scan_with(dir, &ReadOptions::default())
    }

    /// Scan `dir` recursively. A file that fails to parse is bucketed,
    /// never fatal.
    pub fn scan_with(dir: impl AsRef<Path>, options: &ReadOptions) -> Result<Self, PatternError> {
        let root = Pattern::escape(&dir.as_ref().to_string_lossy());
        let mut scout = TagScout::default();

        for extension in EXTENSIONS {
            for entry in glob(&format!("{}/**/*.{}", root, extension))? {
                match entry {
                    Ok(path) if path.is_file() => scout.scan_file(&path, options),
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Skipping unreadable path: {}", e);
                        scout.push(ERROR_BUCKET, e.path());
                    }
                }
            }
        }
        log::debug!(
            "Scanned {} files, {} buckets",
            scout.durations.len(),
            scout.frame_paths.len()
        );
        Ok(scout)
    }

    fn scan_file(&mut self, path: &Path, options: &ReadOptions) {
        log::trace!("Scanning {}", path.display());
        let audio = match AudioFile::new(path) {
            Ok(audio) => audio,
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                self.push(ERROR_BUCKET, path);
                return;
            }
        };

        let (metadata, tag) = match audio.read_all(options) {
            Ok(read) => read,
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                self.push(ERROR_BUCKET, path);
                return;
            }
        };

        match tag {
            Ok(tag) => {
                for id in tag.frame_titles() {
                    self.push(&id, path);
                }
                if matches!(&tag, Tag::Id3v2(tag) if tag.version() == 4) {
                    self.push(V4_BUCKET, path);
                }
            }
            Err(TagError::NoTag) => {}
            Err(TagError::UnknownTag) => self.push(UNKNOWN_BUCKET, path),
            Err(TagError::InvalidTag(reason)) => {
                log::debug!("{}: invalid tag ({})", path.display(), reason);
            }
            // Already logged by the read
            Err(_) => self.push(ERROR_BUCKET, path),
        }

        if let Some(duration) = metadata.duration_ms {
            self.durations.insert(path.to_path_buf(), duration);
        }
    }

    fn push(&mut self, bucket: &str, path: &Path) {
        self.frame_paths
            .entry(bucket.to_string())
            .or_default()
            .push(path.to_path_buf());
    }

    /// Frame identifier (or bucket name) to the files containing it
    pub fn frame_paths(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.frame_paths
    }

    pub fn paths_with(&self, id: &str) -> &[PathBuf] {
        self.frame_paths.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn durations(&self) -> &BTreeMap<PathBuf, u64> {
        &self.durations
    }

    /// One identifier per line, each followed by its files indented by a tab
    pub fn write_frames<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (id, paths) in &self.frame_paths {
            writeln!(writer, "{}", id)?;
            for path in paths {
                writeln!(writer, "\t{}", path.display())?;
            }
        }
        Ok(())
    }

    /// `path<TAB>duration_ms`, one file per line
    pub fn write_durations<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (path, duration) in &self.durations {
            writeln!(writer, "{}\t{}", path.display(), duration)?;
        }
        Ok(())
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = io::BufWriter::new(File::create(path)?);
        self.write_frames(&mut writer)?;
        writer.flush()
    }

    pub fn dump_durations(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = io::BufWriter::new(File::create(path)?);
        self.write_durations(&mut writer)?;
        writer.flush()
    }
}
