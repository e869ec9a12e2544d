// CLI command implementations
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tagscout::field_mapping::StandardField;
use tagscout::scan::TagScout;
use tagscout::{AudioFile, CoverArt, Metadata, ReadOptions, Tag};

use super::output::OutputFormatter;

/// Metadata as a JSON object, optionally with the pictures inlined
fn metadata_json(metadata: &Metadata, covers: Option<&[CoverArt]>) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(metadata)?;
    if let (Some(covers), Some(obj)) = (covers, value.as_object_mut()) {
        let images = covers
            .iter()
            .map(|cover| -> Result<serde_json::Value> {
                let mut image = serde_json::to_value(cover)?;
                if let Some(image) = image.as_object_mut() {
                    image.insert("data".to_string(), STANDARD.encode(&cover.data).into());
                }
                Ok(image)
            })
            .collect::<Result<Vec<_>>>()?;
        obj.insert("images".to_string(), images.into());
    }
    Ok(value)
}

/// Parse a comma-separated field list such as "title,artist"
fn parse_fields(list: &str) -> Result<Vec<StandardField>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| StandardField::parse(name).with_context(|| format!("Unknown field: {}", name)))
        .collect()
}

/// Drop every field not in `fields`; the file type and any tag error stay
fn select_fields(value: &mut serde_json::Value, fields: &[StandardField]) {
    if let Some(obj) = value.as_object_mut() {
        obj.retain(|key, value| {
            key == "file_type"
                || (key == "tag_error" && !value.is_null())
                || fields.iter().any(|field| match field {
                    StandardField::Cover => key == "picture_count" || key == "images",
                    other => key == other.as_str(),
                })
        });
    }
}

fn finish(failures: usize, total: usize) -> Result<()> {
    if failures > 0 {
        bail!("{} of {} files failed", failures, total);
    }
    Ok(())
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}.{:03}", secs / 60, secs % 60, ms % 1000)
}

/// Read metadata from files
pub fn command_read(
    files: &[PathBuf],
    fields: Option<&str>,
    images: bool,
    output: Option<&Path>,
    options: &ReadOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    let fields = fields.map(parse_fields).transpose()?;
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    let mut failures = 0;
    for path in files {
        let result = read_one(path, images, options).and_then(|mut value| {
            if let Some(fields) = &fields {
                select_fields(&mut value, fields);
            }
            formatter.output_metadata(&value, &mut writer)?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                if let Some(error) = value.get("tag_error").and_then(|e| e.as_str()) {
                    formatter.print_error(&format!("{}: tag skipped: {}", path.display(), error));
                }
            }
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                failures += 1;
            }
        }
    }
    writer.flush()?;

    if let Some(path) = output {
        formatter.print_success(&format!("Wrote metadata to {}", path.display()));
    }
    finish(failures, files.len())
}

fn read_one(path: &Path, images: bool, options: &ReadOptions) -> Result<serde_json::Value> {
    let audio = AudioFile::new(path).with_context(|| format!("{}", path.display()))?;
    let metadata = audio
        .read_metadata(options)
        .with_context(|| format!("{}: cannot read metadata", path.display()))?;
    let covers = if images {
        // A broken tag already shows up as tag_error; report no pictures then
        Some(audio.extract_covers().unwrap_or_default())
    } else {
        None
    };
    metadata_json(&metadata, covers.as_deref())
}

/// Detect file format
pub fn command_detect(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    let mut failures = 0;
    for path in files {
        match AudioFile::new(path) {
            Ok(audio) => {
                let version = audio
                    .read_tag()
                    .ok()
                    .flatten()
                    .map(|tag| tag.format_name())
                    .unwrap_or_else(|| "N/A".to_string());
                println!("{}: {} (tag: {})", path.display(), audio.file_type(), version);
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
    }
    finish(failures, files.len())
}

/// Show file information
pub fn command_info(
    files: &[PathBuf],
    detailed: bool,
    options: &ReadOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut failures = 0;
    for path in files {
        if let Err(e) = info_one(path, detailed, options) {
            formatter.print_error(&format!("{:#}", e));
            failures += 1;
        }
    }
    finish(failures, files.len())
}

fn info_one(path: &Path, detailed: bool, options: &ReadOptions) -> Result<()> {
    let stat = std::fs::metadata(path).with_context(|| format!("{}", path.display()))?;
    let audio = AudioFile::new(path).with_context(|| format!("{}", path.display()))?;
    let metadata = audio.read_metadata(options)?;

    println!("\n📁 {}", path.display());
    println!("{}", "─".repeat(60));
    println!("Size: {} bytes", stat.len());
    if let Ok(modified) = stat.modified() {
        let date = chrono::DateTime::<chrono::Utc>::from(modified);
        println!("Modified: {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Format: {}", audio.file_type());
    if !metadata.version.is_empty() {
        println!("Tag: {}", metadata.version);
    }
    if let Some(error) = &metadata.tag_error {
        println!("Tag error: {}", error);
    }
    if let Some(duration) = metadata.duration_ms {
        println!("Duration: {}", format_duration(duration));
    }
    if let Some(rate) = metadata.sample_rate {
        println!("Sample rate: {} Hz", rate);
    }
    if let Some(channels) = metadata.channels {
        println!("Channels: {}", channels);
    }
    if let Some(bitrate) = metadata.bitrate {
        let mode = if metadata.vbr == Some(true) { "VBR" } else { "CBR" };
        println!("Bitrate: {} kbps ({})", bitrate, mode);
    }

    if detailed {
        println!("\nDetailed Information:");
        if let Some(tag) = audio.read_tag().ok().flatten() {
            for line in tag_details(&tag) {
                println!("  {}", line);
            }
        } else {
            println!("  No tag");
        }
    }
    Ok(())
}

fn field_label(tag: &Tag, key: &str) -> &'static str {
    tag.field_for(key).map(|field| field.as_str()).unwrap_or("-")
}

/// One line per frame or block with the field it maps to, then FLAC's
/// stream checksum and comments, then the pictures
fn tag_details(tag: &Tag) -> Vec<String> {
    let mut lines = Vec::new();
    for id in tag.frame_titles() {
        let sizes: Vec<String> = tag
            .frames_data(&id)
            .iter()
            .map(|data| data.len().to_string())
            .collect();
        let label = field_label(tag, &id);
        lines.push(format!("{:<16} {:<8} {} bytes", id, label, sizes.join(" + ")));
    }
    if let Tag::Flac(flac) = tag {
        lines.push(format!("MD5: {}", flac.stream_info().md5_hex()));
        for (key, value) in &flac.vorbis_comment().comments {
            lines.push(format!("{:<16} {:<8} {}", key, field_label(tag, key), value));
        }
    }
    lines.extend(tag.images().iter().map(ToString::to_string));
    lines
}

/// Export cover art
pub fn command_export_cover(
    file: &Path,
    output_dir: &Path,
    index: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let audio = AudioFile::new(file).with_context(|| format!("{}", file.display()))?;
    let covers = audio
        .extract_covers()
        .with_context(|| format!("{}: cannot read tag", file.display()))?;
    if covers.is_empty() {
        formatter.print_info(&format!("{}: no cover art", file.display()));
        return Ok(());
    }

    let selected: Vec<(usize, &CoverArt)> = match index {
        Some(i) => match covers.get(i) {
            Some(cover) => vec![(i, cover)],
            None => bail!("{}: cover index {} out of range ({} covers)", file.display(), i, covers.len()),
        },
        None => covers.iter().enumerate().collect(),
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());

    for (i, cover) in selected {
        let target = output_dir.join(format!("{}_{}.{}", stem, i, cover.get_extension()));
        cover
            .save(&target)
            .with_context(|| format!("Cannot write {}", target.display()))?;
        formatter.print_success(&format!("{} -> {}", cover, target.display()));
    }
    Ok(())
}

/// Scan a directory and report frames per file
pub fn command_scan(
    directory: &Path,
    dump: Option<&Path>,
    durations: Option<&Path>,
    options: &ReadOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !directory.is_dir() {
        bail!("Not a directory: {}", directory.display());
    }
    let scout = TagScout::scan_with(directory, options)
        .with_context(|| format!("Cannot scan {}", directory.display()))?;

    match dump {
        Some(path) => {
            scout
                .dump(path)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            formatter.print_success(&format!("Frame report written to {}", path.display()));
        }
        None => scout.write_frames(&mut std::io::stdout().lock())?,
    }

    if let Some(path) = durations {
        scout
            .dump_durations(path)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        formatter.print_success(&format!("Durations written to {}", path.display()));
    }

    formatter.print_info(&format!(
        "{} identifiers, {} files with a duration",
        scout.frame_paths().len(),
        scout.durations().len()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagscout::flac::FlacTag;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00.000");
        assert_eq!(format_duration(261_224), "4:21.224");
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(
            parse_fields("title, ARTIST,").unwrap(),
            vec![StandardField::Title, StandardField::Artist]
        );
        assert!(parse_fields("title,bpm").is_err());
    }

    #[test]
    fn test_select_fields_keeps_requested_keys() {
        let metadata = Metadata {
            file_type: "mp3".to_string(),
            title: Some("Song".to_string()),
            artist: Some("Band".to_string()),
            duration_ms: Some(1000),
            picture_count: 2,
            ..Metadata::default()
        };
        let covers: Vec<CoverArt> = Vec::new();
        let mut value = metadata_json(&metadata, Some(covers.as_slice())).unwrap();
        select_fields(&mut value, &[StandardField::Title, StandardField::Cover]);

        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["file_type", "images", "picture_count", "title"]);
        assert_eq!(value["title"], "Song");
    }

    #[test]
    fn test_tag_details_labels_flac_comments() {
        let mut streaminfo = vec![0u8; 34];
        streaminfo[10..13].copy_from_slice(&[0x0A, 0xC4, 0x42]);
        streaminfo[18] = 0xAB;
        let comment = b"tracknumber=7";
        let mut vorbis = 1u32.to_le_bytes().to_vec();
        vorbis.push(b'v');
        vorbis.extend_from_slice(&1u32.to_le_bytes());
        vorbis.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        vorbis.extend_from_slice(comment);

        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 34]);
        data.extend(streaminfo);
        data.extend_from_slice(&[0x84, 0x00, 0x00, vorbis.len() as u8]);
        data.extend(vorbis);

        let tag = Tag::Flac(FlacTag::read(&mut std::io::Cursor::new(data)).unwrap());
        let lines = tag_details(&tag);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("STREAMINFO       -        34 bytes"));
        assert!(lines[1].starts_with("VORBIS_COMMENT   -"));
        assert_eq!(lines[2], format!("MD5: ab{}", "0".repeat(30)));
        assert_eq!(lines[3], "tracknumber      track    7");
    }

    #[test]
    fn test_metadata_json_inlines_images() {
        let metadata = Metadata::default();
        let cover = CoverArt {
            mime_type: "image/png".to_string(),
            picture_type: "Cover (front)".to_string(),
            width: 1,
            height: 1,
            depth: 24,
            description: String::new(),
            data: b"abc".to_vec(),
        };

        let value = metadata_json(&metadata, Some(&[cover])).unwrap();
        assert_eq!(value["images"][0]["data"], "YWJj");
        assert_eq!(value["images"][0]["mime_type"], "image/png");

        let value = metadata_json(&metadata, None).unwrap();
        assert!(value.get("images").is_none());
    }
}
