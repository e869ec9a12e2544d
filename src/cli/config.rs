// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tagscout::ReadOptions;

/// Tagscout - audio tag and duration inspector
#[derive(Parser, Debug)]
#[command(name = "tagscout")]
#[command(about = "Read ID3v2 and FLAC tags and MPEG durations", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stop VBR duration scans after this many frames (0 = no limit)
    #[arg(long, global = true, value_name = "FRAMES")]
    pub max_vbr_frames: Option<u64>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Metadata fields to display (comma-separated)
        #[arg(long, value_name = "FIELDS")]
        fields: Option<String>,

        /// Include embedded pictures as base64
        #[arg(long)]
        images: bool,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect file format
    Detect {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show file information
    Info {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// List every frame or metadata block
        #[arg(short, long)]
        detailed: bool,
    },

    /// Export cover art
    ExportCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory for cover images
        #[arg(short, long)]
        output: PathBuf,

        /// Cover index (for files with multiple covers)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Scan a directory for MP3 and FLAC files
    Scan {
        /// Directory to scan recursively
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// Write the frame-to-files report here
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Write the file-to-duration report here
        #[arg(long)]
        durations: Option<PathBuf>,
    },
}

impl Config {
    /// Library read options derived from the global flags
    pub fn read_options(&self) -> ReadOptions {
        let mut options = ReadOptions::default();
        match self.max_vbr_frames {
            Some(0) => options.max_vbr_frames = None,
            Some(max) => options.max_vbr_frames = Some(max),
            None => {}
        }
        options
    }
}
