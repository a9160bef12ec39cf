use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audiox")]
#[command(author, version, about = "Audio conversion and inspection on top of ffmpeg")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an audio file
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file (defaults to the input name with a codec-derived extension)
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ConvertOptions,
    },

    /// Show audio stream information
    Info {
        /// Input file
        input: PathBuf,

        /// Comma-separated metadata tags to show (e.g. title,artist)
        #[arg(long, value_delimiter = ',')]
        metadata: Vec<String>,

        /// Print the streams as JSON
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the version
    Version,

    /// Generate shell completion
    Completion,

    /// Show configuration
    Config,

    /// Check that ffmpeg and ffprobe are installed
    Doctor,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ConvertOptions {
    /// Audio codec (e.g. aac, mp3, pcm_s16le)
    #[arg(long)]
    pub codec: Option<String>,

    /// Audio bitrate (e.g. 192k)
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Channel count or layout: mono, stereo, 5.1, 7.1
    #[arg(long, value_parser = parse_channels)]
    pub channels: Option<u32>,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Encoder quality (codec specific, e.g. 0-9 for mp3)
    #[arg(long)]
    pub quality: Option<f32>,

    /// Metadata as comma-separated key=value pairs
    #[arg(long, value_parser = parse_metadata)]
    pub metadata: Option<BTreeMap<String, String>>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Accepts a channel count or a named layout
pub fn parse_channels(value: &str) -> Result<u32, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mono" => Ok(1),
        "stereo" => Ok(2),
        "5.1" => Ok(6),
        "7.1" => Ok(8),
        other => match other.parse::<u32>() {
            Ok(0) | Err(_) => Err(format!(
                "invalid channel count '{value}' (expected a number, mono, stereo, 5.1 or 7.1)"
            )),
            Ok(n) => Ok(n),
        },
    }
}

/// `title=Song,artist=Someone`; pairs without a key or a value are dropped
pub fn parse_metadata(value: &str) -> Result<BTreeMap<String, String>, String> {
    Ok(value
        .split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect())
}
