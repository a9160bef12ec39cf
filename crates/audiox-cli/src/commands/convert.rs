use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::args::ConvertOptions;
use audiox_core::{config::Config, ConversionOptions, Converter};

pub async fn run(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
    config: &Config,
) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, options.codec.as_deref()));

    let converter = Converter::from_config(config)?;
    let conversion = conversion_options(options);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Converting {}...", input.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = converter
        .audio(input, &output, Some(&conversion))
        .await
        .with_context(|| format!("Failed to convert {}", input.display()));

    match result {
        Ok(()) => {
            pb.finish_with_message(format!("Converted {} -> {}", input.display(), output.display()));
            Ok(())
        }
        Err(e) => {
            pb.finish_and_clear();
            Err(e)
        }
    }
}

fn conversion_options(options: &ConvertOptions) -> ConversionOptions {
    ConversionOptions {
        codec: options.codec.clone(),
        bitrate: options.bitrate.clone(),
        channels: options.channels,
        sample_rate: options.sample_rate,
        quality: options.quality,
        metadata: options.metadata.clone().unwrap_or_default(),
        verbose: options.verbose.then_some(true),
        on_error: None,
    }
}

/// Input path with its extension replaced by one matching `codec`
fn default_output(input: &Path, codec: Option<&str>) -> PathBuf {
    input.with_extension(extension_for(codec))
}

fn extension_for(codec: Option<&str>) -> &'static str {
    match codec {
        Some("aac") => "aac",
        Some("mp3") => "mp3",
        Some("pcm_s16le") => "wav",
        _ => "wav",
    }
}
