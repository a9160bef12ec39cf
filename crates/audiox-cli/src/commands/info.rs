use anyhow::{Context, Result};
use std::fmt::Write;
use std::path::Path;

use audiox_core::{config::Config, InfoOptions, Prober, StreamInfo};

const SEPARATOR: &str = "----------------";

pub async fn run(
    input: &Path,
    metadata: Vec<String>,
    verbose: bool,
    json: bool,
    config: &Config,
) -> Result<()> {
    let prober = Prober::from_config(config)?;
    let options = InfoOptions {
        metadata_tags: metadata,
        verbose: verbose.then_some(true),
    };

    let streams = prober
        .audio_info(input, Some(&options))
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
    } else {
        print!("{}", render(&streams));
    }
    Ok(())
}

fn render(streams: &[StreamInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nAudio Information:");
    let _ = writeln!(out, "{}", SEPARATOR);

    for stream in streams {
        let _ = writeln!(out, "Codec: {}", stream.codec);
        let _ = writeln!(out, "Channels: {}", stream.channels);
        let _ = writeln!(out, "Sample Rate: {} Hz", stream.sample_rate);
        let _ = writeln!(out, "Bitrate: {}", kbps(&stream.bitrate));
        let _ = writeln!(out, "Duration: {}", seconds(&stream.duration));

        if let Some(metadata) = stream.metadata.as_ref().filter(|m| !m.is_empty()) {
            let _ = writeln!(out, "\nMetadata:");
            for (key, value) in metadata {
                let _ = writeln!(out, "{}: {}", key, value);
            }
        }
        let _ = writeln!(out, "{}", SEPARATOR);
    }
    out
}

fn kbps(bitrate: &str) -> String {
    match bitrate.parse::<f64>() {
        Ok(bps) => format!("{}k", (bps / 1000.0).round()),
        Err(_) => bitrate.to_string(),
    }
}

fn seconds(duration: &str) -> String {
    match duration.parse::<f64>() {
        Ok(secs) => format!("{}s", (secs * 100.0).round() / 100.0),
        Err(_) => duration.to_string(),
    }
}
