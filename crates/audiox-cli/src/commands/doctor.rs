use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use audiox_core::config::{Config, FFMPEG, FFPROBE};

pub async fn run(config: &Config) -> Result<()> {
    println!("audiox dependency check\n");

    let ffmpeg = check(FFMPEG, config.ffmpeg_path().ok()).await;
    let ffprobe = check(FFPROBE, config.ffprobe_path().ok()).await;

    println!();
    if ffmpeg && ffprobe {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}

async fn check(name: &str, path: Option<PathBuf>) -> bool {
    print!("{:<9}", format!("{}:", name));

    let Some(path) = path else {
        println!("NOT FOUND");
        println!("         Install with: brew install ffmpeg");
        return false;
    };

    match version(&path).await {
        Some(v) => {
            println!("OK ({}, {})", v, path.display());
            true
        }
        None => {
            println!("FOUND but failed to get version ({})", path.display());
            false
        }
    }
}

async fn version(path: &Path) -> Option<String> {
    let out = Command::new(path).arg("-version").output().await.ok()?;
    if !out.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    parse_version(stdout.lines().next()?)
}

/// `ffmpeg version 6.1.1 Copyright ...` -> `6.1.1`
fn parse_version(banner: &str) -> Option<String> {
    let mut words = banner.split_whitespace();
    words.next()?;
    (words.next()? == "version").then_some(())?;
    words.next().map(str::to_string)
}
