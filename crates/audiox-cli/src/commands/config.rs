use anyhow::Result;
use std::path::Path;

use audiox_core::config::{Config, LOCAL_CONFIG_FILE};

pub fn run(config: &Config, config_path: Option<&Path>) -> Result<()> {
    println!("audiox configuration\n");
    print!("{}", toml::to_string_pretty(config)?);

    println!("\n[resolved]");
    match config.ffmpeg_path() {
        Ok(p) => println!("  ffmpeg = {:?}", p),
        Err(_) => println!("  ffmpeg = (not found)"),
    }
    match config.ffprobe_path() {
        Ok(p) => println!("  ffprobe = {:?}", p),
        Err(_) => println!("  ffprobe = (not found)"),
    }

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    println!("  1. Environment variables (AUDIOX_*)");
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    println!("  3. ./{}", LOCAL_CONFIG_FILE);
    if let Some(p) = Config::user_config_path() {
        println!("  4. {}", p.display());
    }

    Ok(())
}
