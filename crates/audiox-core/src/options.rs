//! Conversion options and their mapping onto ffmpeg arguments

use crate::error::AudioxError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Receives a conversion failure in place of the returned error
pub type ErrorHandler = Arc<dyn Fn(&AudioxError) + Send + Sync>;

/// Output settings for a conversion. Every field is optional; unset fields
/// leave the choice to ffmpeg.
#[derive(Clone, Default)]
pub struct ConversionOptions {
    /// Audio codec, e.g. `aac`, `mp3`, `pcm_s16le`
    pub codec: Option<String>,
    /// Bitrate as ffmpeg accepts it, e.g. `192k`
    pub bitrate: Option<String>,
    pub channels: Option<u32>,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Codec-specific quality level (`-q:a`), e.g. 0-9 for MP3 VBR
    pub quality: Option<f32>,
    /// Container tags written with `-metadata key=value`
    pub metadata: BTreeMap<String, String>,
    /// Per-call logging override, see [`crate::logging::DebugLog::level`]
    pub verbose: Option<bool>,
    /// When set, failures are handed to this handler and the call returns `Ok`
    pub on_error: Option<ErrorHandler>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    pub fn channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&AudioxError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// ffmpeg arguments for these options, see [`audio_args`]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref codec) = self.codec {
            args.extend(["-acodec".to_string(), codec.clone()]);
        }
        if let Some(ref bitrate) = self.bitrate {
            args.extend(["-b:a".to_string(), bitrate.clone()]);
        }
        if let Some(channels) = self.channels {
            args.extend(["-ac".to_string(), channels.to_string()]);
        }
        if let Some(sample_rate) = self.sample_rate {
            args.extend(["-ar".to_string(), sample_rate.to_string()]);
        }
        if let Some(quality) = self.quality {
            args.extend(["-q:a".to_string(), quality.to_string()]);
        }
        for (key, value) in &self.metadata {
            args.extend(["-metadata".to_string(), format!("{}={}", key, value)]);
        }

        args
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("codec", &self.codec)
            .field("bitrate", &self.bitrate)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("quality", &self.quality)
            .field("metadata", &self.metadata)
            .field("verbose", &self.verbose)
            .field("on_error", &self.on_error.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

/// Map options onto ffmpeg arguments.
///
/// Each set field becomes a flag/value pair, always in the order codec,
/// bitrate, channels, sample rate, quality, then one `-metadata` pair per tag
/// in key order. `None` maps to no arguments.
pub fn audio_args(options: Option<&ConversionOptions>) -> Vec<String> {
    options.map(ConversionOptions::to_args).unwrap_or_default()
}
