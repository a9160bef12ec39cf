//! Audio stream inspection using ffprobe

use crate::config::{Config, FFPROBE};
use crate::error::{AudioxError, Result};
use crate::logging::DebugLog;
use crate::process;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Placeholder ffprobe itself prints for values it cannot determine
pub const NOT_AVAILABLE: &str = "N/A";

const STREAM_ENTRIES: &str = "stream=codec_name,channels,sample_rate,bit_rate,duration";
// Container values backfill streams that do not report their own
const FORMAT_ENTRIES: &str = "format=duration,bit_rate";

/// One audio stream as reported by ffprobe.
///
/// Sample rate, bitrate and duration keep ffprobe's textual form; parse them
/// as needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub codec: String,
    pub channels: u32,
    pub sample_rate: String,
    pub bitrate: String,
    pub duration: String,
    /// Requested tags that were present; `None` when no tags were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default)]
pub struct InfoOptions {
    /// Tag names to report, e.g. `title`, `artist`
    pub metadata_tags: Vec<String>,
    pub verbose: Option<bool>,
}

impl InfoOptions {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metadata_tags: tags.into_iter().map(Into::into).collect(),
            verbose: None,
        }
    }

    fn tags(&self) -> Vec<&str> {
        self.metadata_tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe_path: PathBuf,
    log: DebugLog,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(PathBuf::from(FFPROBE))
    }
}

impl Prober {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            log: DebugLog::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.ffprobe_path()?).with_log(DebugLog::from_config(config)))
    }

    pub fn with_log(mut self, log: DebugLog) -> Self {
        self.log = log;
        self
    }

    /// Describe every audio stream in `input`
    pub async fn audio_info(
        &self,
        input: &Path,
        options: Option<&InfoOptions>,
    ) -> Result<Vec<StreamInfo>> {
        let tags = options.map(InfoOptions::tags).unwrap_or_default();
        let verbose = options.and_then(|o| o.verbose);

        self.log.log(
            "probe",
            &format!("Probing {}", input.display()),
            verbose,
        );

        let args = probe_args(input, &tags);
        let stdout = process::run_captured(&self.ffprobe_path, &args).await?;
        let streams = parse_probe_output(&String::from_utf8_lossy(&stdout), &tags)?;

        debug!("Found {} audio stream(s) in {}", streams.len(), input.display());
        Ok(streams)
    }
}

/// Describe every audio stream in `input` using `ffprobe` from `PATH`
pub async fn audio_info(input: &Path, options: Option<&InfoOptions>) -> Result<Vec<StreamInfo>> {
    Prober::default().audio_info(input, options).await
}

fn probe_args(input: &Path, tags: &[&str]) -> Vec<OsString> {
    let mut entries = format!("{}:{}", STREAM_ENTRIES, FORMAT_ENTRIES);
    if !tags.is_empty() {
        let list = tags.join(",");
        entries.push_str(&format!(":stream_tags={}:format_tags={}", list, list));
    }

    let mut args: Vec<OsString> = ["-v", "error", "-select_streams", "a", "-show_entries"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(entries.into());
    args.extend(["-of".into(), "json".into()]);
    args.push(input.into());
    args
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Parse `ffprobe -of json` output into stream records.
///
/// With `tags` non-empty, each record's metadata holds those of the requested
/// tags present on the container or, failing that, the stream, matched
/// case-insensitively and keyed by the requested spelling.
pub(crate) fn parse_probe_output(json: &str, tags: &[&str]) -> Result<Vec<StreamInfo>> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| AudioxError::ProbeParse(e.to_string()))?;

    probe
        .streams
        .into_iter()
        .enumerate()
        .map(|(index, stream)| {
            let codec = stream.codec_name.ok_or_else(|| {
                AudioxError::ProbeParse(format!("stream {} has no codec_name", index))
            })?;
            let channels = stream.channels.ok_or_else(|| {
                AudioxError::ProbeParse(format!("stream {} has no channel count", index))
            })?;

            let metadata = (!tags.is_empty())
                .then(|| select_tags(tags, &stream.tags, &probe.format.tags));

            Ok(StreamInfo {
                codec,
                channels,
                sample_rate: or_not_available(stream.sample_rate),
                bitrate: or_not_available(stream.bit_rate.or_else(|| probe.format.bit_rate.clone())),
                duration: or_not_available(stream.duration.or_else(|| probe.format.duration.clone())),
                metadata,
            })
        })
        .collect()
}

fn select_tags(
    requested: &[&str],
    stream_tags: &HashMap<String, String>,
    format_tags: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    requested
        .iter()
        .filter_map(|&name| {
            find_tag(format_tags, name)
                .or_else(|| find_tag(stream_tags, name))
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn find_tag<'a>(tags: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    tags.get(name)
        .or_else(|| {
            tags.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

fn or_not_available(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAV_PROBE: &str = r#"{
        "programs": [],
        "streams": [
            {
                "codec_name": "pcm_s16le",
                "sample_rate": "16000",
                "channels": 1,
                "bit_rate": "256000",
                "duration": "12.312000"
            }
        ]
    }"#;

    const MP3_PROBE: &str = r#"{
        "programs": [],
        "streams": [
            {
                "codec_name": "mp3",
                "sample_rate": "44100",
                "channels": 2,
                "bit_rate": "192000",
                "duration": "12.355918",
                "tags": { "encoder": "Lavc60.31" }
            }
        ],
        "format": {
            "tags": {
                "title": "track title",
                "artist": "track artist",
                "encoder": "Lavf60.16.100"
            }
        }
    }"#;

    #[test]
    fn test_parse_without_tags() {
        let streams = parse_probe_output(WAV_PROBE, &[]).unwrap();
        assert_eq!(
            streams,
            vec![StreamInfo {
                codec: "pcm_s16le".to_string(),
                channels: 1,
                sample_rate: "16000".to_string(),
                bitrate: "256000".to_string(),
                duration: "12.312000".to_string(),
                metadata: None,
            }]
        );
    }

    #[test]
    fn test_requested_tags_only() {
        let streams = parse_probe_output(MP3_PROBE, &["title", "album", "encoder"]).unwrap();
        let metadata = streams[0].metadata.as_ref().unwrap();

        assert_eq!(metadata.get("title").map(String::as_str), Some("track title"));
        // container-level tag wins over the stream's
        assert_eq!(metadata.get("encoder").map(String::as_str), Some("Lavf60.16.100"));
        assert!(!metadata.contains_key("album"));
        assert!(!metadata.contains_key("artist"));
    }

    #[test]
    fn test_tag_names_match_case_insensitively() {
        let json = r#"{"streams":[{"codec_name":"flac","channels":2,"sample_rate":"48000",
            "tags":{"TITLE":"Loud","ARTIST":"Someone"}}],
            "format":{"duration":"3.000000","bit_rate":"812345"}}"#;

        let streams = parse_probe_output(json, &["title", "Artist"]).unwrap();
        let metadata = streams[0].metadata.clone().unwrap();
        assert_eq!(metadata.get("title").map(String::as_str), Some("Loud"));
        assert_eq!(metadata.get("Artist").map(String::as_str), Some("Someone"));
    }

    #[test]
    fn test_container_fallbacks() {
        let json = r#"{"streams":[{"codec_name":"flac","channels":2,"sample_rate":"48000"}],
            "format":{"duration":"3.000000","bit_rate":"812345"}}"#;

        let stream = &parse_probe_output(json, &[]).unwrap()[0];
        assert_eq!(stream.duration, "3.000000");
        assert_eq!(stream.bitrate, "812345");

        let json = r#"{"streams":[{"codec_name":"opus","channels":2}]}"#;
        let stream = &parse_probe_output(json, &[]).unwrap()[0];
        assert_eq!(stream.sample_rate, NOT_AVAILABLE);
        assert_eq!(stream.bitrate, NOT_AVAILABLE);
        assert_eq!(stream.duration, NOT_AVAILABLE);
    }

    #[test]
    fn test_requested_tags_missing_everywhere() {
        let streams = parse_probe_output(WAV_PROBE, &["title"]).unwrap();
        assert_eq!(streams[0].metadata, Some(BTreeMap::new()));
    }

    #[test]
    fn test_no_streams() {
        assert!(parse_probe_output("{}", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            parse_probe_output("not json", &[]),
            Err(AudioxError::ProbeParse(_))
        ));
        assert!(matches!(
            parse_probe_output(r#"{"streams":[{"channels":2}]}"#, &[]),
            Err(AudioxError::ProbeParse(_))
        ));
        assert!(matches!(
            parse_probe_output(r#"{"streams":[{"codec_name":"mp3"}]}"#, &[]),
            Err(AudioxError::ProbeParse(_))
        ));
    }

    #[test]
    fn test_probe_args() {
        let args = probe_args(Path::new("in.mp3"), &[]);
        assert_eq!(
            args,
            [
                "-v",
                "error",
                "-select_streams",
                "a",
                "-show_entries",
                "stream=codec_name,channels,sample_rate,bit_rate,duration:format=duration,bit_rate",
                "-of",
                "json",
                "in.mp3"
            ]
            .map(OsString::from)
        );

        let args = probe_args(Path::new("in.mp3"), &["title", "artist"]);
        assert_eq!(
            args[5],
            OsString::from(
                "stream=codec_name,channels,sample_rate,bit_rate,duration:format=duration,bit_rate\
                 :stream_tags=title,artist:format_tags=title,artist"
            )
        );
    }

    #[test]
    fn test_blank_tag_names_ignored() {
        let options = InfoOptions::with_tags([" title ", "", "  "]);
        assert_eq!(options.tags(), vec!["title"]);
        assert!(InfoOptions::default().tags().is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let stream = &parse_probe_output(WAV_PROBE, &[]).unwrap()[0];
        let json = serde_json::to_value(stream).unwrap();
        assert_eq!(json["sampleRate"], "16000");
        assert!(json.get("metadata").is_none());
    }
}
