//! Audio conversion using FFmpeg

use crate::config::{Config, FFMPEG};
use crate::error::{AudioxError, ProcessError, Result};
use crate::logging::DebugLog;
use crate::options::ConversionOptions;
use crate::process::{self, BufferSink, StreamSink};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tracing::warn;

const STDIN: &str = "pipe:0";
const STDOUT: &str = "pipe:1";

/// Container used whenever output goes to a stream
pub const STREAM_FORMAT: &str = "wav";

enum Source<'a> {
    File(&'a Path),
    Stdin,
}

enum Target<'a> {
    File(&'a Path),
    Stdout,
}

impl Source<'_> {
    fn describe(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Stdin => "input stream".to_string(),
        }
    }
}

impl Target<'_> {
    fn describe(&self) -> String {
        match self {
            Target::File(path) => path.display().to_string(),
            Target::Stdout => "output stream".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Converter {
    ffmpeg_path: PathBuf,
    log: DebugLog,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(PathBuf::from(FFMPEG))
    }
}

impl Converter {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            log: DebugLog::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.ffmpeg_path()?).with_log(DebugLog::from_config(config)))
    }

    pub fn with_log(mut self, log: DebugLog) -> Self {
        self.log = log;
        self
    }

    /// Convert the file at `input` into `output`, overwriting it
    pub async fn audio(
        &self,
        input: &Path,
        output: &Path,
        options: Option<&ConversionOptions>,
    ) -> Result<()> {
        let result = self
            .run(Source::File(input), Target::File(output), None, None, options)
            .await;
        settle(result, options)
    }

    /// Convert bytes read from `input` into the file at `output`
    pub async fn audio_with_stream_input<R>(
        &self,
        mut input: R,
        output: &Path,
        options: Option<&ConversionOptions>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = self
            .run(Source::Stdin, Target::File(output), Some(&mut input), None, options)
            .await;
        settle(result, options)
    }

    /// Convert the file at `input`, streaming WAV output into `output`
    pub async fn audio_with_stream_out<S>(
        &self,
        input: &Path,
        output: &mut S,
        options: Option<&ConversionOptions>,
    ) -> Result<()>
    where
        S: StreamSink,
    {
        let result = self
            .run(Source::File(input), Target::Stdout, None, Some(output), options)
            .await;
        settle(result, options)
    }

    /// Convert bytes read from `input`, streaming WAV output into `output`
    pub async fn audio_with_stream_input_and_out<R, S>(
        &self,
        mut input: R,
        output: &mut S,
        options: Option<&ConversionOptions>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        S: StreamSink,
    {
        let result = self
            .run(Source::Stdin, Target::Stdout, Some(&mut input), Some(output), options)
            .await;
        settle(result, options)
    }

    /// Re-encode an in-memory file as 16 kHz mono 16-bit PCM WAV
    pub async fn audio_wav(&self, buffer: &[u8]) -> Result<Vec<u8>> {
        let options = wav_options();
        let mut input = buffer;
        let mut sink = BufferSink::new();

        self.run(Source::Stdin, Target::Stdout, Some(&mut input), Some(&mut sink), Some(&options))
            .await?;
        Ok(sink.into_inner())
    }

    async fn run(
        &self,
        source: Source<'_>,
        target: Target<'_>,
        input: Option<&mut (dyn AsyncRead + Unpin + Send)>,
        sink: Option<&mut dyn StreamSink>,
        options: Option<&ConversionOptions>,
    ) -> std::result::Result<(), ProcessError> {
        let verbose = options.and_then(|o| o.verbose);
        self.log.log(
            "convert",
            &format!("Converting {} to {}", source.describe(), target.describe()),
            verbose,
        );

        let args = ffmpeg_args(&source, &target, options);
        process::run(&self.ffmpeg_path, &args, input, sink).await?;

        self.log.log("convert", "Conversion complete", verbose);
        Ok(())
    }
}

/// Options used by [`Converter::audio_wav`]
pub fn wav_options() -> ConversionOptions {
    ConversionOptions::new()
        .codec("pcm_s16le")
        .bitrate("128k")
        .channels(1)
        .sample_rate(16000)
}

fn ffmpeg_args(
    source: &Source<'_>,
    target: &Target<'_>,
    options: Option<&ConversionOptions>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into()];
    args.push(match source {
        Source::File(path) => (*path).into(),
        Source::Stdin => STDIN.into(),
    });

    args.extend(crate::options::audio_args(options).into_iter().map(OsString::from));
    args.push("-y".into());

    match target {
        Target::File(path) => args.push((*path).into()),
        Target::Stdout => args.extend(["-f".into(), STREAM_FORMAT.into(), STDOUT.into()]),
    }
    args
}

// A registered handler takes the error and the call reports success.
fn settle(
    result: std::result::Result<(), ProcessError>,
    options: Option<&ConversionOptions>,
) -> Result<()> {
    let Err(error) = result else {
        return Ok(());
    };
    let error = AudioxError::from(error);

    match options.and_then(|o| o.on_error.as_ref()) {
        Some(handler) => {
            warn!("Conversion failed, passing to error handler: {}", error);
            handler(&error);
            Ok(())
        }
        None => Err(error),
    }
}

/// Convert the file at `input` into `output` using `ffmpeg` from `PATH`
pub async fn audio(input: &Path, output: &Path, options: Option<&ConversionOptions>) -> Result<()> {
    Converter::default().audio(input, output, options).await
}

/// Convert bytes read from `input` into `output` using `ffmpeg` from `PATH`
pub async fn audio_with_stream_input<R>(
    input: R,
    output: &Path,
    options: Option<&ConversionOptions>,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    Converter::default()
        .audio_with_stream_input(input, output, options)
        .await
}

/// Convert `input` into a WAV stream using `ffmpeg` from `PATH`
pub async fn audio_with_stream_out<S>(
    input: &Path,
    output: &mut S,
    options: Option<&ConversionOptions>,
) -> Result<()>
where
    S: StreamSink,
{
    Converter::default()
        .audio_with_stream_out(input, output, options)
        .await
}

/// Convert a byte stream into a WAV stream using `ffmpeg` from `PATH`
pub async fn audio_with_stream_input_and_out<R, S>(
    input: R,
    output: &mut S,
    options: Option<&ConversionOptions>,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    S: StreamSink,
{
    Converter::default()
        .audio_with_stream_input_and_out(input, output, options)
        .await
}

/// Re-encode an in-memory file as 16 kHz mono WAV using `ffmpeg` from `PATH`
pub async fn audio_wav(buffer: &[u8]) -> Result<Vec<u8>> {
    Converter::default().audio_wav(buffer).await
}
