//! audiox-core: audio conversion and stream inspection on top of ffmpeg
//!
//! Every operation spawns one `ffmpeg` or `ffprobe` process; no audio is
//! decoded in-process.

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod options;
pub mod probe;
pub mod process;

pub use config::Config;
pub use convert::{
    audio, audio_wav, audio_with_stream_input, audio_with_stream_input_and_out,
    audio_with_stream_out, Converter,
};
pub use diagnostics::extract_error;
pub use error::{AudioxError, ProcessError, Result};
pub use options::{audio_args, ConversionOptions};
pub use probe::{audio_info, InfoOptions, Prober, StreamInfo};
pub use process::{BufferSink, StreamCallbacks, StreamSink};
