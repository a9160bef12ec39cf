//! Subprocess plumbing shared by conversions and probes

use crate::diagnostics::extract_error;
use crate::error::ProcessError;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace};

/// Read size for streamed stdout; each read becomes one flushed chunk
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Receiver for output streamed from ffmpeg's stdout
pub trait StreamSink: Send {
    /// Called for every chunk, in the order ffmpeg produced the bytes
    fn on_data_flushed(&mut self, chunk: &[u8]);

    /// Called exactly once after the last chunk with all output bytes, or
    /// `None` when the process wrote nothing
    fn on_data_end(&mut self, data: Option<Vec<u8>>);
}

/// [`StreamSink`] built from two closures
pub struct StreamCallbacks<F, G> {
    on_flushed: F,
    on_end: Option<G>,
}

impl<F, G> StreamCallbacks<F, G>
where
    F: FnMut(&[u8]) + Send,
    G: FnOnce(Option<Vec<u8>>) + Send,
{
    pub fn new(on_flushed: F, on_end: G) -> Self {
        Self {
            on_flushed,
            on_end: Some(on_end),
        }
    }
}

impl<F, G> StreamSink for StreamCallbacks<F, G>
where
    F: FnMut(&[u8]) + Send,
    G: FnOnce(Option<Vec<u8>>) + Send,
{
    fn on_data_flushed(&mut self, chunk: &[u8]) {
        (self.on_flushed)(chunk)
    }

    fn on_data_end(&mut self, data: Option<Vec<u8>>) {
        if let Some(on_end) = self.on_end.take() {
            on_end(data)
        }
    }
}

/// [`StreamSink`] that keeps the final output in memory
#[derive(Debug, Default)]
pub struct BufferSink {
    chunks: usize,
    data: Option<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks flushed so far
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.unwrap_or_default()
    }
}

impl StreamSink for BufferSink {
    fn on_data_flushed(&mut self, _chunk: &[u8]) {
        self.chunks += 1;
    }

    fn on_data_end(&mut self, data: Option<Vec<u8>>) {
        self.data = data;
    }
}

/// Run `program` to completion, feeding `input` to its stdin and streaming its
/// stdout into `sink`. Stdin, stdout and stderr are pumped concurrently so
/// the child never blocks on a full pipe.
pub(crate) async fn run(
    program: &Path,
    args: &[OsString],
    input: Option<&mut (dyn AsyncRead + Unpin + Send)>,
    sink: Option<&mut dyn StreamSink>,
) -> Result<(), ProcessError> {
    debug!("Running: {} {}", program.display(), display_args(args));

    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(if sink.is_some() { Stdio::piped() } else { Stdio::null() })
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (fed, drained, diagnostics) = tokio::join!(
        feed(stdin, input),
        drain(stdout, sink),
        read_stderr(stderr),
    );
    let status = child.wait().await?;

    check_status(program, status, &diagnostics?)?;
    fed?;
    drained?;
    Ok(())
}

/// Run `program` without stdin and return everything it wrote to stdout
pub(crate) async fn run_captured(
    program: &Path,
    args: &[OsString],
) -> Result<Vec<u8>, ProcessError> {
    debug!("Running: {} {}", program.display(), display_args(args));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| spawn_error(program, e))?;

    check_status(program, output.status, &String::from_utf8_lossy(&output.stderr))?;
    Ok(output.stdout)
}

async fn feed(
    stdin: Option<ChildStdin>,
    input: Option<&mut (dyn AsyncRead + Unpin + Send)>,
) -> io::Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };

    let result = match tokio::io::copy(input, &mut stdin).await {
        Ok(bytes) => {
            trace!(bytes, "input stream exhausted");
            stdin.shutdown().await
        }
        Err(e) => Err(e),
    };

    // The child may stop reading before the input ends; its exit status
    // decides whether that was a failure.
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("stdin closed by child before end of input");
            Ok(())
        }
        other => other,
    }
}

async fn drain(stdout: Option<ChildStdout>, sink: Option<&mut dyn StreamSink>) -> io::Result<()> {
    let (Some(mut stdout), Some(sink)) = (stdout, sink) else {
        return Ok(());
    };

    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut accumulated = Vec::new();

    let result = loop {
        match stdout.read(&mut chunk).await {
            Ok(0) => break Ok(()),
            Ok(n) => {
                sink.on_data_flushed(&chunk[..n]);
                accumulated.extend_from_slice(&chunk[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(e),
        }
    };

    trace!(bytes = accumulated.len(), "output stream ended");
    sink.on_data_end((!accumulated.is_empty()).then_some(accumulated));
    result
}

async fn read_stderr(stderr: Option<ChildStderr>) -> io::Result<String> {
    let mut raw = Vec::new();
    if let Some(mut stderr) = stderr {
        stderr.read_to_end(&mut raw).await?;
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn check_status(program: &Path, status: ExitStatus, stderr: &str) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }

    let mut message = extract_error(stderr);
    if message.is_empty() {
        message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
    }
    debug!("{} exited with {}: {}", program.display(), status, message.trim_end());

    Err(ProcessError::Failed {
        program: program.to_path_buf(),
        code: status.code(),
        message,
    })
}

fn spawn_error(program: &Path, source: io::Error) -> ProcessError {
    if source.kind() == io::ErrorKind::NotFound {
        ProcessError::NotFound {
            program: program.to_path_buf(),
        }
    } else {
        ProcessError::Spawn {
            program: program.to_path_buf(),
            source,
        }
    }
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sh(script: &str) -> (std::path::PathBuf, Vec<OsString>) {
        ("sh".into(), vec!["-c".into(), script.into()])
    }

    #[test]
    fn test_callbacks_fire_end_once() {
        let ends = Arc::new(Mutex::new(Vec::new()));
        let seen = ends.clone();
        let mut flushed = 0;
        {
            let mut sink = StreamCallbacks::new(
                |_chunk: &[u8]| flushed += 1,
                move |data| seen.lock().unwrap().push(data),
            );
            sink.on_data_flushed(b"ab");
            sink.on_data_end(Some(b"ab".to_vec()));
            sink.on_data_end(None);
        }
        assert_eq!(flushed, 1);
        assert_eq!(*ends.lock().unwrap(), vec![Some(b"ab".to_vec())]);
    }

    #[tokio::test]
    async fn test_stream_roundtrip_through_cat() {
        let (program, args) = sh("cat");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut input: &[u8] = &payload;
        let mut sink = BufferSink::new();

        run(&program, &args, Some(&mut input), Some(&mut sink)).await.unwrap();

        assert!(sink.chunks() >= 1);
        assert_eq!(sink.into_inner(), payload);
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (program, args) = sh("printf one; sleep 0.1; printf two; sleep 0.1; printf three");
        let order = Arc::new(Mutex::new(Vec::new()));
        let chunks = order.clone();
        let end = Arc::new(Mutex::new(None));
        let end_slot = end.clone();

        let mut sink = StreamCallbacks::new(
            move |chunk: &[u8]| chunks.lock().unwrap().extend_from_slice(chunk),
            move |data| *end_slot.lock().unwrap() = Some(data),
        );
        run(&program, &args, None, Some(&mut sink)).await.unwrap();

        assert_eq!(order.lock().unwrap().as_slice(), b"onetwothree");
        assert_eq!(*end.lock().unwrap(), Some(Some(b"onetwothree".to_vec())));
    }

    #[tokio::test]
    async fn test_no_output_ends_with_none() {
        let (program, args) = sh("true");
        let mut sink = BufferSink::new();
        let end = Arc::new(Mutex::new(None));
        let end_slot = end.clone();
        let mut callbacks = StreamCallbacks::new(
            |_chunk: &[u8]| {},
            move |data| *end_slot.lock().unwrap() = Some(data),
        );

        run(&program, &args, None, Some(&mut sink)).await.unwrap();
        run(&program, &args, None, Some(&mut callbacks)).await.unwrap();

        assert_eq!(sink.chunks(), 0);
        assert!(sink.into_inner().is_empty());
        assert_eq!(*end.lock().unwrap(), Some(None));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_extracted_stderr() {
        let (program, args) =
            sh("echo 'tool version 1.0' >&2; echo '  noise' >&2; echo 'Error: bad input' >&2; exit 3");

        let err = run(&program, &args, None, None).await.unwrap_err();
        match err {
            ProcessError::Failed { code, message, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(message, "tool version 1.0\nError: bad input\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_stderr_falls_back_to_last_line() {
        let (program, args) = sh("echo 'something odd happened' >&2; exit 1");
        let err = run_captured(&program, &args).await.unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Failed { ref message, .. } if message == "something odd happened"
        ));
    }

    #[tokio::test]
    async fn test_child_closing_stdin_early_is_not_an_error() {
        let (program, args) = sh("head -c 10 > /dev/null");
        let payload = vec![7u8; 4 * CHUNK_SIZE];
        let mut input: &[u8] = &payload;

        run(&program, &args, Some(&mut input), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = run_captured(Path::new("audiox-no-such-binary"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_captured_stdout() {
        let (program, args) = sh("printf '{\"streams\":[]}'");
        let stdout = run_captured(&program, &args).await.unwrap();
        assert_eq!(stdout, b"{\"streams\":[]}");
    }
}
