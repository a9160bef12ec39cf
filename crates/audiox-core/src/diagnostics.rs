//! Reduction of ffmpeg/ffprobe stderr to the lines worth showing a user

use regex::Regex;
use std::sync::LazyLock;

static BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+ version \S+").expect("valid banner regex"));

static ERROR_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)error|no such file|invalid|not found|unknown|unrecognized|failed|unable|cannot|could not|permission denied|not supported",
    )
    .expect("valid error marker regex")
});

/// Keep the version banner and the actual error lines of `stderr`.
///
/// Indented lines (configuration dumps, stream details, stack frames) and
/// `[component @ 0x…]` scoped log lines are dropped along with blank lines.
/// A trailing newline survives if anything was kept. Never fails; unknown
/// shapes reduce to an empty or partial string.
pub fn extract_error(stderr: &str) -> String {
    let mut seen_content = false;
    let mut kept: Vec<&str> = Vec::new();

    for line in stderr.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let first = !seen_content;
        seen_content = true;

        if first && BANNER.is_match(line) {
            kept.push(line);
            continue;
        }
        if line.starts_with(char::is_whitespace) || line.starts_with('[') {
            continue;
        }
        if ERROR_MARKER.is_match(line) {
            kept.push(line);
        }
    }

    let mut reduced = kept.join("\n");
    if !reduced.is_empty() && stderr.ends_with('\n') {
        reduced.push('\n');
    }
    reduced
}
