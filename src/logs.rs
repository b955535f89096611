//! Demultiplexing of the Docker combined log stream.
//!
//! When a container runs without a TTY the daemon interleaves stdout and
//! stderr into one byte stream of framed records: an 8-byte header (stream
//! tag, 3 reserved bytes, big-endian u32 payload length) followed by the
//! payload. This module splits that stream back into discrete entries and
//! offers a masking pass for sensitive key=value material.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const HEADER_LEN: usize = 8;
const REDACTION_MARKER: &str = "[MASKED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub stream: StreamKind,
    pub message: String,
}

fn timestamp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+Z) ")
            .expect("timestamp pattern is valid")
    })
}

fn sensitive_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)password\s*[:=]\s*\S+",
            r"(?i)api[_-]?key\s*[:=]\s*\S+",
            r"(?i)secret\s*[:=]\s*\S+",
            r"(?i)token\s*[:=]\s*\S+",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("sensitive pattern is valid"))
        .collect()
    })
}

/// Splits a raw multiplexed buffer into ordered log entries.
///
/// Decoding stops without error at the first incomplete frame: a tail of
/// fewer than 8 bytes, or a header whose declared payload length runs past
/// the end of the buffer. Entries parsed up to that point are returned.
pub fn parse_log_stream(buffer: &[u8], timestamps: bool) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while buffer.len() - offset >= HEADER_LEN {
        let stream = if buffer[offset] == 1 {
            StreamKind::Stdout
        } else {
            StreamKind::Stderr
        };
        let len = u32::from_be_bytes([
            buffer[offset + 4],
            buffer[offset + 5],
            buffer[offset + 6],
            buffer[offset + 7],
        ]) as usize;
        let payload_start = offset + HEADER_LEN;
        if len > buffer.len() - payload_start {
            break;
        }
        entries.push(entry_from_frame(
            stream,
            &buffer[payload_start..payload_start + len],
            timestamps,
        ));
        offset = payload_start + len;
    }

    entries
}

/// Builds one entry from a single frame payload.
///
/// Shared between the raw-buffer decoder above and the bollard log stream,
/// which delivers frames already split. When `timestamps` is set, a leading
/// RFC3339 prefix followed by one space is lifted into the timestamp field.
/// Only trailing whitespace is trimmed so indentation in multi-line
/// messages survives.
pub fn entry_from_frame(stream: StreamKind, payload: &[u8], timestamps: bool) -> LogEntry {
    let text = String::from_utf8_lossy(payload);
    let mut timestamp = None;
    let mut message: &str = &text;
    if timestamps {
        if let Some(caps) = timestamp_pattern().captures(&text) {
            timestamp = Some(caps[1].to_string());
            message = &text[caps[0].len()..];
        }
    }
    LogEntry {
        timestamp,
        stream,
        message: message.trim_end().to_string(),
    }
}

/// Replaces password/api-key/secret/token key-value substrings with a fixed
/// redaction marker.
pub fn mask_text(text: &str) -> String {
    sensitive_patterns().iter().fold(text.to_string(), |masked, pattern| {
        pattern.replace_all(&masked, REDACTION_MARKER).into_owned()
    })
}

/// Derives masked copies of the given entries; stream and timestamp fields
/// are left untouched.
pub fn mask_entries(entries: &[LogEntry]) -> Vec<LogEntry> {
    entries
        .iter()
        .map(|entry| LogEntry {
            message: mask_text(&entry.message),
            ..entry.clone()
        })
        .collect()
}
