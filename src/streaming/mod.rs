//! Upstream SSE parsing
//!
//! Providers stream their partial results as Server-Sent Events. Network
//! chunks do not respect line (or even UTF-8 character) boundaries, so bytes
//! are accumulated here until whole lines are available.

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// # Example
/// ```
/// use llm_relay::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
///
/// assert!(buffer.feed(b"data: {\"delta\":\"hel").is_empty());
/// assert_eq!(buffer.feed(b"lo\"}\n\n"), vec!["data: {\"delta\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Bytes after the last newline seen so far
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete, non-blank lines.
    ///
    /// Line terminators (`\n` or `\r\n`) are stripped. Splitting happens on
    /// raw bytes so a multi-byte character cut across two chunks is decoded
    /// intact.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = decode_line(&raw[..raw.len() - 1]);
            if !line.is_empty() {
                lines.push(line);
            }
        }

        lines
    }

    /// Check if there's any incomplete data remaining in the buffer.
    pub fn has_incomplete(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain whatever trailing line the stream ended without terminating
    pub fn take_remaining(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        let line = decode_line(&raw);
        (!line.is_empty()).then_some(line)
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Payload of a `data:` field line, if the line is one
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:")
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest).trim_end())
}
