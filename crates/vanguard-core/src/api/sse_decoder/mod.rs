//! Buffered Server-Sent Events decoder for provider response bodies
//!
//! Network chunks rarely line up with event boundaries, and a multi-byte
//! UTF-8 character can be split between two chunks. The decoder keeps raw
//! bytes until a blank line terminates an event, then decodes that event as
//! a whole. Event delimiters are ASCII, so a complete event never ends in the
//! middle of a character.

mod event;

pub use event::SseEvent;

use tracing::warn;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = find_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + delimiter_len).take(end).collect();
            if let Some(event) = parse_event(&raw) {
                events.push(event);
            }
        }
        events
    }

    /// Dispatch a final event the body ended without terminating
    pub fn finish(&mut self) -> Option<SseEvent> {
        let raw = std::mem::take(&mut self.buffer);
        parse_event(&raw)
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Position and length of the first blank-line delimiter
fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|pos| (pos, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_event(raw: &[u8]) -> Option<SseEvent> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!("Invalid UTF-8 in SSE event at byte {}", e.valid_up_to());
            String::from_utf8_lossy(raw).into_owned()
        }
    };

    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        // Comment lines start with a colon
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event_type = Some(value.trim().to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}
