//! Server-Sent Events frame parsing.

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    /// Consecutive `data:` lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

/// Parse a block of SSE text into events.
///
/// Lines end with `\n` or `\r\n`. An event is dispatched at every blank line, and at the
/// end of the input if a `data` field is pending. Lines without a colon and comment lines
/// (leading `:`) are ignored, as are unknown field names.
///
/// The parser keeps no state between calls: callers reading from a socket must hold back
/// an incomplete trailing frame and prepend it to the next chunk.
pub fn parse_sse(input: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut pending = PendingEvent::default();

    for line in input.lines() {
        if line.is_empty() {
            if let Some(event) = pending.take() {
                events.push(event);
            }
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "data" => pending.push_data(value),
            "event" => pending.event = Some(value.to_string()),
            "id" => pending.id = Some(value.to_string()),
            _ => {}
        }
    }
    if let Some(event) = pending.take() {
        events.push(event);
    }
    events
}

#[derive(Default)]
struct PendingEvent {
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
}

impl PendingEvent {
    fn push_data(&mut self, value: &str) {
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_string()),
        }
    }

    /// Dispatch the accumulated fields; frames without `data` are discarded.
    fn take(&mut self) -> Option<SseEvent> {
        let pending = std::mem::take(self);
        pending.data.map(|data| SseEvent {
            event: pending.event,
            data,
            id: pending.id,
        })
    }
}

/// Byte offset just past the last blank line in `buf` whose final `\n` sits at or
/// after `from`, if any.
///
/// Everything before the offset consists of complete frames. Callers that already
/// scanned a prefix pass its length as `from`; the check still looks back across it,
/// so a `\n\n` or `\n\r\n` split over two reads is found.
pub(crate) fn last_frame_boundary(buf: &[u8], from: usize) -> Option<usize> {
    (from.max(1)..buf.len()).rev().find_map(|i| {
        if buf[i] != b'\n' {
            return None;
        }
        match buf[..i].last() {
            Some(b'\n') => Some(i + 1),
            Some(b'\r') if i >= 2 && buf[i - 2] == b'\n' => Some(i + 1),
            _ => None,
        }
    })
}
