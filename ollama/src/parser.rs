use serde_json::Value as JsonValue;

/// One decoded line of the `/api/generate` NDJSON stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GenerateEvent {
    Chunk(String),
    Done,
    Error(String),
}

/// Convert a single JSON object from the generate stream into events. A line
/// may carry a final chunk and the `done` marker at once.
pub(crate) fn generate_events_from_value(value: &JsonValue) -> Vec<GenerateEvent> {
    let mut events = Vec::new();
    if let Some(err) = value.get("error").and_then(JsonValue::as_str) {
        events.push(GenerateEvent::Error(err.to_string()));
        return events;
    }
    if let Some(chunk) = value.get("response").and_then(JsonValue::as_str)
        && !chunk.is_empty()
    {
        events.push(GenerateEvent::Chunk(chunk.to_string()));
    }
    if value.get("done").and_then(JsonValue::as_bool) == Some(true) {
        events.push(GenerateEvent::Done);
    }
    events
}

/// Split complete lines off the front of `buf`, leaving any partial line in
/// place for the next network read.
pub(crate) fn drain_complete_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buf.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if !text.is_empty() {
            lines.push(text.to_string());
        }
    }
    lines
}
