//! Line splitter for `data: ` prefixed server-sent events

use super::CompletionError;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    // llama.cpp native /completion streams a bare `content` field
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    // Some servers send `text` instead of a delta on legacy completions
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Object { message: String },
    Text(String),
}

/// Buffers raw bytes until a full line is available. Chunk boundaries may fall anywhere,
/// including inside a multi-byte character.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, CompletionError> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8(line)?;
            if let Some(event) = parse_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, CompletionError> {
        if self.buf.is_empty() {
            return Ok(Vec::new());
        }
        let line = String::from_utf8(std::mem::take(&mut self.buf))?;
        Ok(parse_line(&line)?.into_iter().collect())
    }
}

fn parse_line(line: &str) -> Result<Option<SseEvent>, CompletionError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        // event:, id:, retry: carry nothing we use
        return Ok(None);
    };
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.trim() == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let payload: ChunkPayload = serde_json::from_str(data)?;
    if let Some(err) = payload.error {
        let message = match err {
            ErrorPayload::Object { message } => message,
            ErrorPayload::Text(message) => message,
        };
        return Err(CompletionError::Server(message));
    }

    let mut text = payload.content.unwrap_or_default();
    for choice in payload.choices {
        if let Some(content) = choice.delta.and_then(|d| d.content) {
            text.push_str(&content);
        } else if let Some(content) = choice.text {
            text.push_str(&content);
        }
    }
    Ok((!text.is_empty()).then_some(SseEvent::Delta(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo – wörld\"}}]}\r\n\r\n",
        "event: ping\n",
        "data: [DONE]\n\n",
    );

    fn collect(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.feed(chunk).unwrap());
        }
        out.extend(decoder.finish().unwrap());
        out
    }

    #[test]
    fn decodes_chat_completion_stream() {
        let events = collect(&[STREAM.as_bytes()]);
        assert_eq!(
            events,
            vec![
                SseEvent::Delta("Hel".into()),
                SseEvent::Delta("lo – wörld".into()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let whole = collect(&[STREAM.as_bytes()]);
        let bytes = STREAM.as_bytes();
        // Split every few bytes, which lands inside the multi-byte characters too
        for size in [1, 2, 3, 7, 64] {
            let pieces: Vec<&[u8]> = bytes.chunks(size).collect();
            assert_eq!(collect(&pieces), whole, "chunk size {size}");
        }
    }

    #[test]
    fn accepts_bare_content_and_unterminated_tail() {
        let events = collect(&[b"data: {\"content\":\"a\"}\ndata: {\"content\":\"b\"}"]);
        assert_eq!(
            events,
            vec![SseEvent::Delta("a".into()), SseEvent::Delta("b".into())]
        );
    }

    #[test]
    fn server_error_event_is_an_error() {
        let mut decoder = SseDecoder::new();
        let err = decoder
            .feed(b"data: {\"error\":{\"message\":\"model not loaded\"}}\n")
            .unwrap_err();
        assert!(matches!(err, CompletionError::Server(m) if m == "model not loaded"));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let mut decoder = SseDecoder::new();
        let err = decoder.feed(b"data: {not json\n").unwrap_err();
        assert!(matches!(err, CompletionError::Decode(_)));
    }
}
