//! Chat-completions request building and the streaming read loop

use super::sse::{SseDecoder, SseEvent};
use super::CompletionError;
use crate::constants::STREAM_REPAINT_MS;
use crate::graph::Node;
use crate::types::*;
use crate::utils::lock_ignore_poison as lock;
use eframe::egui;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Transcript for a request: system prompt first, then the path root -> leaf.
pub fn build_messages(system_prompt: &str, ancestry: &[&Node]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(ancestry.len() + 1);
    if !system_prompt.trim().is_empty() {
        messages.push(ChatMessage {
            role: Author::System.role(),
            content: system_prompt.trim().to_string(),
        });
    }
    messages.extend(
        ancestry
            .iter()
            .filter(|n| !n.text.trim().is_empty())
            .map(|n| ChatMessage {
                role: n.author.role(),
                content: n.text.clone(),
            }),
    );
    messages
}

/// Read an event stream to the end, `[DONE]`, or cancellation.
/// Returns false if cancelled.
pub(crate) async fn consume_event_stream<S, B, E>(
    stream: S,
    token: &CancellationToken,
    mut on_delta: impl FnMut(&str),
) -> Result<bool, CompletionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();
    loop {
        let chunk = tokio::select! {
            _ = token.cancelled() => return Ok(false),
            chunk = stream.next() => chunk,
        };
        let (events, eof) = match chunk {
            Some(Ok(bytes)) => (decoder.feed(bytes.as_ref())?, false),
            Some(Err(e)) => return Err(CompletionError::Stream(e.to_string())),
            None => (decoder.finish()?, true),
        };
        for event in events {
            match event {
                SseEvent::Delta(text) => on_delta(&text),
                SseEvent::Done => return Ok(true),
            }
        }
        if eof {
            return Ok(true);
        }
    }
}

/// POST the request and feed every text delta to `on_delta`.
pub async fn stream_completion(
    client: &reqwest::Client,
    endpoint: &str,
    request: &CompletionRequest,
    token: &CancellationToken,
    on_delta: impl FnMut(&str),
) -> Result<bool, CompletionError> {
    let send = client
        .post(endpoint)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .json(request)
        .send();
    // The server may sit on the headers while it loads the model
    let response = tokio::select! {
        _ = token.cancelled() => return Ok(false),
        response = send => response?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            _ = token.cancelled() => return Ok(false),
            body = response.text() => body.unwrap_or_default(),
        };
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }

    consume_event_stream(response.bytes_stream(), token, on_delta).await
}

/// Task body for one assistant node: streams into `state` and repaints the UI.
pub async fn run_completion(
    node: NodeId,
    endpoint: String,
    request: CompletionRequest,
    state: Arc<Mutex<StreamState>>,
    client: reqwest::Client,
    ctx: egui::Context,
    token: CancellationToken,
) {
    info!(
        node = %node,
        endpoint = %endpoint,
        model = %request.model,
        messages = request.messages.len(),
        "Starting completion"
    );

    lock(&state).streams.entry(node).or_default().status = StreamStatus::Connecting;
    ctx.request_repaint();

    let started = Instant::now();
    let mut last_repaint = Instant::now();
    let result = stream_completion(&client, &endpoint, &request, &token, |text| {
        {
            let mut s = lock(&state);
            let progress = s.streams.entry(node).or_default();
            progress.status = StreamStatus::Streaming;
            progress.pending.push_str(text);
            progress.received_chars += text.chars().count();
        }
        if last_repaint.elapsed() >= Duration::from_millis(STREAM_REPAINT_MS) {
            ctx.request_repaint();
            last_repaint = Instant::now();
        }
    })
    .await;

    let status = match result {
        Ok(true) => StreamStatus::Complete,
        Ok(false) => StreamStatus::Cancelled,
        Err(e) => {
            warn!(node = %node, error = %e, "Completion failed");
            StreamStatus::Failed(e.to_string())
        }
    };

    {
        let mut s = lock(&state);
        let progress = s.streams.entry(node).or_default();
        debug!(
            node = %node,
            chars = progress.received_chars,
            elapsed_ms = started.elapsed().as_millis() as u64,
            status = ?status,
            "Completion finished"
        );
        progress.status = status;
    }
    ctx.request_repaint();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChatGraph;
    use egui::Pos2;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn test_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "local".into(),
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".into(),
            }],
            stream: true,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Read one HTTP request (headers plus Content-Length body) off the socket
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Loopback server answering a single request with a canned response.
    /// The join handle yields the raw request it received.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let received = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            received
        });
        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    /// Loopback server that accepts the request and never answers
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });
        format!("http://{addr}/v1/chat/completions")
    }

    const SSE_OK: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/event-stream\r\n\
        Connection: close\r\n\r\n\
        data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
        data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
        data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n\
        data: [DONE]\n\n";

    const SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\n\
        Content-Type: text/plain\r\n\
        Content-Length: 16\r\n\
        Connection: close\r\n\r\n\
        model not found\n";

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        let owned: Vec<Result<Vec<u8>, std::io::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(owned)
    }

    #[test]
    fn messages_follow_ancestry_with_system_prompt() {
        let mut g = ChatGraph::new();
        let q = g.add_node(Author::User, "What is 2+2?", None, Pos2::ZERO).unwrap();
        let a = g.add_node(Author::Assistant, "4", Some(q), Pos2::ZERO).unwrap();
        let empty = g.add_node(Author::User, "   ", Some(a), Pos2::ZERO).unwrap();
        let path = g.ancestry(empty).unwrap();

        let msgs = build_messages("Be brief.", &path);
        let roles: Vec<&str> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(msgs[2].content, "4");

        assert_eq!(build_messages("  ", &path).len(), 2);
    }

    #[test]
    fn request_serializes_as_chat_completion() {
        let req = CompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".into(),
            }],
            stream: true,
            temperature: 0.5,
            max_tokens: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn consumes_until_done() {
        let token = CancellationToken::new();
        let mut text = String::new();
        let stream = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\nda",
            "ta: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]);
        let finished = consume_event_stream(stream, &token, |t| text.push_str(t))
            .await
            .unwrap();
        assert!(finished);
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn end_of_body_without_done_still_completes() {
        let token = CancellationToken::new();
        let mut text = String::new();
        let stream = chunks(&["data: {\"content\":\"partial\"}"]);
        let finished = consume_event_stream(stream, &token, |t| text.push_str(t))
            .await
            .unwrap();
        assert!(finished);
        assert_eq!(text, "partial");
    }

    #[tokio::test]
    async fn cancelled_token_stops_reading() {
        let token = CancellationToken::new();
        token.cancel();
        let stream = futures::stream::pending::<Result<Vec<u8>, std::io::Error>>();
        let finished = consume_event_stream(stream, &token, |_| {}).await.unwrap();
        assert!(!finished);
    }

    #[tokio::test]
    async fn transport_error_is_reported() {
        let token = CancellationToken::new();
        let stream = futures::stream::iter(vec![
            Ok(b"data: {\"content\":\"a\"}\n".to_vec()),
            Err(std::io::Error::other("connection reset")),
        ]);
        let err = consume_event_stream(stream, &token, |_| {}).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn posts_json_and_streams_deltas() {
        let (endpoint, server) = serve_once(SSE_OK).await;
        let token = CancellationToken::new();
        let mut text = String::new();
        let finished = stream_completion(&test_client(), &endpoint, &request(), &token, |t| {
            text.push_str(t)
        })
        .await
        .unwrap();
        assert!(finished);
        assert_eq!(text, "Hi there");

        let received = server.await.unwrap().to_ascii_lowercase();
        assert!(received.starts_with("post /v1/chat/completions "));
        assert!(received.contains("accept: text/event-stream"));
        assert!(received.contains("content-type: application/json"));
        assert!(received.contains("\"stream\":true"));
        assert!(received.contains("\"model\":\"local\""));
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let (endpoint, _server) = serve_once(SERVER_ERROR).await;
        let token = CancellationToken::new();
        let err = stream_completion(&test_client(), &endpoint, &request(), &token, |_| {})
            .await
            .unwrap_err();
        match err {
            CompletionError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_headers() {
        let endpoint = serve_silence().await;
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            stream_completion(&test_client(), &endpoint, &request(), &token, |_| {}),
        )
        .await
        .expect("cancellation must interrupt a pending request");
        assert!(!result.unwrap());
    }

    async fn run_to_end(endpoint: String, token: CancellationToken) -> StreamProgress {
        let state = Arc::new(Mutex::new(StreamState::default()));
        let node = NodeId(7);
        run_completion(
            node,
            endpoint,
            request(),
            state.clone(),
            test_client(),
            egui::Context::default(),
            token,
        )
        .await;
        let mut s = lock(&state);
        s.streams.remove(&node).unwrap()
    }

    #[tokio::test]
    async fn run_completion_records_complete_stream() {
        let (endpoint, _server) = serve_once(SSE_OK).await;
        let progress = run_to_end(endpoint, CancellationToken::new()).await;
        assert_eq!(progress.status, StreamStatus::Complete);
        assert_eq!(progress.pending, "Hi there");
        assert_eq!(progress.received_chars, 8);
    }

    #[tokio::test]
    async fn run_completion_records_failure() {
        let (endpoint, _server) = serve_once(SERVER_ERROR).await;
        let progress = run_to_end(endpoint, CancellationToken::new()).await;
        match progress.status {
            StreamStatus::Failed(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("model not found"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(progress.pending.is_empty());
    }

    #[tokio::test]
    async fn run_completion_records_cancellation() {
        let endpoint = serve_silence().await;
        let token = CancellationToken::new();
        token.cancel();
        let progress = tokio::time::timeout(Duration::from_secs(3), run_to_end(endpoint, token))
            .await
            .unwrap();
        assert_eq!(progress.status, StreamStatus::Cancelled);
    }
}
