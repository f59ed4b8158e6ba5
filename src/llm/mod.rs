//! Local language-model server: request building and streamed responses

mod client;
mod sse;

pub use client::{build_messages, run_completion, CompletionRequest};

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed event: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stream is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("stream error: {0}")]
    Stream(String),
}
