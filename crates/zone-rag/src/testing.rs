//! Stub capabilities and a loopback HTTP helper shared by unit tests

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::{Error, FetchErrorKind, Result, SynthesisErrorKind};
use crate::ingestion::{DocumentDecoder, DocumentFetcher};
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::types::{DocumentRef, RawDocument};

/// Fetcher serving a fixed body, or a fixed HTTP error status
pub struct StubFetcher {
    body: Bytes,
    status: Option<u16>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            status: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(Bytes::new())
        }
    }

    /// Sleep before answering, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for StubFetcher {
    async fn fetch(&self, doc: &DocumentRef, _timeout: Duration) -> Result<RawDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.status {
            Some(status) => Err(Error::fetch(
                &doc.url,
                FetchErrorKind::HttpStatus(status),
                "stubbed status",
            )),
            None => Ok(RawDocument::new(doc.clone(), self.body.clone())),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Decoder treating bytes as UTF-8 with form feeds between pages
#[derive(Default)]
pub struct StubDecoder {
    calls: AtomicUsize,
}

impl StubDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentDecoder for StubDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::str::from_utf8(data).map_err(|e| Error::decode(e.to_string()))?;
        Ok(text.split('\u{000C}').map(String::from).collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Hashed bag-of-words embedder; shared words mean higher similarity
pub struct StubEmbedder {
    fail: bool,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub const DIMENSIONS: usize = 256;

    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Embedder whose every call is an index error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::index("stub embedding service unavailable"));
        }

        let mut vector = vec![0.0; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % Self::DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Completion that answers with the prompt it was given
#[derive(Default)]
pub struct EchoCompletion {
    prompts: Mutex<Vec<String>>,
}

impl EchoCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for EchoCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

/// Completion with a canned reply
pub struct FixedCompletion(String);

impl FixedCompletion {
    pub fn new(reply: impl Into<String>) -> Self {
        Self(reply.into())
    }
}

#[async_trait]
impl CompletionProvider for FixedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Completion whose service is always down
pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::synthesis(
            SynthesisErrorKind::ServiceUnavailable,
            "connection refused",
        ))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Completion that panics, standing in for an unexpected fault
pub struct PanickingCompletion;

#[async_trait]
impl CompletionProvider for PanickingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        panic!("completion backend crashed")
    }

    fn name(&self) -> &str {
        "panicking"
    }

    fn model(&self) -> &str {
        "panicking"
    }
}

/// Minimal HTTP/1.1 response with a JSON body
pub fn http_response(status: u16, body: &str) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
    .into_bytes()
}

/// Whether `buf` holds a full request (headers plus Content-Length body)
fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let body_len = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= header_end + 4 + body_len
}

/// Serve one canned response on a loopback port; returns `http://addr`
pub async fn serve_once(response: Vec<u8>, delay: Option<Duration>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request_complete(&request) {
                            break;
                        }
                    }
                }
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", addr)
}
