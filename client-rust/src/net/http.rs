//! `reqwest`-backed connector for `GET /api/fortune`.
//!
//! The reader task splits the body into SSE records with
//! [`frames::RecordDecoder`], decodes each one, and forwards the result.
//! Records that carry no frame (keepalive comments, empty payloads) are
//! skipped silently.

use frames::RecordDecoder;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::connection::{CloseWatch, ConnectionHandle, Connector, TransportError, WireEvent};

/// Path of the relay endpoint, relative to the base URL.
pub const FORTUNE_PATH: &str = "/api/fortune";

#[derive(Clone, Debug)]
pub struct HttpConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    #[must_use]
    pub fn fortune_url(&self) -> String {
        format!("{}{FORTUNE_PATH}", self.base_url.trim_end_matches('/'))
    }
}

impl Connector for HttpConnector {
    fn open(&self, question: &str) -> ConnectionHandle {
        let request = self.client.get(self.fortune_url()).query(&[("question", question)]);
        ConnectionHandle::spawn(move |tx, watch| read_stream(request, tx, watch))
    }
}

async fn read_stream(request: reqwest::RequestBuilder, tx: mpsc::Sender<WireEvent>, watch: CloseWatch) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "http: request failed");
            let _ = tx.send(WireEvent::TransportLost(TransportError::Request(e))).await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "http: unexpected status");
        let _ = tx.send(WireEvent::TransportLost(TransportError::Status(status.as_u16()))).await;
        return;
    }

    let mut decoder = RecordDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        if watch.is_closed() {
            debug!("http: closed mid-body");
            return;
        }
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "http: body read failed");
                let _ = tx.send(WireEvent::TransportLost(TransportError::Body(e))).await;
                return;
            }
        };
        for raw in decoder.push(&bytes) {
            if !forward(&tx, &raw).await {
                return;
            }
        }
    }

    if let Some(raw) = decoder.finish() {
        if !forward(&tx, &raw).await {
            return;
        }
    }
    let _ = tx.send(WireEvent::Closed).await;
}

/// Decode one record and send it on. Returns `false` once the receiver is gone.
async fn forward(tx: &mpsc::Sender<WireEvent>, raw: &str) -> bool {
    let event = match frames::decode_frame(raw) {
        Ok(Some(frame)) => WireEvent::Frame(frame),
        Ok(None) => return true,
        Err(e) => WireEvent::Malformed(e),
    };
    tx.send(event).await.is_ok()
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
