//! Response framing
//!
//! A response is committed to one of two framings before any body bytes
//! are written: a single JSON document (`Buffered`) or a sequence of
//! `data: {json}\n\n` event frames (`Streamed`). This module owns the mode,
//! the event vocabulary, the wire encoding, and the single-writer transport
//! the orchestrator writes through.

use std::convert::Infallible;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::normalize::NormalizedError;

/// Output framing chosen once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Buffered,
    Streamed,
}

impl ResponseMode {
    /// Detect the mode from a raw request body.
    ///
    /// Only `"stream": true` and `"stream": "true"` select streaming. An empty
    /// or unparseable body is buffered.
    pub fn detect(body: &[u8]) -> Self {
        if body.is_empty() {
            return ResponseMode::Buffered;
        }
        serde_json::from_slice::<Value>(body)
            .map(|parsed| Self::from_value(&parsed))
            .unwrap_or(ResponseMode::Buffered)
    }

    /// Detect the mode from an already parsed body
    pub fn from_value(body: &Value) -> Self {
        match body.get("stream") {
            Some(Value::Bool(true)) => ResponseMode::Streamed,
            Some(Value::String(s)) if s == "true" => ResponseMode::Streamed,
            _ => ResponseMode::Buffered,
        }
    }

    pub fn is_streamed(self) -> bool {
        self == ResponseMode::Streamed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseMode::Buffered => "buffered",
            ResponseMode::Streamed => "streamed",
        }
    }

    /// Build a response whose headers are committed for this mode
    pub fn response(self, status: StatusCode, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        match self {
            ResponseMode::Streamed => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/event-stream"),
                );
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
                headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
            }
            ResponseMode::Buffered => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
        }

        response
    }
}

/// Events emitted on a streamed response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolEvent {
    Start {
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        timestamp: String,
    },
    Chunk {
        chunk: Value,
    },
    Done {
        timestamp: String,
    },
    Error {
        error: String,
        details: String,
    },
}

impl ProtocolEvent {
    pub fn start(model: Option<&str>) -> Self {
        ProtocolEvent::Start {
            model: model.map(str::to_string),
            timestamp: timestamp_now(),
        }
    }

    pub fn chunk(payload: Value) -> Self {
        ProtocolEvent::Chunk { chunk: payload }
    }

    pub fn done() -> Self {
        ProtocolEvent::Done {
            timestamp: timestamp_now(),
        }
    }

    pub fn error(normalized: &NormalizedError) -> Self {
        ProtocolEvent::Error {
            error: normalized.error.clone(),
            details: normalized.details.clone(),
        }
    }

    /// Whether this event ends a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolEvent::Done { .. } | ProtocolEvent::Error { .. })
    }
}

/// ISO-8601 UTC timestamp with millisecond precision
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Frame an event for the given mode.
///
/// Streamed mode yields exactly one `data: {json}\n\n` frame per event.
/// Buffered responses carry no events, so nothing is produced.
pub fn frame_event(mode: ResponseMode, event: &ProtocolEvent) -> Option<Bytes> {
    match mode {
        ResponseMode::Streamed => {
            let json = serde_json::to_string(event).expect("ProtocolEvent should always serialize");
            Some(Bytes::from(format!("data: {}\n\n", json)))
        }
        ResponseMode::Buffered => None,
    }
}

/// Encode the single document of a buffered response
pub fn frame_document(document: &Value) -> Bytes {
    Bytes::from(serde_json::to_vec(document).expect("JSON values should always serialize"))
}

/// Frame an error body for the given mode
pub fn frame_error(mode: ResponseMode, normalized: &NormalizedError) -> Bytes {
    match mode {
        ResponseMode::Streamed => frame_event(mode, &ProtocolEvent::error(normalized))
            .unwrap_or_else(Bytes::new),
        ResponseMode::Buffered => Bytes::from(
            serde_json::to_vec(normalized).expect("NormalizedError should always serialize"),
        ),
    }
}

/// Single-writer handle on an open response body.
///
/// Created together with the body it feeds. Closing consumes the writer, so
/// a second close or a write after close cannot be expressed.
pub struct ResponseWriter {
    mode: ResponseMode,
    sender: mpsc::Sender<Bytes>,
    frames_written: usize,
    disconnected: bool,
}

impl ResponseWriter {
    /// Open a transport for `mode`, returning the writer and the body it feeds
    pub fn open(mode: ResponseMode, capacity: usize) -> (Self, Body) {
        let (sender, receiver) = mpsc::channel::<Bytes>(capacity.max(1));

        let frames = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver
                .recv()
                .await
                .map(|frame| (Ok::<_, Infallible>(frame), receiver))
        });

        let writer = Self {
            mode,
            sender,
            frames_written: 0,
            disconnected: false,
        };

        (writer, Body::from_stream(frames))
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Number of frames handed to the transport so far
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Whether the client has gone away
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Frame and write one protocol event
    pub async fn write_event(&mut self, event: &ProtocolEvent) {
        if let Some(frame) = frame_event(self.mode, event) {
            self.send(frame).await;
        }
    }

    /// Write the single document of a buffered response
    pub async fn write_document(&mut self, document: &Value) {
        if self.mode != ResponseMode::Buffered || self.frames_written > 0 {
            error!(
                mode = self.mode.as_str(),
                frames_written = self.frames_written,
                "Refusing to write a second document or a document on an event stream"
            );
            debug_assert!(false, "buffered responses carry exactly one document");
            return;
        }
        self.send(frame_document(document)).await;
    }

    /// Write an error body framed for this writer's mode
    pub async fn write_error(&mut self, normalized: &NormalizedError) {
        match self.mode {
            ResponseMode::Streamed => self.write_event(&ProtocolEvent::error(normalized)).await,
            ResponseMode::Buffered => {
                let document =
                    serde_json::to_value(normalized).expect("NormalizedError should always serialize");
                self.write_document(&document).await;
            }
        }
    }

    /// Close the transport, ending the response body
    pub fn close(self) {
        debug!(
            mode = self.mode.as_str(),
            frames_written = self.frames_written,
            disconnected = self.disconnected,
            "Response transport closed"
        );
    }

    async fn send(&mut self, frame: Bytes) {
        if self.disconnected {
            return;
        }
        if self.sender.send(frame).await.is_err() {
            debug!(mode = self.mode.as_str(), "Client disconnected; dropping further frames");
            self.disconnected = true;
            return;
        }
        self.frames_written += 1;
    }
}

/// Split a streamed body into the JSON envelopes of its frames
#[cfg(any(test, feature = "test-utils"))]
pub fn parse_frames(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter_map(|json| serde_json::from_str(json).ok())
        .collect()
}
