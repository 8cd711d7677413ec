//! Completion orchestration
//!
//! Drives one chat request through `Init -> ModeSelected -> Executing ->
//! Terminated`:
//!
//! 1. The response mode is read from the body and never changes afterwards.
//! 2. Validation failures are answered immediately, framed for that mode.
//! 3. Otherwise headers are committed (`200`), the body is handed back to the
//!    server, and a task executes the provider call, writing into the body.
//! 4. A streamed response always ends with exactly one `done` or `error`
//!    event; the transport is closed once on every path.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{bail, Result};
use axum::{
    body::Body,
    http::{Method, StatusCode},
    response::Response,
};
use futures::{FutureExt, StreamExt};
use tracing::Instrument;

use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::error::GatewayError;
use crate::framing::{frame_error, ProtocolEvent, ResponseMode, ResponseWriter};
use crate::logging::RequestContext;
use crate::normalize::{normalize, FailureInfo};
use crate::provider::{CompletionCall, CompletionProvider};
use crate::routes::metrics::{record_rejection, record_request, record_stream_chunks};
use crate::validation::validate;

/// Orchestrator settings resolved at startup
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Whether the runtime can deliver chunked event streams
    pub streaming_supported: bool,
    /// Frames buffered between the execution task and the client
    pub stream_buffer: usize,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            streaming_supported: config.streaming_supported,
            stream_buffer: config.stream_buffer,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            streaming_supported: true,
            stream_buffer: 32,
        }
    }
}

/// How an execution ended, before terminal framing
#[derive(Debug)]
enum Outcome {
    Completed,
    Failed(FailureInfo),
    Disconnected,
}

/// Routes chat requests through validation, the provider, and framing
pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    credentials: Arc<dyn CredentialResolver>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator; fails when the runtime cannot stream
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        credentials: Arc<dyn CredentialResolver>,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        if !settings.streaming_supported {
            bail!("Streaming not supported in this environment");
        }

        Ok(Self {
            provider,
            credentials,
            settings,
        })
    }

    /// Name of the underlying completion provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Handle one inbound chat request
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Response {
        let mode = ResponseMode::detect(body);
        let ctx = RequestContext::new(mode);

        let validated = match validate(method, body, self.credentials.as_ref()) {
            Ok(validated) => validated,
            Err(err) => return reject(mode, &ctx, err),
        };

        let ctx = ctx
            .with_provider(validated.request.provider.as_str())
            .with_model(validated.request.model.as_deref());
        ctx.log_request_start(validated.request.messages.len());

        let (writer, body) = ResponseWriter::open(mode, self.settings.stream_buffer);
        let call = CompletionCall::from_validated(validated);
        let span = ctx.create_span();

        tokio::spawn(execute(Arc::clone(&self.provider), call, writer, ctx).instrument(span));

        mode.response(StatusCode::OK, body)
    }
}

/// Answer a request that failed validation
fn reject(mode: ResponseMode, ctx: &RequestContext, err: GatewayError) -> Response {
    let status = err.status_code();
    let normalized = err.to_normalized();

    ctx.log_rejected(status.as_u16(), &normalized);
    record_rejection(err.reason());

    mode.response(status, Body::from(frame_error(mode, &normalized)))
}

/// Run the provider call and write its outcome; always closes the writer
async fn execute(
    provider: Arc<dyn CompletionProvider>,
    call: CompletionCall,
    mut writer: ResponseWriter,
    ctx: RequestContext,
) {
    let mode = writer.mode();
    let declared = call.provider.as_str();
    let mut chunks = 0usize;

    let run = async {
        match mode {
            ResponseMode::Streamed => {
                run_streamed(provider.as_ref(), call, &mut writer, &mut chunks).await
            }
            ResponseMode::Buffered => run_buffered(provider.as_ref(), call, &mut writer).await,
        }
    };

    let outcome = AssertUnwindSafe(run)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Outcome::Failed(FailureInfo::new(format!(
                "Provider panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

    let duration = ctx.start_time.elapsed().as_secs_f64();
    match outcome {
        Outcome::Completed => {
            if mode.is_streamed() {
                writer.write_event(&ProtocolEvent::done()).await;
            }
            ctx.log_completed(chunks);
            record_request(mode.as_str(), ctx.provider_label(), "success", duration);
        }
        Outcome::Failed(failure) => {
            let err = GatewayError::from(normalize(&failure, Some(declared)));
            let normalized = err.to_normalized();
            writer.write_error(&normalized).await;
            ctx.log_failed(chunks, &normalized);
            record_request(mode.as_str(), ctx.provider_label(), err.reason(), duration);
        }
        Outcome::Disconnected => {
            ctx.log_client_disconnected(chunks);
            record_request(mode.as_str(), ctx.provider_label(), "disconnected", duration);
        }
    }

    if mode.is_streamed() {
        record_stream_chunks(ctx.provider_label(), chunks as u64);
    }

    writer.close();
}

/// Start event, then one chunk event per partial result, in provider order
async fn run_streamed(
    provider: &dyn CompletionProvider,
    call: CompletionCall,
    writer: &mut ResponseWriter,
    chunks: &mut usize,
) -> Outcome {
    // Sent before the provider produces anything so the caller knows the
    // stream is live.
    writer
        .write_event(&ProtocolEvent::start(call.model.as_deref()))
        .await;
    if writer.is_disconnected() {
        return Outcome::Disconnected;
    }

    let mut stream = match provider.complete_stream(call).await {
        Ok(stream) => stream,
        Err(failure) => return Outcome::Failed(failure),
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(payload) => {
                writer.write_event(&ProtocolEvent::chunk(payload)).await;
                if writer.is_disconnected() {
                    return Outcome::Disconnected;
                }
                *chunks += 1;
            }
            Err(failure) => return Outcome::Failed(failure),
        }
    }

    Outcome::Completed
}

/// Await the single result and write it as the whole body
async fn run_buffered(
    provider: &dyn CompletionProvider,
    call: CompletionCall,
    writer: &mut ResponseWriter,
) -> Outcome {
    match provider.complete(call).await {
        Ok(result) => {
            writer.write_document(&result).await;
            if writer.is_disconnected() {
                Outcome::Disconnected
            } else {
                Outcome::Completed
            }
        }
        Err(failure) => Outcome::Failed(failure),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
