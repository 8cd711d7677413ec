//! Scripted completion provider for tests
//!
//! Replays a fixed outcome for every call and records the calls it saw.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ChunkStream, CompletionCall, CompletionProvider};
use crate::normalize::FailureInfo;

/// What the provider does when called
#[derive(Debug, Clone)]
pub enum Script {
    /// Buffered result (streamed as a single partial result)
    Complete(Value),
    /// Fail before producing anything
    Fail(FailureInfo),
    /// Streamed partial results, replayed in order
    Stream(Vec<Result<Value, FailureInfo>>),
    /// Panic inside the provider call
    Panic,
}

pub struct ScriptedProvider {
    script: Script,
    calls: Mutex<Vec<CompletionCall>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, call: CompletionCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, call: CompletionCall) -> Result<Value, FailureInfo> {
        self.record(call);
        match &self.script {
            Script::Complete(value) => Ok(value.clone()),
            Script::Fail(failure) => Err(failure.clone()),
            Script::Stream(_) => Err(FailureInfo::new("scripted provider only streams")),
            Script::Panic => panic!("scripted provider panic"),
        }
    }

    async fn complete_stream(&self, call: CompletionCall) -> Result<ChunkStream, FailureInfo> {
        self.record(call);
        match &self.script {
            Script::Complete(value) => Ok(Box::pin(futures::stream::iter(vec![Ok(value.clone())]))),
            Script::Fail(failure) => Err(failure.clone()),
            Script::Stream(items) => Ok(Box::pin(futures::stream::iter(items.clone()))),
            Script::Panic => panic!("scripted provider panic"),
        }
    }
}
