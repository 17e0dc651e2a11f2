//! Seam to the snapshot/incremental-DOM recording library.
//!
//! The recorder layers its custom events on top of a black-box producer of
//! timestamped snapshot/mutation events, delivered through an emit
//! callback. The library itself stays external; this module only fixes the
//! call shape: start with options, receive events, tear down with the
//! returned handle.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration handed to the producer at start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProducerOptions {
    /// Never let real password text into the raw stream.
    pub mask_password_inputs: bool,
    /// Periodic full-state checkpoint, time-based.
    pub checkpoint_every_ms: u64,
    /// Periodic full-state checkpoint, mutation-count-based.
    pub checkpoint_every_events: u64,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        ProducerOptions {
            mask_password_inputs: true,
            checkpoint_every_ms: 10_000,
            checkpoint_every_events: 200,
        }
    }
}

/// Top-level class of a stream event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamEventKind {
    DomContentLoaded,
    Load,
    FullSnapshot,
    IncrementalSnapshot,
    Meta,
    Custom,
}

/// Source of an incremental snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncrementalSource {
    Mutation,
    MouseMove,
    MouseInteraction,
    Scroll,
    ViewportResize,
    Input,
    MediaInteraction,
    Selection,
}

/// One timestamped event from the snapshot/mutation stream. `data` is
/// opaque passthrough except for scroll events, whose `x`/`y` the coalescer
/// reads and rewrites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<IncrementalSource>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub data: Value,
}

impl StreamEvent {
    pub fn incremental(source: IncrementalSource, timestamp: i64, data: Value) -> Self {
        StreamEvent {
            kind: StreamEventKind::IncrementalSnapshot,
            source: Some(source),
            timestamp,
            data,
        }
    }

    pub fn is_scroll(&self) -> bool {
        self.kind == StreamEventKind::IncrementalSnapshot
            && self.source == Some(IncrementalSource::Scroll)
    }
}

/// Callback through which the producer delivers events.
pub type EmitFn = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Teardown handle returned by a started producer.
pub struct ProducerHandle {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl ProducerHandle {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        ProducerHandle {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn noop() -> Self {
        ProducerHandle { teardown: None }
    }

    pub fn stop(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

/// The external snapshot/mutation recording library, reduced to its
/// interface.
pub trait SnapshotProducer: Send + Sync {
    fn start(&self, options: ProducerOptions, emit: EmitFn) -> anyhow::Result<ProducerHandle>;
}

#[derive(Default)]
struct ManualState {
    emit: Option<EmitFn>,
    options: Option<ProducerOptions>,
}

/// Hand-driven producer for embedding and tests: events pushed through
/// [`ManualProducer::emit`] flow into the session exactly as library events
/// would.
#[derive(Clone, Default)]
pub struct ManualProducer {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualProducer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_started(&self) -> bool {
        self.lock().emit.is_some()
    }

    /// Options the session started the producer with, if it has started.
    pub fn options(&self) -> Option<ProducerOptions> {
        self.lock().options
    }

    /// Push an event into the stream. Returns false once torn down.
    pub fn emit(&self, event: StreamEvent) -> bool {
        let emit = self.lock().emit.clone();
        match emit {
            Some(emit) => {
                emit(event);
                true
            }
            None => false,
        }
    }
}

impl SnapshotProducer for ManualProducer {
    fn start(&self, options: ProducerOptions, emit: EmitFn) -> anyhow::Result<ProducerHandle> {
        let mut state = self.lock();
        if state.emit.is_some() {
            return Err(crate::errors::RecorderError::ProducerAlreadyStarted.into());
        }
        state.emit = Some(emit);
        state.options = Some(options);
        let inner = Arc::clone(&self.inner);
        Ok(ProducerHandle::new(move || {
            let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
            state.emit = None;
        }))
    }
}
