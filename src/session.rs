//! Recording session controller: owns lifecycle, toggles capture from
//! control messages, and wires every produced event to the transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capture::CaptureHandlers;
use crate::dom::{Dom, ListenerId};
use crate::errors::RecorderError;
use crate::producer::{EmitFn, ProducerHandle, ProducerOptions, SnapshotProducer};
use crate::scroll::ScrollCoalescer;
use crate::shadow_bridge::ShadowBridge;
use crate::transport::{ControlMessage, OutboundMessage, Transport};
use crate::types::CLICK_TEXT_LIMIT;

/// Tunables for a recording session. Defaults match the production
/// recorder: 500 ms scroll debounce, 200-character click text, masked
/// passwords, checkpoints every 10 s or 200 mutations.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    pub scroll_debounce: Duration,
    pub click_text_limit: usize,
    pub mask_password_inputs: bool,
    pub checkpoint_every_ms: u64,
    pub checkpoint_every_events: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            scroll_debounce: Duration::from_millis(500),
            click_text_limit: CLICK_TEXT_LIMIT,
            mask_password_inputs: true,
            checkpoint_every_ms: 10_000,
            checkpoint_every_events: 200,
        }
    }
}

/// Mutable lifecycle state, owned in one place instead of scattered
/// globals: the producer teardown handle and the top-document listeners.
#[derive(Default)]
struct RecorderState {
    producer_handle: Option<ProducerHandle>,
    document_listeners: Vec<ListenerId>,
}

struct SessionShared {
    id: Uuid,
    dom: Dom,
    transport: Arc<dyn Transport>,
    producer: Arc<dyn SnapshotProducer>,
    config: RecorderConfig,
    active: Arc<AtomicBool>,
    handlers: CaptureHandlers,
    bridge: ShadowBridge,
    scroll: ScrollCoalescer,
    state: Mutex<RecorderState>,
}

/// The recording session: `STOPPED → (start) → ACTIVE → (stop) → STOPPED`,
/// both transitions idempotent.
#[derive(Clone)]
pub struct RecordingSession {
    shared: Arc<SessionShared>,
}

impl RecordingSession {
    pub fn new(
        dom: Dom,
        transport: Arc<dyn Transport>,
        producer: Arc<dyn SnapshotProducer>,
        config: RecorderConfig,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let handlers =
            CaptureHandlers::new(Arc::clone(&transport), Arc::clone(&active), config.click_text_limit);
        let bridge = ShadowBridge::new(dom.clone(), handlers.clone());
        let scroll = ScrollCoalescer::new(Arc::clone(&transport), config.scroll_debounce);
        RecordingSession {
            shared: Arc::new(SessionShared {
                id: Uuid::new_v4(),
                dom,
                transport,
                producer,
                config,
                active,
                handlers,
                bridge,
                scroll,
                state: Mutex::new(RecorderState::default()),
            }),
        }
    }

    /// Install the platform hooks, then ask the host whether recording is
    /// enabled. Any transport failure means "not enabled" (fail closed).
    pub fn bootstrap(&self) {
        self.shared.bridge.install();
        match self.shared.transport.request_recording_status() {
            Ok(status) if status.is_recording_enabled => {
                if let Err(e) = self.start() {
                    warn!(session = %self.shared.id, "startup recording failed: {e}");
                }
            }
            Ok(_) => info!(session = %self.shared.id, "recording disabled at startup"),
            Err(e) => {
                warn!(session = %self.shared.id, "status request failed, staying stopped: {e}");
            }
        }
    }

    /// Start capturing. No-op when already active.
    pub fn start(&self) -> Result<(), RecorderError> {
        start_session(&self.shared)
    }

    /// Stop capturing. No-op when already stopped. Shadow-root listeners
    /// stay attached for the page lifetime; the active flag keeps them
    /// inert.
    pub fn stop(&self) {
        stop_session(&self.shared);
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn handle_control(&self, message: ControlMessage) {
        match message {
            ControlMessage::SetRecordingStatus(true) => {
                if let Err(e) = self.start() {
                    warn!(session = %self.shared.id, "start failed: {e}");
                }
            }
            ControlMessage::SetRecordingStatus(false) => self.stop(),
        }
    }

    pub fn on_page_unload(&self) {
        self.stop();
    }

    /// Manual escape hatch for operator-driven cancellation outside the
    /// message protocol.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The bridge, for embedders that need to instrument roots directly.
    pub fn bridge(&self) -> ShadowBridge {
        self.shared.bridge.clone()
    }
}

/// Cloneable handle that stops the session it came from, if it still
/// exists.
#[derive(Clone)]
pub struct StopHandle {
    shared: Weak<SessionShared>,
}

impl StopHandle {
    pub fn stop(&self) {
        if let Some(shared) = self.shared.upgrade() {
            stop_session(&shared);
        }
    }
}

fn lock_state(shared: &SessionShared) -> MutexGuard<'_, RecorderState> {
    shared.state.lock().unwrap_or_else(|e| e.into_inner())
}

fn start_session(shared: &Arc<SessionShared>) -> Result<(), RecorderError> {
    let mut state = lock_state(shared);
    if shared.active.load(Ordering::SeqCst) {
        debug!(session = %shared.id, "start ignored, already recording");
        return Ok(());
    }

    let emit: EmitFn = {
        let shared = Arc::clone(shared);
        Arc::new(move |event| {
            if !shared.active.load(Ordering::SeqCst) {
                return;
            }
            if event.is_scroll() {
                shared.scroll.on_signal(event);
            } else {
                shared.transport.send(OutboundMessage::RrwebEvent(event));
            }
        })
    };
    let options = ProducerOptions {
        mask_password_inputs: shared.config.mask_password_inputs,
        checkpoint_every_ms: shared.config.checkpoint_every_ms,
        checkpoint_every_events: shared.config.checkpoint_every_events,
    };
    let handle = shared
        .producer
        .start(options, emit)
        .map_err(|e| RecorderError::Producer(format!("{e:#}")))?;

    state.producer_handle = Some(handle);
    state.document_listeners = shared.handlers.attach(&shared.dom, shared.dom.document());
    shared.active.store(true, Ordering::SeqCst);
    info!(session = %shared.id, "recording started");
    Ok(())
}

fn stop_session(shared: &SessionShared) {
    let mut state = lock_state(shared);
    if !shared.active.load(Ordering::SeqCst) {
        debug!(session = %shared.id, "stop ignored, not recording");
        return;
    }
    shared.active.store(false, Ordering::SeqCst);
    if let Some(handle) = state.producer_handle.take() {
        handle.stop();
    }
    let document = shared.dom.document();
    for id in state.document_listeners.drain(..) {
        shared.dom.remove_event_listener(document, id);
    }
    shared.scroll.cancel_pending();
    info!(session = %shared.id, "recording stopped");
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
