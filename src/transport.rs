//! Message protocol between the recorder and its host collaborator.
//!
//! Everything outbound is fire-and-forget: no acknowledgment, no retry.
//! Message loss is an accepted bounded-fidelity tradeoff for a
//! telemetry-style stream. The single exception is the startup status
//! request, one round trip whose failure means "not enabled".

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::RecorderError;
use crate::producer::StreamEvent;
use crate::types::{ClickEvent, InputEvent, KeyEvent, SelectEvent};

/// Outbound messages, tagged the way the host protocol expects them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundMessage {
    #[serde(rename = "RRWEB_EVENT")]
    RrwebEvent(StreamEvent),
    #[serde(rename = "CUSTOM_CLICK_EVENT")]
    Click(ClickEvent),
    #[serde(rename = "CUSTOM_INPUT_EVENT")]
    Input(InputEvent),
    #[serde(rename = "CUSTOM_SELECT_EVENT")]
    Select(SelectEvent),
    #[serde(rename = "CUSTOM_KEY_EVENT")]
    Key(KeyEvent),
}

/// Inbound control messages from the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ControlMessage {
    #[serde(rename = "SET_RECORDING_STATUS")]
    SetRecordingStatus(bool),
}

/// Response to the startup status request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_recording_enabled: bool,
}

/// Delivery seam to the host collaborator.
pub trait Transport: Send + Sync {
    /// Fire-and-forget send. Implementations log and drop on failure.
    fn send(&self, message: OutboundMessage);

    /// One-shot startup round trip. Errors are treated as "not enabled" by
    /// the session (fail closed).
    fn request_recording_status(&self) -> Result<StatusResponse, RecorderError>;
}

/// Channel-backed transport: messages land on an unbounded receiver the
/// embedder drains. The status response is whatever the embedder primed;
/// unprimed means the round trip fails.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    status: Mutex<Option<StatusResponse>>,
}

impl ChannelTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(ChannelTransport {
                tx,
                status: Mutex::new(None),
            }),
            rx,
        )
    }

    /// Prime the answer for the startup status request.
    pub fn set_status_response(&self, enabled: bool) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = Some(StatusResponse {
            is_recording_enabled: enabled,
        });
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.tx.send(message) {
            debug!("dropping outbound message, receiver closed: {e}");
        }
    }

    fn request_recording_status(&self) -> Result<StatusResponse, RecorderError> {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ok_or_else(|| RecorderError::Transport("no response to status request".into()))
    }
}
