//! Scroll coalescing: debounces the high-frequency scroll signals of the
//! snapshot stream into direction-aware, rate-limited events.
//!
//! At most one timer is outstanding per session: every signal aborts and
//! reschedules it rather than stacking. A reversal mid-debounce cancels the
//! pending emission: only the final resting direction is worth reporting.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::producer::StreamEvent;
use crate::transport::{OutboundMessage, Transport};
use crate::types::ScrollDirection;

#[derive(Default)]
struct ScrollState {
    last_y: Option<i64>,
    last_direction: Option<ScrollDirection>,
    pending: Option<JoinHandle<()>>,
}

struct CoalescerInner {
    transport: Arc<dyn Transport>,
    debounce: Duration,
    state: Mutex<ScrollState>,
}

/// Debouncing state machine over the scroll signals of the stream.
#[derive(Clone)]
pub struct ScrollCoalescer {
    inner: Arc<CoalescerInner>,
}

impl ScrollCoalescer {
    pub fn new(transport: Arc<dyn Transport>, debounce: Duration) -> Self {
        ScrollCoalescer {
            inner: Arc::new(CoalescerInner {
                transport,
                debounce,
                state: Mutex::new(ScrollState::default()),
            }),
        }
    }

    /// Feed one scroll signal. Must run inside a tokio runtime (the
    /// debounce timer is a spawned task).
    pub fn on_signal(&self, event: StreamEvent) {
        let (Some(x), Some(y)) = (read_coord(&event.data, "x"), read_coord(&event.data, "y"))
        else {
            // Malformed payload: forward unmodified rather than lose it.
            self.inner.transport.send(OutboundMessage::RrwebEvent(event));
            return;
        };

        let mut state = lock(&self.inner.state);
        let direction = state.last_y.map(|last| {
            if y > last {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            }
        });
        if let (Some(dir), Some(prev)) = (direction, state.last_direction)
            && dir != prev
        {
            // Reversal supersedes the debounced intent of the prior
            // direction.
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }
            state.last_direction = None;
        }
        state.last_direction = direction;
        state.last_y = Some(y);

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        let mut patched = event;
        if let Value::Object(map) = &mut patched.data {
            map.insert("x".into(), x.into());
            map.insert("y".into(), y.into());
            if let Some(dir) = direction {
                map.insert("direction".into(), dir.as_str().into());
            }
        }
        let inner = Arc::clone(&self.inner);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            let mut state = lock(&inner.state);
            inner.transport.send(OutboundMessage::RrwebEvent(patched));
            state.pending = None;
            state.last_direction = None;
        }));
    }

    /// Abort a pending emission and clear direction memory.
    pub fn cancel_pending(&self) {
        let mut state = lock(&self.inner.state);
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.last_direction = None;
    }
}

fn lock(state: &Mutex<ScrollState>) -> MutexGuard<'_, ScrollState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_coord(data: &Value, key: &str) -> Option<i64> {
    data.get(key)?.as_f64().map(|v| v.round() as i64)
}

#[cfg(test)]
#[path = "scroll_test.rs"]
mod scroll_test;
