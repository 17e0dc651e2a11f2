//! # webscribe
//!
//! In-page interaction recorder: observes a live document (nested open and
//! closed shadow trees included) and emits a normalized, replayable event
//! stream (clicks, text input, selection changes, key presses) alongside
//! the raw snapshot/mutation stream of an external recording library.
//!
//! Every captured element is tagged with a stable locator: a structural
//! XPath plus a defensive, shadow-piercing CSS selector chain that a
//! separate automation engine can use to re-find the element later.
//!
//! ## How it works
//!
//! - The [`dom`] module is the document model the recorder runs against: an
//!   arena-backed DOM with shadow roots, synchronous event dispatch over
//!   composed paths, mutation observers and a custom-element registry.
//! - The [`shadow_bridge`] defeats DOM encapsulation: it coerces closed
//!   shadow roots to open at attach time, wraps custom-element
//!   constructors, watches for late-arriving hosts, and attaches the
//!   capture listeners inside every discovered root exactly once.
//! - The [`capture`] layer normalizes raw events into typed payloads using
//!   the [`locator`] generator; the [`scroll`] coalescer debounces scroll
//!   signals into direction-aware events.
//! - The [`session`] controller owns lifecycle and forwards everything to
//!   the host over a fire-and-forget [`transport`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use webscribe::{
//!     ChannelTransport, Dom, DomOptions, ManualProducer, RecorderConfig, RecordingSession,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let dom = Dom::new(DomOptions::default());
//! let (transport, events) = ChannelTransport::new();
//! transport.set_status_response(true);
//! let producer = Arc::new(ManualProducer::new());
//!
//! let session = RecordingSession::new(
//!     dom.clone(),
//!     transport,
//!     producer,
//!     RecorderConfig::default(),
//! );
//! session.bootstrap();
//!
//! // Page activity now lands on `events` as tagged messages.
//! let button = dom.create_element_in(dom.body(), "button")?;
//! dom.dispatch_click(button);
//! drop(events);
//! # Ok(())
//! # }
//! ```

/// Event capture layer: the four event normalizers
pub mod capture;

/// In-memory document model and platform hook seams
pub mod dom;

/// Crate error type
mod errors;

/// XPath + shadow-piercing CSS selector generation
pub mod locator;

/// Seam to the external snapshot/mutation recording library
pub mod producer;

/// Scroll signal coalescing
pub mod scroll;

/// Recording session lifecycle
pub mod session;

/// Shadow tree discovery and instrumentation
pub mod shadow_bridge;

/// Message protocol and transport seam
pub mod transport;

/// Shared data model: locators, event payloads, constants
pub mod types;

pub use dom::{Dom, DomOptions, EventKind, KeyInput, NodeId, ShadowMode};
pub use errors::RecorderError;
pub use producer::{ManualProducer, ProducerOptions, SnapshotProducer, StreamEvent};
pub use session::{RecorderConfig, RecordingSession, StopHandle};
pub use shadow_bridge::ShadowBridge;
pub use transport::{ChannelTransport, ControlMessage, OutboundMessage, StatusResponse, Transport};
pub use types::{
    ClickEvent, EventContext, InputEvent, KeyEvent, Locator, ScrollDirection, SelectEvent,
};
