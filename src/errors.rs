use thiserror::Error;

use crate::dom::NodeId;

/// Failures surfaced by the recorder and its document model.
///
/// None of these are fatal to the hosting page: locator failures degrade to a
/// fallback selector, shadow-probe failures are swallowed per element, and
/// transport failures are logged and dropped.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} does not exist in this document")]
    NoSuchNode(NodeId),

    #[error("element {0:?} already hosts a shadow root")]
    ShadowAlreadyAttached(NodeId),

    #[error("closed shadow root access requires the privileged accessor")]
    PrivilegedAccessUnavailable,

    #[error("shadow probe rejected by host element {0:?}")]
    HostileShadowProbe(NodeId),

    #[error("attribute `{0}` cannot be expressed in a CSS selector")]
    UnescapableAttribute(String),

    #[error("snapshot producer already started")]
    ProducerAlreadyStarted,

    #[error("snapshot producer failed: {0}")]
    Producer(String),

    #[error("transport unavailable: {0}")]
    Transport(String),
}
