//! Platform hook seams.
//!
//! These traits are the only way code outside the document model can change
//! platform behavior (shadow attachment, custom-element definition). The
//! shadow bridge is the sole installer; everything else observes the page
//! without altering it.

use std::sync::Arc;

use super::{Dom, NodeId, ShadowMode};

/// Constructor body of a custom element, run right after the element node is
/// created. May attach a shadow root and build internal structure.
pub type ElementConstructor = Arc<dyn Fn(&Dom, NodeId) + Send + Sync>;

/// Callback invoked with the element nodes added by a subtree mutation.
pub type MutationCallback = Arc<dyn Fn(&Dom, &[NodeId]) + Send + Sync>;

/// Intercepts every shadow-root attachment.
///
/// Implementations must not panic: the document model calls these from
/// inside page-facing APIs, and instrumentation failures must never break
/// the page's contract. Fallible work belongs behind the implementation,
/// logged and swallowed there.
pub trait ShadowAttachInterceptor: Send + Sync {
    /// May substitute the requested mode before the root is created. The
    /// bridge coerces `closed` to `open` here, the single allowed deviation
    /// from page transparency.
    fn rewrite_mode(&self, requested: ShadowMode) -> ShadowMode {
        requested
    }

    /// Runs immediately after the root exists, outside the document lock.
    fn attached(&self, dom: &Dom, root: NodeId);
}

/// Wraps custom-element constructors at definition time, so code can run
/// immediately after any instance of the element type is constructed while
/// preserving the original constructor's observable behavior.
pub trait DefineInterceptor: Send + Sync {
    fn wrap(&self, name: &str, ctor: ElementConstructor) -> ElementConstructor;
}
