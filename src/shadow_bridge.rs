//! Shadow bridge: makes every shadow tree observable and instrumented.
//!
//! Four discovery paths cover the ways a root can exist:
//! - the attach-shadow interceptor (with closed→open coercion) for roots
//!   created after install,
//! - the define wrapper for roots created inside custom-element
//!   constructors,
//! - the startup scans for roots that predate install,
//! - the subtree mutation observer for hosts moved into the document later.
//!
//! `install` is the platform hook installer, the only place in the crate
//! that mutates platform behavior.

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, trace};

use crate::capture::CaptureHandlers;
use crate::dom::{
    DefineInterceptor, Dom, ElementConstructor, NodeId, ShadowAttachInterceptor, ShadowMode,
};

struct BridgeInner {
    dom: Dom,
    handlers: CaptureHandlers,
    instrumented: DashSet<NodeId>,
}

/// Discovers shadow roots and attaches the capture listeners inside each
/// exactly once.
#[derive(Clone)]
pub struct ShadowBridge {
    inner: Arc<BridgeInner>,
}

impl ShadowBridge {
    pub fn new(dom: Dom, handlers: CaptureHandlers) -> Self {
        ShadowBridge {
            inner: Arc::new(BridgeInner {
                dom,
                handlers,
                instrumented: DashSet::new(),
            }),
        }
    }

    /// Install the platform hooks and run the startup scans.
    pub fn install(&self) {
        let dom = &self.inner.dom;
        dom.install_shadow_interceptor(Arc::new(CoercingInterceptor {
            bridge: self.clone(),
        }));
        dom.install_define_interceptor(Arc::new(InstrumentingDefine {
            bridge: self.clone(),
        }));
        let bridge = self.clone();
        dom.observe_subtree(Arc::new(move |dom, added| {
            for node in added {
                if let Some(root) = dom.shadow_root(*node) {
                    bridge.instrument_root(root);
                }
            }
        }));
        self.scan_open_roots();
        self.scan_closed_roots();
        debug!("shadow bridge installed");
    }

    /// Attach the capture listeners inside `root` and recurse into shadow
    /// roots already present beneath it. Idempotent and re-entrant: a root
    /// is instrumented at most once no matter how many discovery paths
    /// reach it.
    pub fn instrument_root(&self, root: NodeId) {
        if !self.inner.instrumented.insert(root) {
            return;
        }
        trace!(?root, "instrumenting shadow root");
        self.inner.handlers.attach(&self.inner.dom, root);
        for el in self.inner.dom.descendants(root) {
            if let Some(nested) = self.probe_shadow_root(el) {
                self.instrument_root(nested);
            }
        }
    }

    pub fn is_instrumented(&self, root: NodeId) -> bool {
        self.inner.instrumented.contains(&root)
    }

    /// One-time catch-up for open roots attached before install.
    pub fn scan_open_roots(&self) {
        let dom = &self.inner.dom;
        for el in dom.descendants(dom.document()) {
            if let Some(root) = dom.shadow_root(el) {
                self.instrument_root(root);
            }
        }
    }

    /// Enumerate closed roots through the privileged accessor, when the
    /// environment provides one. Covers roots attached through paths the
    /// coercion interceptor cannot reach.
    pub fn scan_closed_roots(&self) {
        let dom = &self.inner.dom;
        if !dom.has_privileged_shadow_access() {
            return;
        }
        for el in dom.descendants(dom.document()) {
            match dom.open_or_closed_shadow_root(el) {
                Ok(Some(root)) => self.instrument_root(root),
                Ok(None) => {}
                // One hostile element must not abort the scan of the rest
                // of the page.
                Err(e) => trace!(?el, "shadow probe skipped: {e}"),
            }
        }
    }

    fn probe_shadow_root(&self, el: NodeId) -> Option<NodeId> {
        let dom = &self.inner.dom;
        if let Some(root) = dom.shadow_root(el) {
            return Some(root);
        }
        if dom.has_privileged_shadow_access() {
            match dom.open_or_closed_shadow_root(el) {
                Ok(root) => return root,
                Err(e) => trace!(?el, "shadow probe skipped: {e}"),
            }
        }
        None
    }
}

/// Rewrites `closed` to `open` (the single allowed deviation from page
/// transparency) and instruments every new root.
struct CoercingInterceptor {
    bridge: ShadowBridge,
}

impl ShadowAttachInterceptor for CoercingInterceptor {
    fn rewrite_mode(&self, requested: ShadowMode) -> ShadowMode {
        if requested == ShadowMode::Closed {
            debug!("coercing closed shadow root to open");
        }
        ShadowMode::Open
    }

    fn attached(&self, _dom: &Dom, root: NodeId) {
        self.bridge.instrument_root(root);
    }
}

/// Wraps custom-element constructors so any shadow root created during
/// construction is instrumented the moment the constructor returns. The
/// original constructor runs unchanged.
struct InstrumentingDefine {
    bridge: ShadowBridge,
}

impl DefineInterceptor for InstrumentingDefine {
    fn wrap(&self, name: &str, ctor: ElementConstructor) -> ElementConstructor {
        trace!(name, "wrapping custom element constructor");
        let bridge = self.bridge.clone();
        Arc::new(move |dom, el| {
            ctor(dom, el);
            if let Some(root) = dom.shadow_root(el) {
                bridge.instrument_root(root);
            }
        })
    }
}

#[cfg(test)]
#[path = "shadow_bridge_test.rs"]
mod shadow_bridge_test;
