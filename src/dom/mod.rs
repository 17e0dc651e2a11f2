//! In-memory document model.
//!
//! An arena-backed DOM with shadow roots (open and closed), synchronous
//! event dispatch over composed paths, subtree mutation observers and a
//! custom-element registry. It stands in for the hosting browser page: the
//! recorder instruments it exactly the way the content script instruments a
//! live document, and tests drive it as a fake platform.
//!
//! Structural state lives behind a single mutex. Every listener, observer
//! and hook callback is invoked *outside* that lock, so callbacks are free
//! to query and mutate the document re-entrantly.

mod event;
mod hooks;

pub use event::{DomEvent, EventKind, KeyInput, ListenerId};
pub use hooks::{DefineInterceptor, ElementConstructor, MutationCallback, ShadowAttachInterceptor};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::RecorderError;

type Result<T> = std::result::Result<T, RecorderError>;

/// Handle to a node in the document arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

/// Encapsulation mode requested for a shadow root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowMode {
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element,
    ShadowRoot,
}

struct NodeData {
    kind: NodeKind,
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    selected: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    shadow_mode: Option<ShadowMode>,
    host: Option<NodeId>,
    probe_trap: bool,
}

impl NodeData {
    fn new(kind: NodeKind, tag: &str) -> Self {
        NodeData {
            kind,
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: None,
            selected: false,
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            shadow_mode: None,
            host: None,
            probe_trap: false,
        }
    }

    fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Document | NodeKind::ShadowRoot)
    }
}

/// Event listener callback; receives the document handle and the event.
pub type ListenerFn = Arc<dyn Fn(&Dom, &DomEvent) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    callback: ListenerFn,
}

/// Construction options for a document.
#[derive(Clone, Debug)]
pub struct DomOptions {
    /// Top document URL.
    pub url: Url,
    /// Current window URL; defaults to `url` outside frames.
    pub frame_url: Option<Url>,
    /// Whether the host environment exposes the privileged accessor for
    /// closed shadow roots (the devtools `openOrClosedShadowRoot` API).
    pub privileged_shadow_access: bool,
}

impl Default for DomOptions {
    fn default() -> Self {
        DomOptions {
            url: Url::parse("about:blank").expect("static URL"),
            frame_url: None,
            privileged_shadow_access: false,
        }
    }
}

struct DomInner {
    nodes: Vec<NodeData>,
    document: NodeId,
    body: NodeId,
    location: Url,
    frame_location: Url,
    privileged_shadow_access: bool,
    listeners: HashMap<NodeId, Vec<ListenerEntry>>,
    observers: Vec<MutationCallback>,
    shadow_interceptor: Option<Arc<dyn ShadowAttachInterceptor>>,
    define_interceptor: Option<Arc<dyn DefineInterceptor>>,
    custom_elements: HashMap<String, ElementConstructor>,
    next_listener: u64,
}

/// Cloneable handle to a document.
#[derive(Clone)]
pub struct Dom {
    inner: Arc<Mutex<DomInner>>,
}

impl Default for Dom {
    fn default() -> Self {
        Dom::new(DomOptions::default())
    }
}

impl Dom {
    /// Create a document with the usual `document > html > body` skeleton.
    pub fn new(options: DomOptions) -> Self {
        let mut nodes = Vec::new();
        let document = NodeId(0);
        nodes.push(NodeData::new(NodeKind::Document, "#document"));
        let html = NodeId(1);
        nodes.push(NodeData::new(NodeKind::Element, "html"));
        let body = NodeId(2);
        nodes.push(NodeData::new(NodeKind::Element, "body"));
        nodes[document.0].children.push(html);
        nodes[html.0].parent = Some(document);
        nodes[html.0].children.push(body);
        nodes[body.0].parent = Some(html);

        let frame_location = options.frame_url.unwrap_or_else(|| options.url.clone());
        Dom {
            inner: Arc::new(Mutex::new(DomInner {
                nodes,
                document,
                body,
                location: options.url,
                frame_location,
                privileged_shadow_access: options.privileged_shadow_access,
                listeners: HashMap::new(),
                observers: Vec::new(),
                shadow_interceptor: None,
                define_interceptor: None,
                custom_elements: HashMap::new(),
                next_listener: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DomInner> {
        // A poisoned lock only means a callback panicked mid-query; the
        // structural state itself is never left half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn document(&self) -> NodeId {
        self.lock().document
    }

    pub fn body(&self) -> NodeId {
        self.lock().body
    }

    pub fn location(&self) -> Url {
        self.lock().location.clone()
    }

    pub fn frame_location(&self) -> Url {
        self.lock().frame_location.clone()
    }

    pub fn has_privileged_shadow_access(&self) -> bool {
        self.lock().privileged_shadow_access
    }

    // ---- construction & mutation ----

    /// Create a detached element. Runs the registered custom-element
    /// constructor (as wrapped at definition time) when one exists for the
    /// tag name.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let (id, ctor) = {
            let mut inner = self.lock();
            let id = NodeId(inner.nodes.len());
            let mut node = NodeData::new(NodeKind::Element, tag);
            if matches!(node.tag.as_str(), "input" | "textarea") {
                node.value = Some(String::new());
            }
            let ctor = inner.custom_elements.get(&node.tag).cloned();
            inner.nodes.push(node);
            (id, ctor)
        };
        if let Some(ctor) = ctor {
            ctor(self, id);
        }
        id
    }

    /// Create an element and append it to `parent` in one step.
    pub fn create_element_in(&self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let id = self.create_element(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` under `parent` (detaching it first if needed) and
    /// notify subtree observers.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let observers = {
            let mut inner = self.lock();
            inner.get(parent)?;
            if inner.get(child)?.kind != NodeKind::Element {
                return Err(RecorderError::NotAnElement(child));
            }
            if let Some(old) = inner.nodes[child.0].parent {
                inner.nodes[old.0].children.retain(|c| *c != child);
            }
            inner.nodes[parent.0].children.push(child);
            inner.nodes[child.0].parent = Some(parent);
            inner.observers.clone()
        };
        for observer in observers {
            observer(self, &[child]);
        }
        Ok(())
    }

    pub fn set_attribute(&self, el: NodeId, name: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check_element(el)?;
        inner.nodes[el.0]
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn set_text(&self, el: NodeId, text: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check_element(el)?;
        inner.nodes[el.0].text = text.to_string();
        Ok(())
    }

    pub fn set_value(&self, el: NodeId, value: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check_element(el)?;
        inner.nodes[el.0].value = Some(value.to_string());
        Ok(())
    }

    /// Mark `option` as the selected option of `select`, clearing siblings.
    pub fn select_option(&self, select: NodeId, option: NodeId) -> Result<()> {
        let mut inner = self.lock();
        inner.check_element(select)?;
        inner.check_element(option)?;
        let children = inner.nodes[select.0].children.clone();
        for child in children {
            inner.nodes[child.0].selected = child == option;
        }
        Ok(())
    }

    /// Simulate a host whose closed-root accessor throws when probed.
    pub fn set_shadow_probe_trap(&self, el: NodeId, trapped: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.check_element(el)?;
        inner.nodes[el.0].probe_trap = trapped;
        Ok(())
    }

    // ---- queries ----

    pub fn is_element(&self, node: NodeId) -> bool {
        let inner = self.lock();
        inner
            .get(node)
            .map(|n| n.kind == NodeKind::Element)
            .unwrap_or(false)
    }

    pub fn is_body(&self, node: NodeId) -> bool {
        self.lock().body == node
    }

    /// Lowercase tag name (`"#document"` / `"#shadow-root"` for roots).
    pub fn tag(&self, node: NodeId) -> String {
        self.lock()
            .get(node)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock()
            .get(node)
            .ok()
            .and_then(|n| n.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    /// All attributes, sorted by name.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.lock()
            .get(node)
            .map(|n| n.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Non-empty `id` attribute.
    pub fn id(&self, node: NodeId) -> Option<String> {
        self.attr(node, "id").filter(|id| !id.is_empty())
    }

    /// Class tokens from the `class` attribute, in document order.
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// The element's value, when it exposes one (inputs, textareas, or any
    /// element explicitly given a value).
    pub fn value(&self, node: NodeId) -> Option<String> {
        self.lock().get(node).ok().and_then(|n| n.value.clone())
    }

    /// Parent *element*; `None` at the top of a shadow tree or at `<html>`.
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.lock();
        let parent = inner.get(node).ok()?.parent?;
        (inner.nodes[parent.0].kind == NodeKind::Element).then_some(parent)
    }

    /// Child elements of an element, shadow root or the document.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// The nearest enclosing root (shadow root or document), or the node
    /// itself when it is one.
    pub fn containing_root(&self, node: NodeId) -> NodeId {
        let inner = self.lock();
        let mut current = node;
        loop {
            let data = &inner.nodes[current.0];
            if data.is_root() {
                return current;
            }
            match data.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Host element of a shadow root.
    pub fn host(&self, root: NodeId) -> Option<NodeId> {
        self.lock().get(root).ok().and_then(|n| n.host)
    }

    /// All element descendants of `root` in document order, without
    /// crossing shadow boundaries (the `querySelectorAll('*')` view).
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let inner = self.lock();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner
            .get(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if inner.nodes[id.0].kind == NodeKind::Element {
                out.push(id);
            }
            stack.extend(inner.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Concatenated text of the element and its light-DOM descendants.
    /// Shadow content is excluded, as with platform `textContent`.
    pub fn text_content(&self, el: NodeId) -> String {
        let inner = self.lock();
        let mut out = String::new();
        if inner.get(el).is_ok() {
            inner.collect_text(el, &mut out);
        }
        out
    }

    /// The selected `<option>` child, if any.
    pub fn selected_option(&self, select: NodeId) -> Option<NodeId> {
        let inner = self.lock();
        inner
            .get(select)
            .ok()?
            .children
            .iter()
            .copied()
            .find(|c| inner.nodes[c.0].selected && inner.nodes[c.0].tag == "option")
    }

    /// `<select>` value: the selected option's `value` attribute, falling
    /// back to its text; empty when nothing is selected.
    pub fn select_value(&self, select: NodeId) -> String {
        match self.selected_option(select) {
            Some(option) => self
                .attr(option, "value")
                .unwrap_or_else(|| self.text_content(option)),
            None => String::new(),
        }
    }

    // ---- shadow roots ----

    /// Attach a shadow root to `host`. The requested mode passes through the
    /// installed interceptor first (the bridge coerces `closed` to `open`),
    /// and the interceptor runs again after the root exists.
    pub fn attach_shadow(&self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        let interceptor = self.lock().shadow_interceptor.clone();
        let mode = interceptor
            .as_ref()
            .map(|i| i.rewrite_mode(mode))
            .unwrap_or(mode);
        let root = {
            let mut inner = self.lock();
            inner.check_element(host)?;
            if inner.nodes[host.0].shadow_root.is_some() {
                return Err(RecorderError::ShadowAlreadyAttached(host));
            }
            let root = NodeId(inner.nodes.len());
            let mut node = NodeData::new(NodeKind::ShadowRoot, "#shadow-root");
            node.shadow_mode = Some(mode);
            node.host = Some(host);
            inner.nodes.push(node);
            inner.nodes[host.0].shadow_root = Some(root);
            root
        };
        if let Some(interceptor) = interceptor {
            interceptor.attached(self, root);
        }
        Ok(root)
    }

    /// The element's shadow root if it is observable from page context:
    /// `None` for closed roots, like the platform `shadowRoot` accessor.
    pub fn shadow_root(&self, el: NodeId) -> Option<NodeId> {
        let inner = self.lock();
        let root = inner.get(el).ok()?.shadow_root?;
        (inner.nodes[root.0].shadow_mode == Some(ShadowMode::Open)).then_some(root)
    }

    /// Privileged accessor: returns the shadow root regardless of mode.
    /// Errors when the environment lacks the accessor or the host rejects
    /// the probe.
    pub fn open_or_closed_shadow_root(&self, el: NodeId) -> Result<Option<NodeId>> {
        let inner = self.lock();
        if !inner.privileged_shadow_access {
            return Err(RecorderError::PrivilegedAccessUnavailable);
        }
        let node = inner.get(el)?;
        if node.probe_trap {
            return Err(RecorderError::HostileShadowProbe(el));
        }
        Ok(node.shadow_root)
    }

    pub fn shadow_mode(&self, root: NodeId) -> Option<ShadowMode> {
        self.lock().get(root).ok().and_then(|n| n.shadow_mode)
    }

    // ---- custom elements ----

    /// Register a custom element. The constructor passes through the
    /// installed define interceptor, exactly once, at definition time.
    pub fn define(&self, name: &str, ctor: ElementConstructor) {
        let mut inner = self.lock();
        let ctor = match &inner.define_interceptor {
            Some(interceptor) => interceptor.wrap(name, ctor),
            None => ctor,
        };
        inner.custom_elements.insert(name.to_ascii_lowercase(), ctor);
    }

    // ---- hooks & observers ----

    pub fn install_shadow_interceptor(&self, interceptor: Arc<dyn ShadowAttachInterceptor>) {
        self.lock().shadow_interceptor = Some(interceptor);
    }

    pub fn install_define_interceptor(&self, interceptor: Arc<dyn DefineInterceptor>) {
        self.lock().define_interceptor = Some(interceptor);
    }

    /// Observe node additions anywhere under the document root.
    pub fn observe_subtree(&self, callback: MutationCallback) {
        self.lock().observers.push(callback);
    }

    // ---- events ----

    pub fn add_event_listener(
        &self,
        root: NodeId,
        kind: EventKind,
        callback: ListenerFn,
    ) -> ListenerId {
        let mut inner = self.lock();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.entry(root).or_default().push(ListenerEntry {
            id,
            kind,
            callback,
        });
        id
    }

    pub fn remove_event_listener(&self, root: NodeId, id: ListenerId) {
        let mut inner = self.lock();
        if let Some(entries) = inner.listeners.get_mut(&root) {
            entries.retain(|e| e.id != id);
        }
    }

    pub fn dispatch_click(&self, target: NodeId) {
        self.dispatch(target, EventKind::Click, None);
    }

    pub fn dispatch_input(&self, target: NodeId) {
        self.dispatch(target, EventKind::Input, None);
    }

    pub fn dispatch_change(&self, target: NodeId) {
        self.dispatch(target, EventKind::Change, None);
    }

    /// Key events may target the document itself (global shortcuts).
    pub fn dispatch_keydown(&self, target: NodeId, key: KeyInput) {
        self.dispatch(target, EventKind::KeyDown, Some(key));
    }

    /// Synchronous capture-phase dispatch: listeners fire root by root from
    /// the document inward along the composed path. Callbacks run outside
    /// the document lock.
    fn dispatch(&self, target: NodeId, kind: EventKind, key: Option<KeyInput>) {
        let (path, owner_root, deliveries) = {
            let inner = self.lock();
            if inner.get(target).is_err() {
                return;
            }
            let mut path = Vec::new();
            let mut current = Some(target);
            while let Some(id) = current {
                path.push(id);
                let node = &inner.nodes[id.0];
                current = node.parent.or(node.host);
            }
            let owner_root = path
                .iter()
                .copied()
                .find(|id| inner.nodes[id.0].is_root())
                .unwrap_or(inner.document);
            let mut deliveries: Vec<(NodeId, Vec<ListenerFn>)> = Vec::new();
            for root in path.iter().rev().filter(|id| inner.nodes[id.0].is_root()) {
                let callbacks: Vec<ListenerFn> = inner
                    .listeners
                    .get(root)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|e| e.kind == kind)
                            .map(|e| Arc::clone(&e.callback))
                            .collect()
                    })
                    .unwrap_or_default();
                if !callbacks.is_empty() {
                    deliveries.push((*root, callbacks));
                }
            }
            (path, owner_root, deliveries)
        };
        for (root, callbacks) in deliveries {
            let event = DomEvent {
                kind,
                target,
                current_root: root,
                owner_root,
                composed_path: path.clone(),
                key: key.clone(),
            };
            for callback in callbacks {
                callback(self, &event);
            }
        }
    }
}

impl DomInner {
    fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id.0).ok_or(RecorderError::NoSuchNode(id))
    }

    fn check_element(&self, id: NodeId) -> Result<()> {
        if self.get(id)?.kind != NodeKind::Element {
            return Err(RecorderError::NotAnElement(id));
        }
        Ok(())
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push_str(&node.text);
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }
}
