use super::{Dom, NodeId};

/// DOM event classes the recorder listens for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    /// `change`, as fired by `<select>` elements on selection.
    Change,
    KeyDown,
}

/// Raw keyboard state attached to a [`EventKind::KeyDown`] dispatch.
#[derive(Clone, Debug)]
pub struct KeyInput {
    /// Key name as the platform reports it (`"a"`, `"Enter"`, `"Escape"`).
    pub key: String,
    pub ctrl: bool,
    /// Cmd on macOS.
    pub meta: bool,
}

impl KeyInput {
    pub fn plain(key: &str) -> Self {
        KeyInput {
            key: key.to_string(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: &str) -> Self {
        KeyInput {
            key: key.to_string(),
            ctrl: true,
            meta: false,
        }
    }
}

/// Unique handle for a registered event listener, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(super) u64);

/// An event as delivered to a listener.
///
/// `target` is the true originating node; `composed_path` is the full
/// propagation path through shadow boundaries, target first, document last.
/// `current_root` is the root whose listener is being invoked and
/// `owner_root` the innermost root containing the target; a listener that
/// only wants one delivery per action compares the two.
#[derive(Clone, Debug)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub current_root: NodeId,
    pub owner_root: NodeId,
    pub composed_path: Vec<NodeId>,
    pub key: Option<KeyInput>,
}

impl DomEvent {
    /// The target as a listener at `current_root` would see it: ancestors of
    /// the true target are substituted by their shadow hosts until the node
    /// lives in the listener's tree. Mirrors platform event retargeting.
    pub fn visible_target(&self, dom: &Dom) -> NodeId {
        let mut node = self.target;
        loop {
            let root = dom.containing_root(node);
            if root == self.current_root {
                return node;
            }
            match dom.host(root) {
                Some(host) => node = host,
                None => return node,
            }
        }
    }
}
