//! The proof-tree data model: `Node`, `NodeTree` ("segment"), and the
//! end-of-branch `EndState` flag they cooperate with.

use std::collections::HashSet;
use std::fmt;

use kdebug_konfig::Konfig;

use crate::life::Listeners;

/// The terminal (or non-terminal) condition a node was left in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Normal,
    ProofEnd,
    ProofEndFailed,
    Stuck,
    Error,
}

impl Default for NodeState {
    fn default() -> Self {
        NodeState::Normal
    }
}

/// One state in a symbolic-execution proof.
///
/// Created once per id; the id is unique process-wide. The configuration
/// body is absent until a `konfig` round-trip fetches it. `collapsed` is a
/// pure UI annotation (see module docs on [`crate`]): the core models the
/// bit, an external renderer decides what to do with it.
#[derive(Debug)]
pub struct Node {
    id: u64,
    state: NodeState,
    configuration: Option<Vec<Konfig>>,
    collapsed: bool,
}

impl Node {
    fn new(id: u64) -> Self {
        Node {
            id,
            state: NodeState::Normal,
            configuration: None,
            collapsed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn configuration(&self) -> Option<&[Konfig]> {
        self.configuration.as_deref()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            NodeState::Normal => write!(f, "{}", self.id),
            NodeState::ProofEnd => write!(f, "({})", self.id),
            NodeState::ProofEndFailed => write!(f, "failed_end({})", self.id),
            NodeState::Stuck => write!(f, "stuck({})", self.id),
            NodeState::Error => write!(f, "error({})", self.id),
        }
    }
}

/// Errors raised when the engine announces a node relationship the client
/// cannot reconcile against the tree it has built so far. These are all
/// fatal per the error taxonomy: a routing failure means the engine's
/// dialect no longer matches what the client expects.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("parent node {0} is not part of this tree")]
    ParentNotFound(u64),
    #[error("addChild target {parent} is not the tail of its segment")]
    NotTail { parent: u64 },
    #[error("branch point {0} has already been branched once")]
    AlreadyBranched(u64),
    #[error("node {0} not found")]
    NodeNotFound(u64),
}

/// A maximal linearly-chained run of nodes (a "segment"), plus the ordered
/// list of child segments created the one time this segment's tail branched.
///
/// `ids` is the set of every id anywhere in this subtree (this segment and
/// all descendants), kept up to date incrementally so that routing a lookup
/// for an arbitrary id costs O(depth) rather than a full subtree walk.
#[derive(Debug)]
pub struct NodeTree {
    nodes: Vec<Node>,
    children: Vec<NodeTree>,
    ids: HashSet<u64>,
}

impl NodeTree {
    fn singleton(id: u64) -> Self {
        let mut ids = HashSet::new();
        ids.insert(id);
        NodeTree {
            nodes: vec![Node::new(id)],
            children: Vec::new(),
            ids,
        }
    }

    fn tail_id(&self) -> u64 {
        self.nodes.last().expect("segment is never empty").id
    }

    fn add_child(&mut self, parent: u64, child: u64) -> Result<(), TreeError> {
        if self.children.is_empty() {
            if self.tail_id() != parent {
                return Err(TreeError::NotTail { parent });
            }
            self.nodes.push(Node::new(child));
            self.ids.insert(child);
            return Ok(());
        }
        for subtree in &mut self.children {
            if subtree.ids.contains(&parent) {
                subtree.add_child(parent, child)?;
                self.ids.insert(child);
                return Ok(());
            }
        }
        Err(TreeError::ParentNotFound(parent))
    }

    fn add_children(&mut self, parent: u64, children: &[u64]) -> Result<(), TreeError> {
        if self.children.is_empty() {
            if self.tail_id() != parent {
                return Err(TreeError::NotTail { parent });
            }
            for &id in children {
                self.children.push(NodeTree::singleton(id));
                self.ids.insert(id);
            }
            return Ok(());
        }
        if self.tail_id() == parent {
            return Err(TreeError::AlreadyBranched(parent));
        }
        for subtree in &mut self.children {
            if subtree.ids.contains(&parent) {
                subtree.add_children(parent, children)?;
                for &id in children {
                    self.ids.insert(id);
                }
                return Ok(());
            }
        }
        Err(TreeError::ParentNotFound(parent))
    }

    fn find_node_mut(&mut self, id: u64) -> Option<&mut Node> {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            return Some(node);
        }
        if !self.ids.contains(&id) {
            return None;
        }
        self.children
            .iter_mut()
            .find(|c| c.ids.contains(&id))
            .and_then(|c| c.find_node_mut(id))
    }

    pub fn find_node(&self, id: u64) -> Option<&Node> {
        if let Some(node) = self.nodes.iter().find(|n| n.id == id) {
            return Some(node);
        }
        if !self.ids.contains(&id) {
            return None;
        }
        self.children
            .iter()
            .find(|c| c.ids.contains(&id))
            .and_then(|c| c.find_node(id))
    }

    /// Returns the segment that directly holds `id` in its own linear chain.
    pub fn find_tree(&self, id: u64) -> Option<&NodeTree> {
        if self.nodes.iter().any(|n| n.id == id) {
            return Some(self);
        }
        if !self.ids.contains(&id) {
            return None;
        }
        self.children
            .iter()
            .find(|c| c.ids.contains(&id))
            .and_then(|c| c.find_tree(id))
    }

    pub fn children(&self) -> &[NodeTree] {
        &self.children
    }

    pub fn segment(&self) -> &[Node] {
        &self.nodes
    }
}

/// The proof tree: a [`NodeTree`] rooted at the engine's first reported
/// prompt id, plus the change listeners notified after every mutation.
///
/// A `NodeTree` is never destroyed before the process exits; segments only
/// grow. Listeners are plain notifications with no payload — observers
/// re-read whatever state they need, matching the "publish mutations as
/// events" design this crate settles on (no re-entrant callbacks during a
/// mutation).
pub struct ProofTree {
    root: NodeTree,
    listeners: Listeners,
}

impl ProofTree {
    pub fn new(root_id: u64) -> Self {
        ProofTree {
            root: NodeTree::singleton(root_id),
            listeners: Listeners::new(),
        }
    }

    pub fn change_listeners(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    pub fn add_child(&mut self, parent: u64, child: u64) -> Result<(), TreeError> {
        self.root.add_child(parent, child)?;
        self.listeners.notify();
        Ok(())
    }

    pub fn add_children(&mut self, parent: u64, children: &[u64]) -> Result<(), TreeError> {
        self.root.add_children(parent, children)?;
        self.listeners.notify();
        Ok(())
    }

    pub fn set_node_state(&mut self, id: u64, state: NodeState) -> Result<(), TreeError> {
        let node = self
            .root
            .find_node_mut(id)
            .ok_or(TreeError::NodeNotFound(id))?;
        node.state = state;
        self.listeners.notify();
        Ok(())
    }

    pub fn set_configuration(&mut self, id: u64, konfig: Vec<Konfig>) -> Result<(), TreeError> {
        let node = self
            .root
            .find_node_mut(id)
            .ok_or(TreeError::NodeNotFound(id))?;
        node.configuration = Some(konfig);
        self.listeners.notify();
        Ok(())
    }

    pub fn toggle_collapsed(&mut self, id: u64) -> Result<(), TreeError> {
        let node = self
            .root
            .find_node_mut(id)
            .ok_or(TreeError::NodeNotFound(id))?;
        node.toggle_collapsed();
        self.listeners.notify();
        Ok(())
    }

    pub fn find_node(&self, id: u64) -> Option<&Node> {
        self.root.find_node(id)
    }

    pub fn find_tree(&self, id: u64) -> Option<&NodeTree> {
        self.root.find_tree(id)
    }

    pub fn root(&self) -> &NodeTree {
        &self.root
    }
}

/// The engine's last word on a finished branch, mutated by the stderr
/// recognizer and sampled (and reset) by the scheduler at `on_proof_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndState {
    #[default]
    Nothing,
    Stuck,
    FailedEnd,
    Error,
}

impl EndState {
    pub fn to_node_state(self) -> NodeState {
        match self {
            EndState::Nothing => NodeState::ProofEnd,
            EndState::Stuck => NodeState::Stuck,
            EndState::FailedEnd => NodeState::ProofEndFailed,
            EndState::Error => NodeState::Error,
        }
    }
}
