//! Trie nodes.
//!
//! Nodes live in an [`Arena`] and refer to each other by [`NodeId`]. Splitting
//! a node never changes the id its parent holds: the old contents move to a
//! fresh slot which becomes the only child of the shortened node.

use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

use super::pattern::{Segment, SegmentKind};
use crate::verb::{Verb, VerbRegistry, VerbSet};

/// Stable index of a node inside its [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// What a node matches.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Literal bytes held in [`Node::prefix`].
    Static,
    /// A run of bytes up to `tail` (or `/`).
    Param { tail: u8 },
    /// A [`NodeKind::Param`] capture that must also fully match `regex`.
    Regex {
        tail: u8,
        regex: Regex,
        source: Box<str>,
    },
    /// Everything that is left of the path.
    CatchAll,
}

impl NodeKind {
    pub(crate) fn from_segment(seg: &Segment) -> Self {
        match &seg.kind {
            SegmentKind::Param => NodeKind::Param { tail: seg.tail },
            SegmentKind::Regex { regex, source } => NodeKind::Regex {
                tail: seg.tail,
                regex: regex.clone(),
                source: source.clone(),
            },
            SegmentKind::CatchAll => NodeKind::CatchAll,
        }
    }

    /// Whether `seg` may reuse a node of this kind. Names are irrelevant:
    /// keys live on the endpoint.
    pub(crate) fn accepts(&self, seg: &Segment) -> bool {
        match (self, &seg.kind) {
            (NodeKind::Param { tail }, SegmentKind::Param) => *tail == seg.tail,
            (NodeKind::Regex { tail, source, .. }, SegmentKind::Regex { source: other, .. }) => {
                *tail == seg.tail && source == other
            }
            (NodeKind::CatchAll, SegmentKind::CatchAll) => true,
            _ => false,
        }
    }

    #[inline]
    pub(crate) fn is_catch_all(&self) -> bool {
        matches!(self, NodeKind::CatchAll)
    }
}

/// A handler bound to a pattern.
#[derive(Debug)]
pub struct Endpoint<H> {
    /// The registered handler
    pub handler: H,
    /// The pattern exactly as registered
    pub pattern: Arc<str>,
    /// Parameter keys in declaration order
    pub param_keys: Arc<[Arc<str>]>,
}

/// Per-node verb table.
///
/// `mask` mirrors the occupied slots so "does this node serve anything?" and
/// the `Allow` set are a single load.
#[derive(Debug)]
pub(crate) struct Endpoints<H> {
    mask: VerbSet,
    slots: SmallVec<[(Verb, Arc<Endpoint<H>>); 2]>,
}

impl<H> Default for Endpoints<H> {
    fn default() -> Self {
        Self {
            mask: VerbSet::EMPTY,
            slots: SmallVec::new(),
        }
    }
}

impl<H> Endpoints<H> {
    #[inline]
    pub(crate) fn mask(&self) -> VerbSet {
        self.mask
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Endpoint for `verb`, falling back to the STUB slot of a match-all route.
    #[inline]
    pub(crate) fn get(&self, verb: Option<Verb>) -> Option<&Arc<Endpoint<H>>> {
        if let Some(verb) = verb {
            if self.mask.contains(verb) {
                return self.slot(verb);
            }
        }
        if self.mask.contains(Verb::STUB) {
            return self.slot(Verb::STUB);
        }
        None
    }

    fn slot(&self, verb: Verb) -> Option<&Arc<Endpoint<H>>> {
        self.slots.iter().find(|(v, _)| *v == verb).map(|(_, ep)| ep)
    }

    /// Bind `endpoint` to every verb in `verbs`. Callers check for overlap first.
    pub(crate) fn set(&mut self, verbs: VerbSet, endpoint: &Arc<Endpoint<H>>) {
        for verb in verbs.iter() {
            if self.mask.contains(verb) {
                if let Some(slot) = self.slots.iter_mut().find(|(v, _)| *v == verb) {
                    slot.1 = Arc::clone(endpoint);
                }
            } else {
                self.slots.push((verb, Arc::clone(endpoint)));
                self.mask.insert(verb);
            }
        }
    }

    /// Pattern already bound to any verb of `verbs`.
    pub(crate) fn overlapping(&self, verbs: VerbSet) -> Option<&Arc<str>> {
        self.slots
            .iter()
            .find(|(v, _)| verbs.contains(*v))
            .map(|(_, ep)| &ep.pattern)
    }
}

/// One vertex of the routing trie.
#[derive(Debug)]
pub(crate) struct Node<H> {
    /// Literal bytes for static nodes, the segment as written for dynamic ones
    pub prefix: Vec<u8>,
    pub kind: NodeKind,
    /// Insertions that passed through this node; orders sibling scans only
    pub priority: u32,
    /// First byte of each static child, aligned with `children`
    pub indices: Vec<u8>,
    /// Static children, highest priority first
    pub children: Vec<NodeId>,
    /// The single dynamic child, if any
    pub wild: Option<NodeId>,
    pub endpoints: Endpoints<H>,
}

impl<H> Node<H> {
    pub(crate) fn new_static(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.to_vec(),
            kind: NodeKind::Static,
            priority: 0,
            indices: Vec::new(),
            children: Vec::new(),
            wild: None,
            endpoints: Endpoints::default(),
        }
    }

    pub(crate) fn new_dynamic(seg: &Segment) -> Self {
        Self {
            prefix: seg.raw.as_bytes().to_vec(),
            kind: NodeKind::from_segment(seg),
            priority: 0,
            indices: Vec::new(),
            children: Vec::new(),
            wild: None,
            endpoints: Endpoints::default(),
        }
    }

    /// Position of the static child starting with `byte`.
    #[inline]
    pub(crate) fn child_index(&self, byte: u8) -> Option<usize> {
        self.indices.iter().position(|&b| b == byte)
    }

    /// Static child starting with `byte`.
    #[inline]
    pub(crate) fn child(&self, byte: u8) -> Option<NodeId> {
        self.child_index(byte).map(|i| self.children[i])
    }

    #[inline]
    pub(crate) fn is_static(&self) -> bool {
        matches!(self.kind, NodeKind::Static)
    }
}

/// Owner of every node of one trie.
#[derive(Debug)]
pub(crate) struct Arena<H> {
    nodes: Vec<Node<H>>,
}

impl<H> Arena<H> {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: Node<H>) -> NodeId {
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<H> {
        &self.nodes[id.idx()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<H> {
        &mut self.nodes[id.idx()]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Indented rendering of the subtree under `id`, one node per line.
    pub(crate) fn render(&self, id: NodeId, verbs: &VerbRegistry) -> String {
        let mut out = String::new();
        self.render_into(id, 0, verbs, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, depth: usize, verbs: &VerbRegistry, out: &mut String) {
        let node = self.get(id);
        let label = String::from_utf8_lossy(&node.prefix);
        let kind = match node.kind {
            NodeKind::Static => "static",
            NodeKind::Param { .. } => "param",
            NodeKind::Regex { .. } => "regex",
            NodeKind::CatchAll => "catch-all",
        };
        out.push_str(&format!(
            "{:indent$}{:?} [{} p={}]",
            "",
            label,
            kind,
            node.priority,
            indent = depth * 2
        ));
        if !node.endpoints.is_empty() {
            let mut methods: Vec<String> = verbs
                .methods(node.endpoints.mask())
                .iter()
                .map(ToString::to_string)
                .collect();
            if node.endpoints.mask().contains(Verb::STUB) {
                methods.push("*".to_string());
            }
            out.push_str(" -> ");
            out.push_str(&methods.join(","));
        }
        out.push('\n');
        for child in &node.children {
            self.render_into(*child, depth + 1, verbs, out);
        }
        if let Some(wild) = node.wild {
            self.render_into(wild, depth + 1, verbs, out);
        }
    }
}
