//! Radix tree implementation for efficient HTTP route matching
//!
//! This module provides a compressed prefix tree (radix tree) for O(k) route
//! matching where k is the path length, independent of how many routes are
//! registered.
//!
//! ## Implementation Details
//!
//! - Static nodes own a run of literal **bytes**, not whole path segments, so
//!   `/users` and `/usage` share the `/us` node.
//! - A node has any number of static children (distinct first bytes, kept in
//!   priority order) and at most one dynamic child (param, regex or catch-all).
//! - Nodes live in an arena addressed by [`NodeId`]; splitting a node moves its
//!   contents to a new slot instead of rewiring the parent.
//! - Endpoints are stored per node and per verb, so a lookup that reaches a node
//!   serving only other verbs can report "method not allowed".
//!
//! ## Matching order
//!
//! At every node the static child is tried first, then the dynamic child. If
//! the static branch dead-ends the matcher backtracks into the dynamic branch,
//! which is how `/users/admin` and `/users/:id` coexist.

use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

use super::error::RouteError;
use super::node::{Arena, Endpoint, Node, NodeId, NodeKind};
use super::pattern::{ParsedPattern, Segment, Token};
use crate::verb::{Verb, VerbRegistry, VerbSet};
use crate::router::core::MAX_INLINE_PARAMS;

/// Byte ranges of captured parameter values, in pattern order.
pub(crate) type Captures = SmallVec<[(usize, usize); MAX_INLINE_PARAMS]>;

/// Outcome of a single trie walk.
pub(crate) struct Lookup<'t, H> {
    pub endpoint: Option<&'t Arc<Endpoint<H>>>,
    pub captures: Captures,
    /// Verbs served by nodes the path reached without a handler for the requested verb
    pub allowed: VerbSet,
}

/// The routing trie. Not safe for concurrent registration; the facade
/// serialises writers.
#[derive(Debug)]
pub(crate) struct Tree<H> {
    arena: Arena<H>,
    root: NodeId,
}

impl<H> Default for Tree<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Tree<H> {
    pub(crate) fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.push(Node::new_static(b""));
        Self { arena, root }
    }

    #[inline]
    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<H> {
        self.arena.get(id)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn render(&self, verbs: &VerbRegistry) -> String {
        self.arena.render(self.root, verbs)
    }

    /// Insert `parsed` for `verbs`.
    ///
    /// Conflicts are detected by a read-only walk before anything is mutated,
    /// so a rejected pattern leaves the tree untouched.
    pub(crate) fn insert(
        &mut self,
        verbs: VerbSet,
        parsed: &ParsedPattern,
        endpoint: &Arc<Endpoint<H>>,
    ) -> Result<(), RouteError> {
        self.check(verbs, parsed)?;

        let mut cur = self.root;
        self.arena.get_mut(cur).priority += 1;
        for token in &parsed.tokens {
            cur = match token {
                Token::Literal(text) => self.insert_literal(cur, text.as_bytes()),
                Token::Dynamic(seg) => self.insert_dynamic(cur, seg),
            };
        }
        self.arena.get_mut(cur).endpoints.set(verbs, endpoint);

        debug!(
            pattern = %parsed.pattern,
            params = parsed.keys.len(),
            nodes = self.arena.len(),
            "Route inserted into radix tree"
        );
        Ok(())
    }

    // Walk the tree as `insert` would, without mutating, and report the first
    // conflict. Once the walk leaves existing nodes nothing can conflict.
    fn check(&self, verbs: VerbSet, parsed: &ParsedPattern) -> Result<(), RouteError> {
        let mut cur = self.root;
        // bytes of `cur`'s prefix matched so far
        let mut off = 0usize;
        let mut walked = String::new();

        for token in &parsed.tokens {
            match token {
                Token::Literal(text) => {
                    let mut rest = text.as_bytes();
                    loop {
                        let node = self.arena.get(cur);
                        if node.is_static() {
                            let lcp = common_prefix(rest, &node.prefix[off..]);
                            off += lcp;
                            rest = &rest[lcp..];
                            if off < node.prefix.len() {
                                if rest.is_empty() {
                                    break;
                                }
                                return Ok(());
                            }
                        }
                        if rest.is_empty() {
                            break;
                        }
                        match node.child(rest[0]) {
                            Some(child) => {
                                cur = child;
                                off = 0;
                            }
                            None => return Ok(()),
                        }
                    }
                    walked.push_str(text);
                }
                Token::Dynamic(seg) => {
                    let node = self.arena.get(cur);
                    if node.is_static() && off < node.prefix.len() {
                        // the split will create a fresh position
                        return Ok(());
                    }
                    let Some(wild) = node.wild else {
                        return Ok(());
                    };
                    let existing = self.arena.get(wild);
                    if !existing.kind.accepts(seg) {
                        return Err(RouteError::conflict(
                            &parsed.pattern,
                            &walked,
                            format!(
                                "wildcard '{}' conflicts with existing wildcard '{}'",
                                seg.raw,
                                String::from_utf8_lossy(&existing.prefix)
                            ),
                        ));
                    }
                    cur = wild;
                    off = existing.prefix.len();
                    walked.push_str(&seg.raw);
                }
            }
        }

        let node = self.arena.get(cur);
        if node.is_static() && off < node.prefix.len() {
            return Ok(());
        }
        if let Some(existing) = node.endpoints.overlapping(verbs) {
            return Err(RouteError::conflict(
                &parsed.pattern,
                &walked,
                format!("a handler is already registered here by '{existing}'"),
            ));
        }
        Ok(())
    }

    // Consume `bytes` starting at `cur`, splitting and creating static nodes.
    // Returns the node whose prefix ends exactly where `bytes` ends.
    fn insert_literal(&mut self, mut cur: NodeId, mut bytes: &[u8]) -> NodeId {
        loop {
            if self.arena.get(cur).is_static() {
                let lcp = common_prefix(bytes, &self.arena.get(cur).prefix);
                if lcp < self.arena.get(cur).prefix.len() {
                    self.split(cur, lcp);
                }
                bytes = &bytes[lcp..];
            }
            if bytes.is_empty() {
                return cur;
            }

            if let Some(i) = self.arena.get(cur).child_index(bytes[0]) {
                let i = self.bump_child(cur, i);
                cur = self.arena.get(cur).children[i];
                continue;
            }

            let child = self.arena.push(Node::new_static(bytes));
            let parent = self.arena.get_mut(cur);
            parent.indices.push(bytes[0]);
            parent.children.push(child);
            let last = parent.children.len() - 1;
            self.bump_child(cur, last);
            return child;
        }
    }

    fn insert_dynamic(&mut self, cur: NodeId, seg: &Segment) -> NodeId {
        if let Some(wild) = self.arena.get(cur).wild {
            self.arena.get_mut(wild).priority += 1;
            return wild;
        }
        let mut node = Node::new_dynamic(seg);
        node.priority = 1;
        let wild = self.arena.push(node);
        self.arena.get_mut(cur).wild = Some(wild);
        wild
    }

    // Shorten `id` to its first `at` bytes and demote the remainder, with all
    // children and endpoints, to a new sole child.
    fn split(&mut self, id: NodeId, at: usize) {
        let node = self.arena.get_mut(id);
        let demoted = Node {
            prefix: node.prefix.split_off(at),
            kind: NodeKind::Static,
            // the insertion in progress was already counted but does not pass below the split
            priority: node.priority.saturating_sub(1),
            indices: std::mem::take(&mut node.indices),
            children: std::mem::take(&mut node.children),
            wild: node.wild.take(),
            endpoints: std::mem::take(&mut node.endpoints),
        };
        let first = demoted.prefix[0];
        let child = self.arena.push(demoted);
        let node = self.arena.get_mut(id);
        node.indices = vec![first];
        node.children = vec![child];
    }

    // Increment the priority of child `i` and bubble it toward the front past
    // siblings with a lower count. Returns its new position.
    fn bump_child(&mut self, parent: NodeId, i: usize) -> usize {
        let child = self.arena.get(parent).children[i];
        self.arena.get_mut(child).priority += 1;
        let priority = self.arena.get(child).priority;

        let mut pos = i;
        while pos > 0 {
            let prev = self.arena.get(parent).children[pos - 1];
            if self.arena.get(prev).priority >= priority {
                break;
            }
            let node = self.arena.get_mut(parent);
            node.children.swap(pos - 1, pos);
            node.indices.swap(pos - 1, pos);
            pos -= 1;
        }
        pos
    }

    /// Resolve `path` for `verb` (`None` for a verb the registry has never seen).
    pub(crate) fn lookup(&self, verb: Option<Verb>, path: &str) -> Lookup<'_, H> {
        let mut walk = Walk {
            tree: self,
            path,
            verb,
            captures: Captures::new(),
            allowed: VerbSet::EMPTY,
        };
        let endpoint = walk.search(self.root, 0);
        Lookup {
            endpoint,
            captures: walk.captures,
            allowed: walk.allowed,
        }
    }
}

struct Walk<'t, 'p, H> {
    tree: &'t Tree<H>,
    path: &'p str,
    verb: Option<Verb>,
    captures: Captures,
    allowed: VerbSet,
}

impl<'t, H> Walk<'t, '_, H> {
    // Match node `id` at byte `pos`, then its subtree. Captures pushed by a
    // failed branch are rolled back before returning.
    fn search(&mut self, id: NodeId, pos: usize) -> Option<&'t Arc<Endpoint<H>>> {
        let tree = self.tree;
        let node = tree.node(id);
        let bytes = self.path.as_bytes();
        let saved = self.captures.len();

        let pos = match &node.kind {
            NodeKind::Static => {
                if !bytes[pos..].starts_with(&node.prefix) {
                    return None;
                }
                pos + node.prefix.len()
            }
            NodeKind::Param { tail } => {
                let end = capture_end(bytes, pos, *tail);
                if end == pos {
                    return None;
                }
                self.captures.push((pos, end));
                end
            }
            NodeKind::Regex { tail, regex, .. } => {
                let end = capture_end(bytes, pos, *tail);
                if end == pos {
                    return None;
                }
                let value = self.path.get(pos..end)?;
                if !regex.is_match(value) {
                    return None;
                }
                self.captures.push((pos, end));
                end
            }
            NodeKind::CatchAll => {
                self.captures.push((pos, bytes.len()));
                bytes.len()
            }
        };

        if pos == bytes.len() {
            if let Some(endpoint) = node.endpoints.get(self.verb) {
                return Some(endpoint);
            }
            self.allowed = self.allowed.union(node.endpoints.mask().without_stub());
            // a catch-all may capture nothing
            if let Some(wild) = node.wild {
                if tree.node(wild).kind.is_catch_all() {
                    if let Some(found) = self.search(wild, pos) {
                        return Some(found);
                    }
                }
            }
            self.captures.truncate(saved);
            return None;
        }

        if let Some(child) = node.child(bytes[pos]) {
            if let Some(found) = self.search(child, pos) {
                return Some(found);
            }
        }
        if let Some(wild) = node.wild {
            if let Some(found) = self.search(wild, pos) {
                return Some(found);
            }
        }

        self.captures.truncate(saved);
        None
    }
}

/// End of a capture starting at `pos`: the first `tail` byte, the first `/`,
/// or the end of the path.
#[inline]
pub(crate) fn capture_end(bytes: &[u8], pos: usize, tail: u8) -> usize {
    bytes[pos..]
        .iter()
        .position(|&b| b == tail || b == b'/')
        .map_or(bytes.len(), |p| pos + p)
}

#[inline]
fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::pattern;
    use http::Method;

    struct Fixture {
        tree: Tree<&'static str>,
        verbs: VerbRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: Tree::new(),
                verbs: VerbRegistry::new(),
            }
        }

        fn add(&mut self, method: Method, pat: &str, handler: &'static str) -> Result<(), RouteError> {
            let parsed = pattern::parse(pat)?;
            let verb = self.verbs.register(&method)?;
            let endpoint = Arc::new(Endpoint {
                handler,
                pattern: Arc::clone(&parsed.pattern),
                param_keys: parsed.keys.clone().into(),
            });
            self.tree.insert(verb.mask(), &parsed, &endpoint)
        }

        fn find(&self, method: Method, path: &str) -> Option<(&'static str, Vec<(String, String)>)> {
            let lookup = self.tree.lookup(self.verbs.get(&method), path);
            let endpoint = lookup.endpoint?;
            let params = endpoint
                .param_keys
                .iter()
                .zip(lookup.captures.iter())
                .map(|(k, (s, e))| (k.to_string(), path[*s..*e].to_string()))
                .collect();
            Some((endpoint.handler, params))
        }
    }

    #[test]
    fn test_static_routes_share_prefixes() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/users", "users").unwrap();
        f.add(Method::GET, "/usage", "usage").unwrap();
        f.add(Method::GET, "/u", "u").unwrap();

        assert_eq!(f.find(Method::GET, "/users").unwrap().0, "users");
        assert_eq!(f.find(Method::GET, "/usage").unwrap().0, "usage");
        assert_eq!(f.find(Method::GET, "/u").unwrap().0, "u");
        assert!(f.find(Method::GET, "/us").is_none());
        assert!(f.find(Method::GET, "/user").is_none());
    }

    #[test]
    fn test_split_preserves_existing_endpoint() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/search/users", "long").unwrap();
        f.add(Method::GET, "/search", "short").unwrap();
        assert_eq!(f.find(Method::GET, "/search/users").unwrap().0, "long");
        assert_eq!(f.find(Method::GET, "/search").unwrap().0, "short");
    }

    #[test]
    fn test_param_capture_and_children() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/users/:id", "user").unwrap();
        f.add(Method::GET, "/users/:uid/posts", "posts").unwrap();

        let (h, params) = f.find(Method::GET, "/users/7").unwrap();
        assert_eq!(h, "user");
        assert_eq!(params, vec![("id".into(), "7".into())]);

        // keys come from the endpoint, not the shared node
        let (h, params) = f.find(Method::GET, "/users/7/posts").unwrap();
        assert_eq!(h, "posts");
        assert_eq!(params, vec![("uid".into(), "7".into())]);

        assert!(f.find(Method::GET, "/users/").is_none());
    }

    #[test]
    fn test_static_wins_then_backtracks_to_param() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/users/:id/profile", "profile").unwrap();
        f.add(Method::GET, "/users/admin/settings", "settings").unwrap();

        assert_eq!(f.find(Method::GET, "/users/admin/settings").unwrap().0, "settings");
        // static "admin" branch has no /profile, so fall back to the param
        let (h, params) = f.find(Method::GET, "/users/admin/profile").unwrap();
        assert_eq!(h, "profile");
        assert_eq!(params, vec![("id".into(), "admin".into())]);
    }

    #[test]
    fn test_param_with_literal_suffix() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/files/{name}.json", "json").unwrap();
        let (_, params) = f.find(Method::GET, "/files/report.json").unwrap();
        assert_eq!(params, vec![("name".into(), "report".into())]);
        assert!(f.find(Method::GET, "/files/a/b.json").is_none());
        assert!(f.find(Method::GET, "/files/report").is_none());
    }

    #[test]
    fn test_regex_rejects_and_backtracks() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/items/{id:[0-9]+}", "by_id").unwrap();
        f.add(Method::GET, "/items/new", "new").unwrap();

        assert_eq!(f.find(Method::GET, "/items/42").unwrap().0, "by_id");
        assert_eq!(f.find(Method::GET, "/items/new").unwrap().0, "new");
        assert!(f.find(Method::GET, "/items/abc").is_none());
        assert!(f.find(Method::GET, "/items/newer").is_none());
    }

    #[test]
    fn test_catch_all_captures_remainder() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/files/*path", "files").unwrap();
        let (_, params) = f.find(Method::GET, "/files/a/b/c").unwrap();
        assert_eq!(params, vec![("path".into(), "a/b/c".into())]);
        let (_, params) = f.find(Method::GET, "/files/").unwrap();
        assert_eq!(params, vec![("path".into(), String::new())]);
        assert!(f.find(Method::GET, "/files").is_none());
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/a/:x", "one").unwrap();
        let err = f.add(Method::GET, "/a/:y", "two").unwrap_err();
        assert!(matches!(err, RouteError::PatternConflict { .. }), "{err}");
        // a different verb on the same node is fine
        f.add(Method::POST, "/a/:y", "three").unwrap();
    }

    #[test]
    fn test_incompatible_wildcards_conflict() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/src/*path", "all").unwrap();
        let err = f.add(Method::GET, "/src/:file", "one").unwrap_err();
        match err {
            RouteError::PatternConflict { prefix, reason, .. } => {
                assert_eq!(prefix, "/src/");
                assert!(reason.contains("*path"));
            }
            other => panic!("unexpected {other}"),
        }
        let err = f.add(Method::GET, "/src/{n:[a-z]+}", "re").unwrap_err();
        assert!(matches!(err, RouteError::PatternConflict { .. }));
    }

    #[test]
    fn test_rejected_pattern_leaves_tree_untouched() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/v1/:id", "a").unwrap();
        let before = f.tree.node_count();
        assert!(f.add(Method::GET, "/v1/{id:[0-9]+}/x", "b").is_err());
        assert_eq!(f.tree.node_count(), before);
    }

    #[test]
    fn test_method_not_allowed_collects_verbs() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/a/b", "get").unwrap();
        f.add(Method::DELETE, "/a/b", "delete").unwrap();
        let lookup = f.tree.lookup(f.verbs.get(&Method::PUT), "/a/b");
        assert!(lookup.endpoint.is_none());
        assert_eq!(
            f.verbs.methods(lookup.allowed),
            vec![Method::GET, Method::DELETE]
        );
    }

    #[test]
    fn test_priority_reorders_siblings() {
        let mut f = Fixture::new();
        f.add(Method::GET, "/a", "a").unwrap();
        f.add(Method::GET, "/b", "b").unwrap();
        f.add(Method::GET, "/b/1", "b1").unwrap();
        f.add(Method::GET, "/b/2", "b2").unwrap();

        let root = f.tree.node(f.tree.root());
        let slash = f.tree.node(root.children[0]);
        assert_eq!(slash.prefix, b"/");
        // "b" has seen more insertions than "a" and moved to the front
        assert_eq!(slash.indices, vec![b'b', b'a']);
        let front = f.tree.node(slash.children[0]);
        let back = f.tree.node(slash.children[1]);
        assert!(front.priority >= back.priority);
    }
}
