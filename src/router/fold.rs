//! Case-insensitive path recovery.
//!
//! Used only to build a redirect suggestion: the walk re-runs the descent
//! comparing literal bytes case-insensitively and returns the path spelled the
//! way it was registered. Captured parameter values are copied verbatim.
//!
//! Static prefixes are byte runs, so a node boundary can fall inside a
//! multi-byte character. Each candidate spelling of a path character is kept
//! in a [`RuneBuf`] and drained across as many nodes as it takes.

use smallvec::SmallVec;

use super::node::{NodeId, NodeKind};
use super::radix::{capture_end, Tree};
use crate::verb::Verb;

/// Bytes of one encoded character not yet matched against the trie.
#[derive(Debug, Clone, Copy)]
struct RuneBuf {
    buf: [u8; 4],
    start: usize,
    len: usize,
}

impl RuneBuf {
    fn new(c: char) -> Self {
        let mut buf = [0u8; 4];
        let len = c.encode_utf8(&mut buf).len();
        Self { buf, start: 0, len }
    }

    #[inline]
    fn pending(&self) -> &[u8] {
        &self.buf[self.start..self.len]
    }

    #[inline]
    fn encoded(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        self.start += n;
    }
}

/// Spellings of `c` to try: as written, then its single-char lower and upper
/// case forms.
fn variants(c: char) -> SmallVec<[char; 3]> {
    let mut out: SmallVec<[char; 3]> = SmallVec::new();
    out.push(c);
    for mapped in [single(c.to_lowercase()), single(c.to_uppercase())]
        .into_iter()
        .flatten()
    {
        if !out.contains(&mapped) {
            out.push(mapped);
        }
    }
    out
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Find a registered spelling of `path` for `verb`, ignoring ASCII and Unicode
/// case in literal text. With `fix_trailing_slash` a single missing or extra
/// trailing `/` is corrected too.
pub(crate) fn find_case_insensitive<H>(
    tree: &Tree<H>,
    verb: Option<Verb>,
    path: &str,
    fix_trailing_slash: bool,
) -> Option<String> {
    let mut walk = Fold {
        tree,
        path,
        verb,
        fix_trailing_slash,
        out: Vec::with_capacity(path.len() + 1),
    };
    if walk.walk(tree.root(), 0, 0) {
        String::from_utf8(walk.out).ok()
    } else {
        None
    }
}

struct Fold<'t, 'p, H> {
    tree: &'t Tree<H>,
    path: &'p str,
    verb: Option<Verb>,
    fix_trailing_slash: bool,
    out: Vec<u8>,
}

impl<'t, H> Fold<'t, '_, H> {
    // Literal bytes of `id` still to be matched from `off`.
    fn remaining(&self, id: NodeId, off: usize) -> &'t [u8] {
        let node = self.tree.node(id);
        if node.is_static() {
            &node.prefix[off..]
        } else {
            &[]
        }
    }

    fn has_endpoint(&self, id: NodeId) -> bool {
        self.tree.node(id).endpoints.get(self.verb).is_some()
    }

    // Drain `rune` starting at byte `off` of node `id`, stepping into static
    // children as each prefix runs out.
    fn advance(&self, mut id: NodeId, mut off: usize, mut rune: RuneBuf) -> Option<(NodeId, usize)> {
        while !rune.pending().is_empty() {
            let rest = self.remaining(id, off);
            if rest.is_empty() {
                id = self.tree.node(id).child(rune.pending()[0])?;
                off = 0;
                continue;
            }
            let n = rest
                .iter()
                .zip(rune.pending())
                .take_while(|(a, b)| a == b)
                .count();
            if n == 0 {
                return None;
            }
            off += n;
            rune.consume(n);
            if rune.pending().is_empty() {
                break;
            }
            if off < self.tree.node(id).prefix.len() {
                return None;
            }
        }
        Some((id, off))
    }

    // Match the path from byte `pos`, positioned at byte `off` of node `id`.
    fn walk(&mut self, id: NodeId, off: usize, pos: usize) -> bool {
        let rest = self.remaining(id, off);
        if rest.is_empty() {
            return self.walk_children(id, pos);
        }

        let Some(c) = self.path.get(pos..).and_then(|s| s.chars().next()) else {
            // path ended inside this prefix; only a missing trailing slash is fixable
            if self.fix_trailing_slash && rest == b"/" && self.has_endpoint(id) {
                self.out.push(b'/');
                return true;
            }
            return false;
        };

        self.try_char(id, off, pos, c)
    }

    // Try each spelling of `c` from the current position.
    fn try_char(&mut self, id: NodeId, off: usize, pos: usize, c: char) -> bool {
        let mark = self.out.len();
        for v in variants(c) {
            let rune = RuneBuf::new(v);
            if let Some((next, next_off)) = self.advance(id, off, rune) {
                self.out.extend_from_slice(rune.encoded());
                if self.walk(next, next_off, pos + c.len_utf8()) {
                    return true;
                }
                self.out.truncate(mark);
            }
        }
        false
    }

    // All of node `id` has been matched; continue with its children.
    fn walk_children(&mut self, id: NodeId, pos: usize) -> bool {
        let tree = self.tree;
        let node = tree.node(id);

        if pos >= self.path.len() {
            if self.has_endpoint(id) {
                return true;
            }
            if let Some(wild) = node.wild {
                if tree.node(wild).kind.is_catch_all() && self.has_endpoint(wild) {
                    return true;
                }
            }
            if self.fix_trailing_slash {
                if let Some(child) = node.child(b'/') {
                    if tree.node(child).prefix == b"/" && self.has_endpoint(child) {
                        self.out.push(b'/');
                        return true;
                    }
                }
            }
            return false;
        }

        if let Some(c) = self.path.get(pos..).and_then(|s| s.chars().next()) {
            if self.try_char(id, self.static_len(id), pos, c) {
                return true;
            }
        }

        if let Some(wild) = node.wild {
            if self.walk_dynamic(wild, pos) {
                return true;
            }
        }

        if self.fix_trailing_slash && self.path.get(pos..) == Some("/") && self.has_endpoint(id) {
            return true;
        }
        false
    }

    // Offset meaning "fully matched" for node `id`.
    fn static_len(&self, id: NodeId) -> usize {
        let node = self.tree.node(id);
        if node.is_static() {
            node.prefix.len()
        } else {
            0
        }
    }

    fn walk_dynamic(&mut self, wild: NodeId, pos: usize) -> bool {
        let tree = self.tree;
        let bytes = self.path.as_bytes();
        let mark = self.out.len();
        match &tree.node(wild).kind {
            NodeKind::CatchAll => {
                self.out.extend_from_slice(&bytes[pos..]);
                if self.has_endpoint(wild) {
                    return true;
                }
            }
            NodeKind::Param { tail } | NodeKind::Regex { tail, .. } => {
                let end = capture_end(bytes, pos, *tail);
                if end == pos {
                    return false;
                }
                if let NodeKind::Regex { regex, .. } = &tree.node(wild).kind {
                    match self.path.get(pos..end) {
                        Some(value) if regex.is_match(value) => {}
                        _ => return false,
                    }
                }
                self.out.extend_from_slice(&bytes[pos..end]);
                if self.walk(wild, 0, end) {
                    return true;
                }
            }
            NodeKind::Static => {}
        }
        self.out.truncate(mark);
        false
    }
}
