//! # Verb Module
//!
//! HTTP methods are stored in the routing trie as single bits of a `u32` mask,
//! so a terminal node can answer "which verbs do I serve?" with one load and a
//! "match all verbs" registration is a single OR.
//!
//! ## Layout
//!
//! - Bits `0..9` are the built-in methods (`GET`, `HEAD`, `POST`, `PUT`,
//!   `PATCH`, `DELETE`, `CONNECT`, `OPTIONS`, `TRACE`), in that order.
//! - Bits `9..31` are handed out to custom methods by [`VerbRegistry::register`].
//! - Bit `31` is reserved for the STUB entry written by match-all registrations.
//!   A verb registered after a match-all route still resolves to that route
//!   through the STUB slot.
//!
//! The ceiling of 31 distinct verbs is surfaced as
//! [`RouteError::VerbLimit`](crate::router::RouteError::VerbLimit).

use http::Method;
use smallvec::SmallVec;

use crate::router::RouteError;

/// Number of bits available to real HTTP methods (bit 31 is the STUB bit).
pub const MAX_VERBS: usize = 31;

const STUB_BIT: u32 = 1 << 31;

/// A single HTTP method, identified by its bit index in a [`VerbSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Verb(u8);

impl Verb {
    /// Pseudo-verb holding the handler of a match-all registration.
    pub const STUB: Verb = Verb(31);

    /// Bit index of this verb.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Single-bit mask for this verb.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> VerbSet {
        VerbSet(1 << self.0)
    }
}

/// Bitmask of verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VerbSet(u32);

impl VerbSet {
    pub const EMPTY: VerbSet = VerbSet(0);
    pub const STUB: VerbSet = VerbSet(STUB_BIT);

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, verb: Verb) -> bool {
        self.0 & (1 << verb.0) != 0
    }

    #[inline]
    #[must_use]
    pub const fn intersects(self, other: VerbSet) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: VerbSet) -> VerbSet {
        VerbSet(self.0 | other.0)
    }

    /// Same set with the STUB bit cleared.
    #[inline]
    #[must_use]
    pub const fn without_stub(self) -> VerbSet {
        VerbSet(self.0 & !STUB_BIT)
    }

    #[inline]
    pub fn insert(&mut self, verb: Verb) {
        self.0 |= 1 << verb.0;
    }

    /// Iterate the verbs in this set in bit order.
    pub fn iter(self) -> impl Iterator<Item = Verb> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let idx = bits.trailing_zeros();
            bits &= bits - 1;
            Some(Verb(idx as u8))
        })
    }
}

impl From<Verb> for VerbSet {
    fn from(verb: Verb) -> Self {
        verb.mask()
    }
}

/// Maps [`http::Method`] values to bit positions.
///
/// Each [`RouteCache`](crate::router::RouteCache) owns one registry, so two
/// caches never disagree about what bit `9` means.
#[derive(Debug, Clone)]
pub struct VerbRegistry {
    methods: SmallVec<[Method; 16]>,
}

impl Default for VerbRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VerbRegistry {
    /// Registry pre-populated with the nine standard methods.
    #[must_use]
    pub fn new() -> Self {
        let methods = [
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::CONNECT,
            Method::OPTIONS,
            Method::TRACE,
        ];
        Self {
            methods: methods.into_iter().collect(),
        }
    }

    /// Look up the bit for `method`, if it has been registered.
    #[inline]
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<Verb> {
        self.methods
            .iter()
            .position(|m| m == method)
            .map(|idx| Verb(idx as u8))
    }

    /// The bit `method` has, or would get from [`VerbRegistry::register`],
    /// without assigning it.
    ///
    /// # Errors
    ///
    /// [`RouteError::VerbLimit`] once all [`MAX_VERBS`] bits are taken.
    pub fn reserve(&self, method: &Method) -> Result<Verb, RouteError> {
        if let Some(verb) = self.get(method) {
            return Ok(verb);
        }
        if self.methods.len() >= MAX_VERBS {
            return Err(RouteError::VerbLimit {
                method: method.to_string(),
            });
        }
        Ok(Verb(self.methods.len() as u8))
    }

    /// Return the bit for `method`, assigning the next free one if needed.
    ///
    /// # Errors
    ///
    /// [`RouteError::VerbLimit`] once all [`MAX_VERBS`] bits are taken.
    pub fn register(&mut self, method: &Method) -> Result<Verb, RouteError> {
        let verb = self.reserve(method)?;
        if verb.index() as usize == self.methods.len() {
            self.methods.push(method.clone());
        }
        Ok(verb)
    }

    /// Every registered verb (STUB excluded).
    #[must_use]
    pub fn all(&self) -> VerbSet {
        let n = self.methods.len() as u32;
        if n >= 32 {
            return VerbSet(u32::MAX).without_stub();
        }
        VerbSet((1u32 << n) - 1)
    }

    /// The method behind a verb. `None` for STUB or unassigned bits.
    #[must_use]
    pub fn method(&self, verb: Verb) -> Option<&Method> {
        self.methods.get(verb.0 as usize)
    }

    /// Methods of every verb in `set`, in bit order. STUB is skipped.
    #[must_use]
    pub fn methods(&self, set: VerbSet) -> Vec<Method> {
        set.without_stub()
            .iter()
            .filter_map(|verb| self.method(verb).cloned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
