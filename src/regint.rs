// regint.rs - Internal types.
// The compiled regex object shared by the compiler, the matchers and the
// public API: flags, encoding, the machines and per-pattern bookkeeping.

use std::ops::Range;

use smallvec::SmallVec;

use crate::regcomp::Nfa;
use crate::regdef::*;
use crate::regdfa::Dfa;
use crate::regenc::{encoding_for_flags, PregexEncoding};

/// Up to three ASCII bytes one of which must start any match.
pub type StartBytes = SmallVec<[u8; 3]>;

/// Bookkeeping for one compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    /// Accept id given at compile time.
    pub id: u32,
    /// Capture indices (0-based) owned by this pattern.
    pub refs: Range<usize>,
}

/// A compiled object.
///
/// The NFA grows with every compiled pattern. Finalizing adds the minimized
/// DFA, which then serves all searches it was built for; the NFA stays
/// around to resolve capture spans and to match under a case mode the DFA
/// was not built with.
#[derive(Debug, Clone)]
pub struct RegexType {
    pub flags: RegexFlags,
    pub enc: PregexEncoding,
    pub nfa: Nfa,
    pub dfa: Option<Dfa>,
    pub patterns: Vec<PatternInfo>,
    /// Set by finalize when the DFA allows a memchr skip loop.
    pub start_bytes: Option<StartBytes>,
}

impl RegexType {
    /// An empty object over the universe selected by `flags`.
    pub fn new(flags: RegexFlags) -> Self {
        let enc = encoding_for_flags(flags);
        RegexType {
            flags,
            enc,
            nfa: Nfa::for_encoding(enc),
            dfa: None,
            patterns: Vec::new(),
            start_bytes: None,
        }
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.dfa.is_some()
    }

    /// Number of capturing sub-expressions over all patterns.
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.nfa.ref_count
    }

    /// The DFA, if there is one built for the current case mode.
    #[inline]
    pub fn active_dfa(&self) -> Option<&Dfa> {
        let insensitive = self.flags.contains(RegexFlags::INSENSITIVE);
        self.dfa.as_ref().filter(|dfa| dfa.is_case_folded() == insensitive)
    }

    #[inline]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Capture indices of the first pattern compiled with `id`.
    pub fn pattern_refs(&self, id: u32) -> Option<Range<usize>> {
        self.patterns.iter().find(|p| p.id == id).map(|p| p.refs.clone())
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.flags.contains(RegexFlags::DEBUG)
    }

    /// Replace the runtime flags. `WCHAR` keeps the value the object was
    /// created with, since the machine is built over its universe.
    pub fn set_flags(&mut self, flags: RegexFlags) {
        let wide = self.flags & RegexFlags::WCHAR;
        self.flags = (flags - RegexFlags::WCHAR) | wide;
        self.update_start_bytes();
    }

    /// Recompute the prefilter bytes for the current machine and flags.
    pub(crate) fn update_start_bytes(&mut self) {
        let insensitive = self.flags.contains(RegexFlags::INSENSITIVE);
        self.start_bytes = match &self.dfa {
            Some(_) if insensitive && self.flags.contains(RegexFlags::WCHAR) => None,
            Some(dfa) => dfa.start_bytes(insensitive),
            None => None,
        };
    }
}
