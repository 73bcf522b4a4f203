// regexec.rs - Matching engine.
//
// Runs either machine from a byte offset, one character at a time, and
// searches forward for the first position a match starts at. Anchors are
// checked only when an accepting position is reached. Capture spans of a
// found match are resolved by replaying the NFA over the matched text.

use std::ops::Range;

use log::trace;
use memchr::{memchr, memchr2, memchr3};
use smallvec::{smallvec, SmallVec};

use crate::regcomp::{Nfa, StateId};
use crate::regdef::*;
use crate::regdfa::Dfa;
use crate::regenc::*;
use crate::regint::{RegexType, StartBytes};
use crate::unicode;

/// A match as found by the engine. Offsets are bytes into the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub accept: Accept,
    pub start: usize,
    pub end: usize,
    /// Capture spans, indexed by capture number minus one. Empty under `NO_REF`.
    pub refs: Vec<Option<Range<usize>>>,
}

impl RawMatch {
    #[inline]
    pub fn id(&self) -> u32 {
        self.accept.accept.unwrap_or(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// === Anchors ===

/// Check `anchors` for a candidate match `text[start..end]`.
pub fn pregex_check_anchors(
    enc: &dyn Encoding,
    text: &[u8],
    start: usize,
    end: usize,
    anchors: Anchors,
) -> bool {
    if anchors.is_empty() {
        return true;
    }
    let before = prev_code(enc, text, start);
    let after = next_code(enc, text, end).map(|(c, _)| c);

    if anchors.contains(Anchors::BOL) && !before.map_or(true, is_newline_code) {
        return false;
    }
    if anchors.contains(Anchors::EOL) && !after.map_or(true, is_newline_code) {
        return false;
    }
    if anchors.contains(Anchors::BOW) && before.is_some_and(is_word_code) {
        return false;
    }
    if anchors.contains(Anchors::EOW) && after.is_some_and(is_word_code) {
        return false;
    }
    true
}

/// Longest-match preference for `acc` under the runtime `flags`.
#[inline]
fn is_greedy(acc: &Accept, flags: RegexFlags) -> bool {
    if flags.contains(RegexFlags::GREEDY) {
        true
    } else if flags.contains(RegexFlags::NONGREEDY) {
        false
    } else {
        acc.greedy
    }
}

/// Shared state of one match attempt.
struct Attempt<'a> {
    enc: &'a dyn Encoding,
    flags: RegexFlags,
    text: &'a [u8],
    start: usize,
    best: Option<RawMatch>,
}

impl<'a> Attempt<'a> {
    fn new(reg: &'a RegexType, text: &'a [u8], start: usize) -> Self {
        Attempt {
            enc: reg.enc,
            flags: reg.flags,
            text,
            start,
            best: None,
        }
    }

    #[inline]
    fn anchors_hold(&self, anchors: &AnchorSet, end: usize) -> bool {
        self.flags.contains(RegexFlags::NO_ANCHORS)
            || anchors.any(|a| pregex_check_anchors(self.enc, self.text, self.start, end, a))
    }

    /// Record an accepting position. Returns true if matching should stop.
    fn accept(&mut self, acc: &Accept, pos: usize) -> bool {
        if !acc.is_accepting() || pos == self.start || !self.anchors_hold(&acc.anchors, pos) {
            return false;
        }
        self.best = Some(RawMatch {
            accept: *acc,
            start: self.start,
            end: pos,
            refs: Vec::new(),
        });
        !is_greedy(acc, self.flags)
    }

    /// Next character, and its other case under `INSENSITIVE`.
    fn next_char(&self, pos: usize, max: CodePoint) -> Option<(CodePoint, Option<CodePoint>, usize)> {
        let (ch, len) = next_code(self.enc, self.text, pos)?;
        let other = if self.flags.contains(RegexFlags::INSENSITIVE) {
            unicode::swap_case(ch, max)
        } else {
            None
        };
        Some((ch, other, len))
    }
}

// === Machine Runs ===

/// Match `dfa` against `text` starting exactly at byte `start`.
///
/// The DFA reads characters as they are; a case-folded DFA already admits
/// both cases. Capture spans are left empty.
pub fn pregex_dfa_match(reg: &RegexType, dfa: &Dfa, text: &[u8], start: usize) -> Option<RawMatch> {
    if dfa.is_empty() {
        return None;
    }
    let mut at = Attempt::new(reg, text, start);
    let mut state: StateId = 0;
    let mut pos = start;

    loop {
        let st = &dfa.states[state];
        if at.accept(&st.accept, pos) {
            break;
        }
        let Some((ch, len)) = next_code(at.enc, text, pos) else {
            break;
        };
        let Some(next) = st.step(ch) else {
            break;
        };
        pos += len;
        state = next;
    }
    at.best
}

/// Match `nfa` against `text` starting exactly at byte `start`.
///
/// Under `INSENSITIVE` a state is left if its guard admits the character
/// or its other case. Capture spans are left empty.
pub fn pregex_nfa_match(reg: &RegexType, nfa: &Nfa, text: &[u8], start: usize) -> Option<RawMatch> {
    let first = nfa.start?;
    let mut at = Attempt::new(reg, text, start);
    let mut cur = nfa.epsilon_closure(&[first]);
    let mut pos = start;

    loop {
        if at.accept(&cur.accept, pos) {
            break;
        }
        let Some((ch, other, len)) = at.next_char(pos, nfa.max()) else {
            break;
        };
        let moved = nfa.move_code(&cur.states, ch, other);
        if moved.is_empty() {
            break;
        }
        pos += len;
        cur = nfa.epsilon_closure(&moved);
    }
    at.best
}

// === Capture Resolution ===

type Slots = SmallVec<[Option<usize>; 8]>;

/// One NFA thread: a state and the capture positions seen on its path.
struct Thread {
    state: StateId,
    slots: Slots,
}

/// Add `state` and everything reachable from it without input to `list`,
/// in priority order. States already in the list keep their first thread.
fn add_thread(nfa: &Nfa, list: &mut Vec<Thread>, seen: &mut [bool], state: StateId, slots: Slots, pos: usize) {
    let mut stack = vec![(state, slots)];
    while let Some((id, mut slots)) = stack.pop() {
        if seen[id] {
            continue;
        }
        seen[id] = true;
        let st = &nfa.states[id];
        if let Some(r) = st.ref_open {
            slots[2 * r] = Some(pos);
        }
        if let Some(r) = st.ref_close {
            slots[2 * r + 1] = Some(pos);
        }
        if st.is_epsilon() {
            if let Some(n) = st.next2 {
                stack.push((n, slots.clone()));
            }
            if let Some(n) = st.next {
                stack.push((n, slots.clone()));
            }
        }
        list.push(Thread { state: id, slots });
    }
}

/// Resolve the capture spans of `m` by replaying the NFA over its span.
///
/// Every NFA state holds at most one thread with its own capture slots;
/// threads are ordered so that repetitions prefer more iterations and
/// alternations their left branch. The first thread that ends in an
/// accepting state of the matched pattern at the end of the match wins.
fn pregex_resolve_refs(reg: &RegexType, nfa: &Nfa, text: &[u8], m: &RawMatch) -> Vec<Option<Range<usize>>> {
    let unresolved = || vec![None; nfa.ref_count];
    let Some(first) = nfa.start else {
        return unresolved();
    };
    let at = Attempt::new(reg, text, m.start);
    let mut seen = vec![false; nfa.len()];
    let mut list = Vec::new();
    add_thread(nfa, &mut list, &mut seen, first, smallvec![None; 2 * nfa.ref_count], m.start);

    let mut pos = m.start;
    while pos < m.end {
        let Some((ch, other, len)) = at.next_char(pos, nfa.max()) else {
            return unresolved();
        };
        pos += len;
        seen.iter_mut().for_each(|s| *s = false);
        let mut next = Vec::with_capacity(list.len());
        for t in list {
            let st = &nfa.states[t.state];
            if let Some(to) = st.next.filter(|_| st.admits(ch, other)) {
                add_thread(nfa, &mut next, &mut seen, to, t.slots, pos);
            }
        }
        list = next;
    }

    list.iter()
        .find(|t| {
            let acc = &nfa.states[t.state].accept;
            acc.accept == m.accept.accept && at.anchors_hold(&acc.anchors, m.end)
        })
        .map_or_else(unresolved, |t| {
            t.slots
                .chunks(2)
                .map(|span| match *span {
                    [Some(s), Some(e)] if s <= e => Some(s..e),
                    _ => None,
                })
                .collect()
        })
}

/// Match the object's machine at exactly byte `start`.
pub fn pregex_match_at(reg: &RegexType, text: &[u8], start: usize) -> Option<RawMatch> {
    let mut m = match reg.active_dfa() {
        Some(dfa) => pregex_dfa_match(reg, dfa, text, start),
        None => pregex_nfa_match(reg, &reg.nfa, text, start),
    };
    if let Some(m) = &mut m {
        if reg.ref_count() > 0 && !reg.flags.contains(RegexFlags::NO_REF) {
            let refs = pregex_resolve_refs(reg, &reg.nfa, text, m);
            m.refs = refs;
        }
    }
    if reg.is_debug() {
        match &m {
            Some(m) => trace!("match at {}: id={} len={}", start, m.id(), m.len()),
            None => trace!("no match at {}", start),
        }
    }
    m
}

fn skip_to(bytes: &StartBytes, hay: &[u8]) -> Option<usize> {
    match bytes.as_slice() {
        [a] => memchr(*a, hay),
        [a, b] => memchr2(*a, *b, hay),
        [a, b, c] => memchr3(*a, *b, *c, hay),
        _ => Some(0),
    }
}

/// First match starting at or after byte `from`.
pub fn pregex_search(reg: &RegexType, text: &[u8], from: usize) -> Option<RawMatch> {
    let mut pos = from;
    while pos < text.len() {
        if let Some(bytes) = &reg.start_bytes {
            pos += skip_to(bytes, &text[pos..])?;
        }
        if let Some(m) = pregex_match_at(reg, text, pos) {
            return Some(m);
        }
        pos = step_forward(reg.enc, text, pos);
    }
    None
}
