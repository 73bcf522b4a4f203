// regcomp.rs - NFA compiler.
//
// Thompson construction from pattern trees into an arena of NFA states,
// the epsilon closure and move operations used by the NFA matcher and the
// subset construction, and the compile/finalize entry points.
//
// Every fragment has exactly one start and one end state. End states are
// fresh epsilon states whose successors are patched in by the parent node.

use std::fmt;

use log::debug;

use crate::ccl::CharClass;
use crate::error::RegexError;
use crate::regdef::*;
use crate::regdfa::{pregex_dfa_default_trans, pregex_dfa_from_nfa, pregex_dfa_minimize};
use crate::regenc::Encoding;
use crate::regint::{PatternInfo, RegexType};
use crate::regparse::pregex_ptn_parse;
use crate::regparse_types::{Ptn, PtnNode};

/// Index of a state in its automaton.
pub type StateId = usize;

// === NFA State ===

/// One NFA state. Without a guard class the state is an epsilon state and
/// both successors are taken without consuming input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaState {
    pub ccl: Option<CharClass>,
    pub next: Option<StateId>,
    pub next2: Option<StateId>,
    /// Capture opened when passing this state.
    pub ref_open: Option<usize>,
    /// Capture closed when passing this state.
    pub ref_close: Option<usize>,
    pub accept: Accept,
}

impl NfaState {
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.ccl.is_none()
    }

    /// True if the guard admits `ch` or, when given, `other`.
    #[inline]
    pub fn admits(&self, ch: CodePoint, other: Option<CodePoint>) -> bool {
        match &self.ccl {
            Some(ccl) => ccl.test(ch) || other.is_some_and(|o| ccl.test(o)),
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Fragment {
    start: StateId,
    end: StateId,
}

/// Result of an epsilon closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Sorted state ids.
    pub states: Vec<StateId>,
    pub accept: Accept,
}

// === NFA ===

#[derive(Debug, Clone)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub start: Option<StateId>,
    pub ref_count: usize,
    min: CodePoint,
    max: CodePoint,
}

impl Nfa {
    pub fn new(min: CodePoint, max: CodePoint) -> Self {
        Nfa {
            states: Vec::new(),
            start: None,
            ref_count: 0,
            min,
            max,
        }
    }

    pub fn for_encoding(enc: &dyn Encoding) -> Self {
        Nfa::new(enc.min_code(), enc.max_code())
    }

    #[inline]
    pub fn min(&self) -> CodePoint {
        self.min
    }

    #[inline]
    pub fn max(&self) -> CodePoint {
        self.max
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn push(&mut self, state: NfaState) -> StateId {
        self.states.push(state);
        self.states.len() - 1
    }

    fn epsilon(&mut self) -> StateId {
        self.push(NfaState::default())
    }

    /// Add one pattern tree to the machine.
    ///
    /// Accepting states keep the accept metadata of the tree. A tree without
    /// any accept gets `id` on its final state. Capture indices continue from
    /// the patterns compiled before, unless `NO_REF` is set.
    ///
    /// On error the machine is left as it was.
    pub fn add_ptn(&mut self, ptn: &Ptn, id: u32, flags: RegexFlags) -> Result<(), RegexError> {
        let no_ref = flags.contains(RegexFlags::NO_REF);
        let (state_count, ref_count) = (self.states.len(), self.ref_count);
        let frag = match self.compile(ptn, no_ref) {
            Ok(frag) => frag,
            Err(err) => {
                self.states.truncate(state_count);
                self.ref_count = ref_count;
                return Err(err);
            }
        };
        if !ptn.has_accept() {
            let greedy = !flags.contains(RegexFlags::NONGREEDY);
            self.states[frag.end].accept = Accept::new(id, greedy, Anchors::empty());
        }

        self.start = Some(match self.start {
            None => frag.start,
            Some(old) => self.push(NfaState {
                next: Some(old),
                next2: Some(frag.start),
                ..NfaState::default()
            }),
        });
        Ok(())
    }

    fn compile(&mut self, ptn: &Ptn, no_ref: bool) -> Result<Fragment, RegexError> {
        let frag = match &ptn.node {
            PtnNode::Char(ccl) => {
                if ccl.min() != self.min || ccl.max() != self.max {
                    return Err(RegexError::IncompatibleDomain);
                }
                let end = self.epsilon();
                let start = self.push(NfaState {
                    ccl: Some(ccl.clone()),
                    next: Some(end),
                    ..NfaState::default()
                });
                Fragment { start, end }
            }
            PtnNode::Seq(l, r) => {
                let fl = self.compile(l, no_ref)?;
                let fr = self.compile(r, no_ref)?;
                self.states[fl.end].next = Some(fr.start);
                Fragment {
                    start: fl.start,
                    end: fr.end,
                }
            }
            PtnNode::Alt(l, r) => {
                let fl = self.compile(l, no_ref)?;
                let fr = self.compile(r, no_ref)?;
                let end = self.epsilon();
                let start = self.push(NfaState {
                    next: Some(fl.start),
                    next2: Some(fr.start),
                    ..NfaState::default()
                });
                self.states[fl.end].next = Some(end);
                self.states[fr.end].next = Some(end);
                Fragment { start, end }
            }
            PtnNode::Kle(c) => {
                let fc = self.compile(c, no_ref)?;
                let end = self.epsilon();
                let start = self.push(NfaState {
                    next: Some(fc.start),
                    next2: Some(end),
                    ..NfaState::default()
                });
                self.states[fc.end].next = Some(fc.start);
                self.states[fc.end].next2 = Some(end);
                Fragment { start, end }
            }
            PtnNode::Pos(c) => {
                let fc = self.compile(c, no_ref)?;
                let end = self.epsilon();
                self.states[fc.end].next = Some(fc.start);
                self.states[fc.end].next2 = Some(end);
                Fragment {
                    start: fc.start,
                    end,
                }
            }
            PtnNode::Opt(c) => {
                let fc = self.compile(c, no_ref)?;
                let end = self.epsilon();
                let start = self.push(NfaState {
                    next: Some(fc.start),
                    next2: Some(end),
                    ..NfaState::default()
                });
                self.states[fc.end].next = Some(end);
                Fragment { start, end }
            }
            PtnNode::Sub(c) if !no_ref => {
                // pre-order: the outer group gets the lower index
                let idx = self.ref_count;
                self.ref_count += 1;
                let fc = self.compile(c, no_ref)?;
                let end = self.push(NfaState {
                    ref_close: Some(idx),
                    ..NfaState::default()
                });
                let start = self.push(NfaState {
                    next: Some(fc.start),
                    ref_open: Some(idx),
                    ..NfaState::default()
                });
                self.states[fc.end].next = Some(end);
                Fragment { start, end }
            }
            PtnNode::Sub(c) | PtnNode::RefSub(c) => self.compile(c, no_ref)?,
        };

        if let Some(acc) = &ptn.accept {
            self.states[frag.end].accept = *acc;
        }
        Ok(frag)
    }

    /// States reachable from `seeds` without consuming input.
    ///
    /// The accept of the closure is merged from all its accepting states:
    /// the lowest pattern id wins.
    pub fn epsilon_closure(&self, seeds: &[StateId]) -> Closure {
        let mut seen = vec![false; self.states.len()];
        let mut stack: Vec<StateId> = seeds.to_vec();
        let mut out = Closure::default();

        while let Some(id) = stack.pop() {
            if seen[id] {
                continue;
            }
            seen[id] = true;
            out.states.push(id);

            let st = &self.states[id];
            out.accept.merge(&st.accept);
            if st.is_epsilon() {
                stack.extend(st.next2);
                stack.extend(st.next);
            }
        }

        out.states.sort_unstable();
        out
    }

    /// Successors of all states in `set` whose guard covers `[begin, end]`.
    pub fn move_range(&self, set: &[StateId], begin: CodePoint, end: CodePoint) -> Vec<StateId> {
        let mut out: Vec<StateId> = set
            .iter()
            .filter_map(|&id| {
                let st = &self.states[id];
                match &st.ccl {
                    Some(ccl) if ccl.test_range(begin, end) => st.next,
                    _ => None,
                }
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Successors of all states in `set` whose guard admits `ch` or, when
    /// given, its other case `other`.
    pub fn move_code(&self, set: &[StateId], ch: CodePoint, other: Option<CodePoint>) -> Vec<StateId> {
        let mut out: Vec<StateId> = set
            .iter()
            .filter_map(|&id| {
                let st = &self.states[id];
                if st.admits(ch, other) {
                    st.next
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// A copy whose guards also admit the other case of every member.
    pub fn case_folded(&self) -> Nfa {
        let mut nfa = self.clone();
        for st in &mut nfa.states {
            if let Some(ccl) = &st.ccl {
                st.ccl = Some(ccl.case_folded());
            }
        }
        nfa
    }

    /// True if any state accepts.
    pub fn has_accept(&self) -> bool {
        self.states.iter().any(|s| s.accept.is_accepting())
    }
}

pub(crate) fn fmt_accept(f: &mut fmt::Formatter<'_>, acc: &Accept) -> fmt::Result {
    if let Some(id) = acc.accept {
        write!(f, " accept={}", id)?;
        if !acc.greedy {
            write!(f, " nongreedy")?;
        }
        if !acc.anchors.is_unanchored() {
            write!(f, " anchors={:?}", acc.anchors)?;
        }
    }
    Ok(())
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NFA states={} refs={}", self.states.len(), self.ref_count)?;
        match self.start {
            Some(s) => writeln!(f, " start={}", s)?,
            None => writeln!(f, " start=none")?,
        }
        for (i, st) in self.states.iter().enumerate() {
            write!(f, "{:4}:", i)?;
            match &st.ccl {
                Some(ccl) => write!(f, " [{}]", ccl)?,
                None => write!(f, " eps")?,
            }
            match (st.next, st.next2) {
                (Some(a), Some(b)) => write!(f, " -> {}, {}", a, b)?,
                (Some(a), None) | (None, Some(a)) => write!(f, " -> {}", a)?,
                (None, None) => {}
            }
            if let Some(r) = st.ref_open {
                write!(f, " open={}", r)?;
            }
            if let Some(r) = st.ref_close {
                write!(f, " close={}", r)?;
            }
            fmt_accept(f, &st.accept)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

// === Compile entry points ===

/// Add a pattern tree to an object that has not been finalized yet.
///
/// Returns the number of patterns compiled into the object so far.
pub fn pregex_compile_ptn(reg: &mut RegexType, ptn: &Ptn, id: u32) -> Result<usize, RegexError> {
    let flags = reg.flags;
    if reg.is_finalized() {
        return Err(RegexError::InvalidArgument);
    }
    let nfa = &mut reg.nfa;
    let first_ref = nfa.ref_count;
    nfa.add_ptn(ptn, id, flags)?;
    reg.patterns.push(PatternInfo {
        id,
        refs: first_ref..nfa.ref_count,
    });
    if flags.contains(RegexFlags::DEBUG) {
        debug!("compiled pattern {} into NFA with {} states", id, nfa.len());
    }
    Ok(reg.patterns.len())
}

/// Parse `pattern` with the object's flags and add it under `id`.
pub fn pregex_compile(reg: &mut RegexType, pattern: &[u8], id: u32) -> Result<usize, RegexError> {
    if reg.is_finalized() {
        return Err(RegexError::InvalidArgument);
    }
    let ptn = pregex_ptn_parse(pattern, reg.flags, id)?;
    pregex_compile_ptn(reg, &ptn, id)
}

/// Build the minimized DFA with default transitions from the NFA.
///
/// Under `INSENSITIVE` the DFA is built over case-folded guards. Calling
/// this on a finalized object does nothing.
pub fn pregex_finalize(reg: &mut RegexType) -> Result<(), RegexError> {
    if reg.is_finalized() {
        return Ok(());
    }
    if reg.is_debug() {
        debug!("finalizing\n{}", reg.nfa);
    }

    let mut dfa = if reg.flags.contains(RegexFlags::INSENSITIVE) {
        let mut dfa = pregex_dfa_from_nfa(&reg.nfa.case_folded())?;
        dfa.set_case_folded();
        dfa
    } else {
        pregex_dfa_from_nfa(&reg.nfa)?
    };
    let built = dfa.len();
    pregex_dfa_minimize(&mut dfa)?;
    pregex_dfa_default_trans(&mut dfa);

    if reg.is_debug() {
        debug!("DFA: {} states, {} after minimization\n{}", built, dfa.len(), dfa);
    }
    reg.dfa = Some(dfa);
    reg.update_start_bytes();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nfa_for(pattern: &str, flags: RegexFlags) -> Nfa {
        let mut reg = RegexType::new(flags);
        pregex_compile(&mut reg, pattern.as_bytes(), 0).unwrap();
        reg.nfa
    }

    /// Run the NFA over `text`; returns the accept of the final closure.
    fn run(nfa: &Nfa, text: &str) -> Accept {
        let mut cur = nfa.epsilon_closure(&[nfa.start.unwrap()]);
        for ch in text.chars() {
            let next = nfa.move_code(&cur.states, ch as u32, None);
            if next.is_empty() {
                return Accept::default();
            }
            cur = nfa.epsilon_closure(&next);
        }
        cur.accept
    }

    #[test]
    fn single_char() {
        let nfa = nfa_for("a", RegexFlags::empty());
        assert_eq!(run(&nfa, "a").accept, Some(0));
        assert_eq!(run(&nfa, "").accept, None);
        assert_eq!(run(&nfa, "b").accept, None);
        assert_eq!(run(&nfa, "aa").accept, None);
    }

    #[test]
    fn closures() {
        let nfa = nfa_for("ab*c+d?", RegexFlags::empty());
        for ok in ["ac", "abc", "abbbccd", "acd"] {
            assert!(run(&nfa, ok).is_accepting(), "{:?} should be accepted", ok);
        }
        for bad in ["a", "ab", "abd", "acdd"] {
            assert!(!run(&nfa, bad).is_accepting(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn alternation() {
        let nfa = nfa_for("ab|cd|e", RegexFlags::empty());
        assert!(run(&nfa, "ab").is_accepting());
        assert!(run(&nfa, "cd").is_accepting());
        assert!(run(&nfa, "e").is_accepting());
        assert!(!run(&nfa, "ad").is_accepting());
    }

    #[test]
    fn lowest_id_wins() {
        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"[a-z]+", 5).unwrap();
        assert_eq!(pregex_compile(&mut reg, b"if", 2).unwrap(), 2);
        assert_eq!(run(&reg.nfa, "if").accept, Some(2));
        assert_eq!(run(&reg.nfa, "ifx").accept, Some(5));
    }

    #[test]
    fn capture_tags_are_preorder() {
        let nfa = nfa_for("((a)b)(c)", RegexFlags::empty());
        assert_eq!(nfa.ref_count, 3);
        let start = nfa.epsilon_closure(&[nfa.start.unwrap()]);
        let mut opened: Vec<usize> = start
            .states
            .iter()
            .filter_map(|&s| nfa.states[s].ref_open)
            .collect();
        opened.sort_unstable();
        assert_eq!(opened, vec![0, 1]);

        let nfa = nfa_for("((a)b)(c)", RegexFlags::NO_REF);
        assert_eq!(nfa.ref_count, 0);
        assert!(nfa.states.iter().all(|s| s.ref_open.is_none()));
    }

    #[test]
    fn refs_continue_across_patterns() {
        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"(a)", 0).unwrap();
        pregex_compile(&mut reg, b"(b)(c)", 1).unwrap();
        assert_eq!(reg.ref_count(), 3);
        assert_eq!(reg.pattern_refs(1), Some(1..3));
    }

    #[test]
    fn closure_merges_equal_ids() {
        let nfa = nfa_for("^a|a", RegexFlags::empty());
        let start = nfa.epsilon_closure(&[nfa.start.unwrap()]);
        let after = nfa.epsilon_closure(&nfa.move_code(&start.states, 'a' as u32, None));
        assert_eq!(after.accept.accept, Some(0));
        assert!(after.accept.anchors.is_unanchored());
        assert!(after.accept.anchors.iter().any(|a| a == Anchors::BOL));
    }

    #[test]
    fn incompatible_domain() {
        let mut reg = RegexType::new(RegexFlags::empty());
        let wide = Ptn::parse("x", RegexFlags::WCHAR).unwrap();
        let err = pregex_compile_ptn(&mut reg, &wide, 0).unwrap_err();
        assert_eq!(err, RegexError::IncompatibleDomain);
    }

    #[test]
    fn failed_compile_leaves_machine_untouched() {
        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"(a)", 0).unwrap();
        let states = reg.nfa.len();

        // the group is numbered before its wide class is rejected
        let wide = Ptn::parse("(x)", RegexFlags::WCHAR).unwrap();
        let err = pregex_compile_ptn(&mut reg, &wide, 1).unwrap_err();
        assert_eq!(err, RegexError::IncompatibleDomain);
        assert_eq!(reg.nfa.len(), states);
        assert_eq!(reg.ref_count(), 1);
        assert_eq!(reg.pattern_count(), 1);

        pregex_compile(&mut reg, b"(b)", 2).unwrap();
        assert_eq!(reg.pattern_refs(2), Some(1..2));
    }

    #[test]
    fn insensitive_finalize_folds_guards() {
        let mut reg = RegexType::new(RegexFlags::INSENSITIVE);
        pregex_compile(&mut reg, b"Ab|ac", 0).unwrap();
        pregex_finalize(&mut reg).unwrap();
        let dfa = reg.dfa.as_ref().unwrap();
        assert!(dfa.is_case_folded());
        assert_eq!(dfa.accepts("ab".chars().map(|c| c as u32)), Some(0));
        assert_eq!(dfa.accepts("AC".chars().map(|c| c as u32)), Some(0));
        // the NFA keeps the guards as written
        assert_eq!(run(&reg.nfa, "ab").accept, None);
    }

    #[test]
    fn compile_after_finalize_fails() {
        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"a", 0).unwrap();
        pregex_finalize(&mut reg).unwrap();
        pregex_finalize(&mut reg).unwrap();
        assert!(reg.is_finalized());
        assert_eq!(
            pregex_compile(&mut reg, b"b", 1).unwrap_err(),
            RegexError::InvalidArgument
        );
    }

    #[test]
    fn finalize_empty_object_fails() {
        let mut reg = RegexType::new(RegexFlags::empty());
        let err = pregex_finalize(&mut reg).unwrap_err();
        assert_eq!(err.code(), PREGEX_ERR_NO_START);
    }

    #[test]
    fn start_bytes_for_literal_prefix() {
        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"foo|far", 0).unwrap();
        pregex_finalize(&mut reg).unwrap();
        assert_eq!(reg.start_bytes.as_deref(), Some(&b"f"[..]));

        let mut reg = RegexType::new(RegexFlags::INSENSITIVE);
        pregex_compile(&mut reg, b"foo", 0).unwrap();
        pregex_finalize(&mut reg).unwrap();
        assert_eq!(reg.start_bytes.as_deref(), Some(&b"Ff"[..]));

        let mut reg = RegexType::new(RegexFlags::empty());
        pregex_compile(&mut reg, b"[a-z]x", 0).unwrap();
        pregex_finalize(&mut reg).unwrap();
        assert!(reg.start_bytes.is_none());
    }

    #[test]
    fn dump() {
        let nfa = nfa_for("(a)", RegexFlags::empty());
        let s = nfa.to_string();
        assert!(s.starts_with("NFA states=4 refs=1 start="), "{}", s);
        assert!(s.contains("[a]"));
        assert!(s.contains("open=0"));
        assert!(s.contains("close=0 accept=0"));
    }
}
