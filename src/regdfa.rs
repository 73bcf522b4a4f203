// regdfa.rs - DFA construction.
//
// Subset construction over elementary code point intervals, Moore-style
// partition refinement, and default transitions for states whose guards
// cover the whole universe.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use smallvec::SmallVec;

use crate::ccl::{CharClass, CodeRange};
use crate::error::RegexError;
use crate::regcomp::{fmt_accept, Closure, Nfa, StateId};
use crate::regdef::*;
use crate::regenc::is_code_ascii;
use crate::regint::StartBytes;
use crate::unicode;

// === DFA Types ===

/// A guarded edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaTrans {
    pub ccl: CharClass,
    pub go_to: StateId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DfaState {
    /// Explicit edges; their guards are pairwise disjoint.
    pub trans: Vec<DfaTrans>,
    /// Taken for every character no explicit guard covers.
    pub def_trans: Option<StateId>,
    pub accept: Accept,
    /// NFA states this state was built from.
    pub nfa_set: Vec<StateId>,
}

impl DfaState {
    fn from_closure(c: Closure) -> Self {
        DfaState {
            trans: Vec::new(),
            def_trans: None,
            accept: c.accept,
            nfa_set: c.states,
        }
    }

    /// Target for `ch`, if any.
    #[inline]
    pub fn step(&self, ch: CodePoint) -> Option<StateId> {
        self.trans
            .iter()
            .find(|t| t.ccl.test(ch))
            .map(|t| t.go_to)
            .or(self.def_trans)
    }

    /// Add `[begin, end]` to the edge leading to `go_to`.
    fn add_edge(&mut self, min: CodePoint, max: CodePoint, begin: CodePoint, end: CodePoint, go_to: StateId) {
        match self.trans.iter_mut().find(|t| t.go_to == go_to) {
            Some(t) => t.ccl.add_range(begin, end),
            None => {
                let mut ccl = CharClass::new(min, max);
                ccl.add_range(begin, end);
                self.trans.push(DfaTrans { ccl, go_to });
            }
        }
    }
}

/// One row of the table form of a DFA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaRow {
    pub accept: Accept,
    pub default: Option<StateId>,
    /// `(from, to, target)`, sorted by `from`.
    pub ranges: Vec<(CodePoint, CodePoint, StateId)>,
}

/// Deterministic automaton. State 0 is the start state.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub ref_count: usize,
    min: CodePoint,
    max: CodePoint,
    case_folded: bool,
}

fn malformed(code: i32) -> RegexError {
    RegexError::from(code)
}

impl Dfa {
    pub fn new(min: CodePoint, max: CodePoint, ref_count: usize) -> Self {
        Dfa {
            states: Vec::new(),
            ref_count,
            min,
            max,
            case_folded: false,
        }
    }

    /// True if the guards were case-folded before construction.
    #[inline]
    pub fn is_case_folded(&self) -> bool {
        self.case_folded
    }

    pub(crate) fn set_case_folded(&mut self) {
        self.case_folded = true;
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

    /// Follow the transition of `state` for `ch`.
    #[inline]
    pub fn step(&self, state: StateId, ch: CodePoint) -> Option<StateId> {
        self.states[state].step(ch)
    }

    /// Run the machine over `text` from the start state.
    /// Returns the state reached, or None if some character had no transition.
    pub fn run<I: IntoIterator<Item = CodePoint>>(&self, text: I) -> Option<StateId> {
        if self.states.is_empty() {
            return None;
        }
        text.into_iter().try_fold(0, |st, ch| self.step(st, ch))
    }

    /// Accept id reached after reading all of `text`.
    pub fn accepts<I: IntoIterator<Item = CodePoint>>(&self, text: I) -> Option<u32> {
        self.run(text).and_then(|st| self.states[st].accept.accept)
    }

    /// Table form: accept, default target and sorted ranges per state.
    pub fn to_matrix(&self) -> Vec<DfaRow> {
        self.states
            .iter()
            .map(|st| {
                let mut ranges: Vec<(CodePoint, CodePoint, StateId)> = st
                    .trans
                    .iter()
                    .flat_map(|t| t.ccl.ranges().iter().map(move |r| (r.begin, r.end, t.go_to)))
                    .collect();
                ranges.sort_unstable();
                DfaRow {
                    accept: st.accept,
                    default: st.def_trans,
                    ranges,
                }
            })
            .collect()
    }

    /// ASCII bytes one of which must begin every match, when there are at
    /// most three of them. With `insensitive` their other case is included.
    pub fn start_bytes(&self, insensitive: bool) -> Option<StartBytes> {
        let st = self.states.first()?;
        if st.def_trans.is_some() || st.accept.is_accepting() {
            return None;
        }
        let mut out = StartBytes::new();
        for t in &st.trans {
            for r in t.ccl.ranges() {
                if r.count() > 3 {
                    return None;
                }
                for ch in r.begin..=r.end {
                    if !is_code_ascii(ch) {
                        return None;
                    }
                    out.push(ch as u8);
                    if insensitive {
                        if let Some(other) = unicode::swap_case(ch, self.max) {
                            if !is_code_ascii(other) {
                                return None;
                            }
                            out.push(other as u8);
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        if out.is_empty() || out.len() > 3 {
            None
        } else {
            Some(out)
        }
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DFA states={} refs={}", self.states.len(), self.ref_count)?;
        for (i, st) in self.states.iter().enumerate() {
            write!(f, "{:4}:", i)?;
            fmt_accept(f, &st.accept)?;
            writeln!(f)?;
            for t in &st.trans {
                writeln!(f, "        [{}] -> {}", t.ccl, t.go_to)?;
            }
            if let Some(d) = st.def_trans {
                writeln!(f, "        default -> {}", d)?;
            }
        }
        Ok(())
    }
}

// === Subset Construction ===

/// Build a DFA from `nfa` by subset construction.
///
/// The guards leaving a subset are cut into elementary intervals at every
/// range boundary; intervals leading to the same subset share one edge.
pub fn pregex_dfa_from_nfa(nfa: &Nfa) -> Result<Dfa, RegexError> {
    let start = nfa.start.ok_or_else(|| malformed(PREGEX_ERR_NO_START))?;
    let (min, max) = (nfa.min(), nfa.max());
    let mut dfa = Dfa::new(min, max, nfa.ref_count);
    let mut index: HashMap<Vec<StateId>, StateId> = HashMap::new();

    let first = nfa.epsilon_closure(&[start]);
    index.insert(first.states.clone(), 0);
    dfa.states.push(DfaState::from_closure(first));

    let mut i = 0;
    while i < dfa.states.len() {
        let set = dfa.states[i].nfa_set.clone();

        let mut bounds: Vec<CodePoint> = Vec::new();
        for &id in &set {
            if let Some(ccl) = &nfa.states[id].ccl {
                for r in ccl.ranges() {
                    bounds.push(r.begin);
                    bounds.push(r.end + 1);
                }
            }
        }
        bounds.sort_unstable();
        bounds.dedup();

        for w in bounds.windows(2) {
            let (begin, end) = (w[0], w[1] - 1);
            let moved = nfa.move_range(&set, begin, end);
            if moved.is_empty() {
                continue;
            }
            let closure = nfa.epsilon_closure(&moved);
            let target = match index.get(&closure.states) {
                Some(&t) => t,
                None => {
                    let t = dfa.states.len();
                    index.insert(closure.states.clone(), t);
                    dfa.states.push(DfaState::from_closure(closure));
                    t
                }
            };
            dfa.states[i].add_edge(min, max, begin, end, target);
        }
        i += 1;
    }

    if !dfa.states.iter().any(|s| s.accept.is_accepting()) {
        return Err(malformed(PREGEX_ERR_UNREACHABLE_ACCEPT));
    }
    Ok(dfa)
}

// === Minimization ===

type Signature = (usize, Vec<(usize, SmallVec<[CodeRange; 4]>)>);

/// Guards of `st` united per target group.
fn group_edges(st: &DfaState, group: &[usize], min: CodePoint, max: CodePoint) -> BTreeMap<usize, CharClass> {
    let mut edges: BTreeMap<usize, CharClass> = BTreeMap::new();
    for t in &st.trans {
        let ccl = edges
            .entry(group[t.go_to])
            .or_insert_with(|| CharClass::new(min, max));
        for r in t.ccl.ranges() {
            ccl.add_range(r.begin, r.end);
        }
    }
    edges
}

/// Merge equivalent states.
///
/// Groups start out by accept metadata and are refined by
/// their edges to other groups until the group count stops changing. The
/// start state stays state 0.
pub fn pregex_dfa_minimize(dfa: &mut Dfa) -> Result<(), RegexError> {
    if dfa.states.is_empty() {
        return Err(malformed(PREGEX_ERR_NO_START));
    }
    let (min, max) = (dfa.min, dfa.max);

    let mut keys: HashMap<Accept, usize> = HashMap::new();
    let mut group: Vec<usize> = dfa
        .states
        .iter()
        .map(|st| {
            let next = keys.len();
            *keys.entry(st.accept).or_insert(next)
        })
        .collect();
    let mut count = keys.len();

    loop {
        let mut sigs: HashMap<Signature, usize> = HashMap::new();
        let refined: Vec<usize> = dfa
            .states
            .iter()
            .enumerate()
            .map(|(i, st)| {
                let edges = group_edges(st, &group, min, max)
                    .into_iter()
                    .map(|(g, ccl)| (g, SmallVec::from_slice(ccl.ranges())))
                    .collect();
                let next = sigs.len();
                *sigs.entry((group[i], edges)).or_insert(next)
            })
            .collect();
        let stable = sigs.len() == count;
        group = refined;
        count = sigs.len();
        if stable {
            break;
        }
    }

    let mut merged: Vec<Option<DfaState>> = vec![None; count];
    for (i, st) in dfa.states.iter().enumerate() {
        let g = group[i];
        match &mut merged[g] {
            Some(m) => m.nfa_set.extend_from_slice(&st.nfa_set),
            slot @ None => {
                let trans = group_edges(st, &group, min, max)
                    .into_iter()
                    .map(|(go_to, ccl)| DfaTrans { ccl, go_to })
                    .collect();
                *slot = Some(DfaState {
                    trans,
                    def_trans: None,
                    accept: st.accept,
                    nfa_set: st.nfa_set.clone(),
                });
            }
        }
    }

    dfa.states = merged.into_iter().flatten().collect();
    for st in &mut dfa.states {
        st.nfa_set.sort_unstable();
        st.nfa_set.dedup();
    }
    Ok(())
}

// === Default Transitions ===

/// Move the widest edge of every state whose guards cover the whole
/// universe into the default slot.
pub fn pregex_dfa_default_trans(dfa: &mut Dfa) {
    let (min, max) = (dfa.min, dfa.max);
    for st in &mut dfa.states {
        if st.def_trans.is_some() || st.trans.is_empty() {
            continue;
        }
        let mut all = CharClass::new(min, max);
        for t in &st.trans {
            for r in t.ccl.ranges() {
                all.add_range(r.begin, r.end);
            }
        }
        if !all.is_full() {
            continue;
        }
        let mut widest = 0;
        for (i, t) in st.trans.iter().enumerate() {
            if t.ccl.count() > st.trans[widest].ccl.count() {
                widest = i;
            }
        }
        let t = st.trans.remove(widest);
        st.def_trans = Some(t.go_to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regcomp::pregex_compile;
    use crate::regint::RegexType;

    fn nfa_for(patterns: &[&str], flags: RegexFlags) -> Nfa {
        let mut reg = RegexType::new(flags);
        for (i, p) in patterns.iter().enumerate() {
            pregex_compile(&mut reg, p.as_bytes(), i as u32).unwrap();
        }
        reg.nfa
    }

    fn codes(s: &str) -> Vec<CodePoint> {
        s.chars().map(|c| c as CodePoint).collect()
    }

    /// All strings over `alphabet` up to length `n`.
    fn words(alphabet: &[char], n: usize) -> Vec<String> {
        let mut out = vec![String::new()];
        let mut last = vec![String::new()];
        for _ in 0..n {
            let mut grown = Vec::new();
            for w in &last {
                for &c in alphabet {
                    let mut x = w.clone();
                    x.push(c);
                    grown.push(x);
                }
            }
            out.extend(grown.iter().cloned());
            last = grown;
        }
        out
    }

    fn assert_deterministic(dfa: &Dfa) {
        for (i, st) in dfa.states.iter().enumerate() {
            for (a, ta) in st.trans.iter().enumerate() {
                for tb in &st.trans[a + 1..] {
                    let both = ta.ccl.intersect(&tb.ccl).unwrap();
                    assert!(both.is_empty(), "state {} has overlapping guards", i);
                }
            }
        }
    }

    #[test]
    fn subset_construction_accepts_language() {
        let nfa = nfa_for(&["a(b|c)*d"], RegexFlags::empty());
        let dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        assert_deterministic(&dfa);
        assert_eq!(dfa.accepts(codes("ad")), Some(0));
        assert_eq!(dfa.accepts(codes("abcbd")), Some(0));
        assert_eq!(dfa.accepts(codes("abc")), None);
        assert_eq!(dfa.accepts(codes("bd")), None);
    }

    #[test]
    fn overlapping_guards_are_split() {
        let nfa = nfa_for(&["[a-m]x", "[h-z]y"], RegexFlags::empty());
        let dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        assert_deterministic(&dfa);
        assert_eq!(dfa.states[0].trans.len(), 3);
        assert_eq!(dfa.accepts(codes("hx")), Some(0));
        assert_eq!(dfa.accepts(codes("hy")), Some(1));
        assert_eq!(dfa.accepts(codes("ay")), None);
        assert_eq!(dfa.accepts(codes("zy")), Some(1));
    }

    #[test]
    fn lowest_id_wins_in_dfa() {
        let nfa = nfa_for(&["[a-z]+", "if"], RegexFlags::empty());
        let dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        assert_eq!(dfa.accepts(codes("if")), Some(0));
        let nfa = nfa_for(&["if", "[a-z]+"], RegexFlags::empty());
        let dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        assert_eq!(dfa.accepts(codes("if")), Some(0));
        assert_eq!(dfa.accepts(codes("iff")), Some(1));
    }

    #[test]
    fn malformed_inputs() {
        let empty = Nfa::new(0, PREGEX_BYTE_MAX);
        let err = pregex_dfa_from_nfa(&empty).unwrap_err();
        assert_eq!(err.code(), PREGEX_ERR_NO_START);

        let nfa = nfa_for(&["[]"], RegexFlags::empty());
        let err = pregex_dfa_from_nfa(&nfa).unwrap_err();
        assert!(matches!(err, RegexError::MalformedAutomaton { .. }));
        assert_eq!(err.code(), PREGEX_ERR_UNREACHABLE_ACCEPT);
    }

    #[test]
    fn minimization_preserves_language() {
        let alphabet = ['a', 'b', 'c'];
        for patterns in [
            &["(a|b)*abb"][..],
            &["a*b|a*c"][..],
            &["(ab|ac)*", "c+"][..],
            &["a(b|c)(b|c)", "ab*"][..],
        ] {
            let nfa = nfa_for(patterns, RegexFlags::empty());
            let full = pregex_dfa_from_nfa(&nfa).unwrap();
            let mut min = full.clone();
            pregex_dfa_minimize(&mut min).unwrap();
            assert!(min.len() <= full.len(), "{:?} grew", patterns);
            assert_deterministic(&min);
            for w in words(&alphabet, 5) {
                assert_eq!(
                    min.accepts(codes(&w)),
                    full.accepts(codes(&w)),
                    "{:?} differs on {:?}",
                    patterns,
                    w
                );
            }
        }
    }

    #[test]
    fn minimization_merges_states() {
        // the textbook example: 5 subset states, 4 minimal
        let nfa = nfa_for(&["(a|b)*abb"], RegexFlags::NO_REF);
        let mut dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        let before = dfa.len();
        pregex_dfa_minimize(&mut dfa).unwrap();
        assert!(dfa.len() < before);
        assert_eq!(dfa.len(), 4);
    }

    #[test]
    fn default_transition_covers_complement() {
        let nfa = nfa_for(&["[^\"]*\""], RegexFlags::empty());
        let mut dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        pregex_dfa_minimize(&mut dfa).unwrap();
        pregex_dfa_default_trans(&mut dfa);
        let start = &dfa.states[0];
        assert_eq!(start.def_trans, Some(0));
        assert_eq!(start.trans.len(), 1);
        assert!(start.trans[0].ccl.test('"' as u32));
        assert_eq!(dfa.accepts(codes("xyz\"")), Some(0));

        // guards that leave gaps get no default
        let nfa = nfa_for(&["[a-z]+"], RegexFlags::empty());
        let mut dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        pregex_dfa_default_trans(&mut dfa);
        assert!(dfa.states.iter().all(|s| s.def_trans.is_none()));
    }

    #[test]
    fn matrix_rows() {
        let nfa = nfa_for(&["a|[0-9]"], RegexFlags::empty());
        let mut dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        pregex_dfa_minimize(&mut dfa).unwrap();
        let m = dfa.to_matrix();
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].ranges, vec![('0' as u32, '9' as u32, 1), ('a' as u32, 'a' as u32, 1)]);
        assert_eq!(m[1].accept.accept, Some(0));
        assert!(m[1].ranges.is_empty());
    }

    #[test]
    fn groups_do_not_split_states() {
        let plain = nfa_for(&["(a|b)*abb"], RegexFlags::NO_REF);
        let grouped = nfa_for(&["((a)|b)*a(b)b"], RegexFlags::empty());
        assert_eq!(grouped.ref_count, 3);
        let mut a = pregex_dfa_from_nfa(&plain).unwrap();
        let mut b = pregex_dfa_from_nfa(&grouped).unwrap();
        pregex_dfa_minimize(&mut a).unwrap();
        pregex_dfa_minimize(&mut b).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(b.ref_count, 3);
        assert!(!b.to_string().contains("open"));
    }

    #[test]
    fn folded_guards_keep_start_bytes_small() {
        let nfa = nfa_for(&["x[yz]"], RegexFlags::empty()).case_folded();
        let mut dfa = pregex_dfa_from_nfa(&nfa).unwrap();
        dfa.set_case_folded();
        assert!(dfa.is_case_folded());
        assert_eq!(dfa.start_bytes(false).as_deref(), Some(&b"Xx"[..]));
        assert_eq!(dfa.accepts(codes("XZ")), Some(0));
    }
}
