// api.rs - Object API.
//
// Regex owns one compiled RegexType plus the scan state of the object:
// the cursor for repeated calls, capture references of the last match,
// split bookkeeping and the replacement buffer. Results that borrow from
// the object stay valid until the next call on it.

use std::fmt;
use std::ops::Range;

use log::debug;
use memchr::memchr;

use crate::error::RegexError;
use crate::regcomp::{pregex_compile, pregex_compile_ptn, pregex_finalize};
use crate::regdef::RegexFlags;
use crate::regenc::{char_count, step_forward};
use crate::regexec::{pregex_match_at, pregex_search, RawMatch};
use crate::regint::RegexType;
use crate::regparse_types::Ptn;

/// What a match callback decides about a candidate match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchVerdict {
    /// Keep the match as found.
    Keep,
    /// Keep the match, reporting it under another id.
    Relabel(u32),
    /// Keep the match; `replace` substitutes this text instead of the template.
    Replace(String),
    /// Drop the match. Scanning resumes one character after its start.
    Reject,
}

/// Callback consulted for every candidate match.
pub type MatchFn = Box<dyn FnMut(&Match<'_>) -> MatchVerdict>;

// === Match ===

/// A single match referencing the subject text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t [u8],
    start: usize,
    end: usize,
    char_pos: usize,
    char_len: usize,
    id: u32,
    replacement: Option<String>,
}

impl<'t> Match<'t> {
    fn from_raw(text: &'t [u8], raw: &RawMatch, char_pos: usize, char_len: usize) -> Self {
        Match {
            text,
            start: raw.start,
            end: raw.end,
            char_pos,
            char_len,
            id: raw.id(),
            replacement: None,
        }
    }

    /// Byte offset of the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Position of the match in characters. Equals `start` in byte mode.
    pub fn char_pos(&self) -> usize {
        self.char_pos
    }

    /// Length of the match in characters. Equals `len` in byte mode.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Id of the pattern that matched.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Text attached by a [`MatchVerdict::Replace`] callback verdict.
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    pub fn as_bytes(&self) -> &'t [u8] {
        &self.text[self.start..self.end]
    }

    /// The matched text as a `&str`.
    ///
    /// Empty when the matched bytes are not valid UTF-8, which happens when
    /// a byte-mode pattern matches part of a multibyte character; use
    /// [`Match::as_bytes`] for those.
    pub fn as_str(&self) -> &'t str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Length of the match in bytes. Never zero.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// === Regex ===

/// A compiled regular expression object.
///
/// An object is created empty, receives one or more patterns and is then
/// optionally finalized into a DFA. Matching works on either machine.
///
/// `match_next`, `split_next`, `matches`, `split` and `replace` keep state
/// in the object, so they take `&mut self`. Without `GLOBAL`, `matches`,
/// `split` and `replace` stop after the first match.
///
/// # Examples
///
/// ```
/// use pregex::api::Regex;
/// use pregex::regdef::RegexFlags;
///
/// let mut re = Regex::create(RegexFlags::GLOBAL);
/// re.compile("[A-Z]+", 0).unwrap();
/// re.compile("[0-9]+", 1).unwrap();
/// re.finalize().unwrap();
///
/// let found: Vec<(u32, &str)> = re.matches("AB12").iter().map(|m| (m.id(), m.as_str())).collect();
/// assert_eq!(found, vec![(0, "AB"), (1, "12")]);
/// ```
pub struct Regex {
    inner: RegexType,
    match_fn: Option<MatchFn>,
    cursor: usize,
    /// Last known (byte offset, character index) pair.
    char_mark: (usize, usize),
    split_cursor: usize,
    split_done: bool,
    match_count: usize,
    last_match: Option<Range<usize>>,
    last_split: Option<Range<usize>>,
    refs: Vec<Option<Range<usize>>>,
    tmp: Vec<u8>,
    tmp_str: String,
}

impl Regex {
    /// An empty object. Patterns are added with [`Regex::compile`].
    pub fn create(flags: RegexFlags) -> Regex {
        Regex {
            inner: RegexType::new(flags),
            match_fn: None,
            cursor: 0,
            char_mark: (0, 0),
            split_cursor: 0,
            split_done: false,
            match_count: 0,
            last_match: None,
            last_split: None,
            refs: Vec::new(),
            tmp: Vec::new(),
            tmp_str: String::new(),
        }
    }

    /// Compile a single pattern with default flags into a finalized object.
    pub fn new(pattern: &str) -> Result<Regex, RegexError> {
        RegexBuilder::new(pattern).build()
    }

    /// Create a [`RegexBuilder`] for fine-grained control over compilation.
    pub fn builder(pattern: &str) -> RegexBuilder {
        RegexBuilder::new(pattern)
    }

    /// Add `pattern` under `id`. Returns the number of patterns so far.
    pub fn compile(&mut self, pattern: &str, id: u32) -> Result<usize, RegexError> {
        self.compile_bytes(pattern.as_bytes(), id)
    }

    pub fn compile_bytes(&mut self, pattern: &[u8], id: u32) -> Result<usize, RegexError> {
        pregex_compile(&mut self.inner, pattern, id)
    }

    /// Add a programmatically built pattern tree under `id`.
    pub fn compile_ptn(&mut self, ptn: &Ptn, id: u32) -> Result<usize, RegexError> {
        pregex_compile_ptn(&mut self.inner, ptn, id)
    }

    /// Convert the NFA into a minimized DFA. Further calls do nothing.
    pub fn finalize(&mut self) -> Result<(), RegexError> {
        pregex_finalize(&mut self.inner)
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.is_finalized()
    }

    pub fn pattern_count(&self) -> usize {
        self.inner.pattern_count()
    }

    pub fn flags(&self) -> RegexFlags {
        self.inner.flags
    }

    /// Replace the runtime flags. `WCHAR` keeps the value the object was
    /// created with.
    pub fn set_flags(&mut self, flags: RegexFlags) {
        self.inner.set_flags(flags);
    }

    pub fn set_match_fn<F>(&mut self, f: F)
    where
        F: FnMut(&Match<'_>) -> MatchVerdict + 'static,
    {
        self.match_fn = Some(Box::new(f));
    }

    pub fn clear_match_fn(&mut self) {
        self.match_fn = None;
    }

    pub fn has_match_fn(&self) -> bool {
        self.match_fn.is_some()
    }

    /// Restart scanning at the beginning and forget the last results.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.char_mark = (0, 0);
        self.split_cursor = 0;
        self.split_done = false;
        self.match_count = 0;
        self.last_match = None;
        self.last_split = None;
        self.refs.clear();
    }

    fn char_span(&mut self, text: &[u8], start: usize, end: usize) -> (usize, usize) {
        if !self.inner.flags.contains(RegexFlags::WCHAR) {
            return (start, end - start);
        }
        let enc = self.inner.enc;
        if self.char_mark.0 > start {
            self.char_mark = (0, 0);
        }
        let pos = self.char_mark.1 + char_count(enc, &text[self.char_mark.0..start]);
        self.char_mark = (start, pos);
        (pos, char_count(enc, &text[start..end]))
    }

    // === Matching ===

    /// Next match after the previous one.
    pub fn match_next<'t>(&mut self, text: &'t str) -> Option<Match<'t>> {
        self.match_next_bytes(text.as_bytes())
    }

    pub fn match_next_bytes<'t>(&mut self, text: &'t [u8]) -> Option<Match<'t>> {
        self.refs.clear();
        let mut from = self.cursor;
        while let Some(raw) = pregex_search(&self.inner, text, from) {
            let (char_pos, char_len) = self.char_span(text, raw.start, raw.end);
            let mut m = Match::from_raw(text, &raw, char_pos, char_len);

            if let Some(f) = self.match_fn.as_mut() {
                match f(&m) {
                    MatchVerdict::Keep => {}
                    MatchVerdict::Relabel(id) => m.id = id,
                    MatchVerdict::Replace(s) => m.replacement = Some(s),
                    MatchVerdict::Reject => {
                        if self.inner.is_debug() {
                            debug!("match {}..{} rejected by callback", raw.start, raw.end);
                        }
                        from = step_forward(self.inner.enc, text, raw.start);
                        continue;
                    }
                }
            }

            self.cursor = raw.end;
            self.last_match = Some(raw.start..raw.end);
            self.refs = raw.refs;
            self.match_count += 1;
            return Some(m);
        }
        self.cursor = text.len();
        None
    }

    /// All matches from the beginning of `text`; only the first one
    /// without `GLOBAL`.
    pub fn matches<'t>(&mut self, text: &'t str) -> Vec<Match<'t>> {
        self.matches_bytes(text.as_bytes())
    }

    pub fn matches_bytes<'t>(&mut self, text: &'t [u8]) -> Vec<Match<'t>> {
        self.reset();
        let global = self.inner.flags.contains(RegexFlags::GLOBAL);
        let mut out = Vec::new();
        while let Some(m) = self.match_next_bytes(text) {
            out.push(m);
            if !global {
                break;
            }
        }
        out
    }

    // === Splitting ===

    fn split_next_range(&mut self, text: &[u8]) -> Option<Range<usize>> {
        if self.split_done {
            return None;
        }
        let from = self.split_cursor.min(text.len());
        let span = match self.match_next_bytes(text) {
            Some(m) => {
                self.split_cursor = m.end();
                from..m.start().max(from)
            }
            None => {
                self.split_done = true;
                from..text.len()
            }
        };
        self.last_split = Some(span.clone());
        Some(span)
    }

    /// Next span between delimiter matches. The span after the last
    /// delimiter is always returned, even when empty.
    ///
    /// A span that a byte-mode delimiter cuts inside a multibyte character
    /// comes back empty; [`Regex::split_next_bytes`] keeps such bytes.
    pub fn split_next<'t>(&mut self, text: &'t str) -> Option<&'t str> {
        self.split_next_range(text.as_bytes()).map(|r| str_span(text, r))
    }

    pub fn split_next_bytes<'t>(&mut self, text: &'t [u8]) -> Option<&'t [u8]> {
        self.split_next_range(text).map(|r| &text[r])
    }

    fn split_ranges(&mut self, text: &[u8]) -> Vec<Range<usize>> {
        self.reset();
        let global = self.inner.flags.contains(RegexFlags::GLOBAL);
        let mut out = Vec::new();
        while let Some(span) = self.split_next_range(text) {
            out.push(span);
            if !global && !self.split_done {
                let rest = self.split_cursor..text.len();
                self.last_split = Some(rest.clone());
                self.split_done = true;
                out.push(rest);
            }
        }
        out
    }

    /// Spans of `text` between delimiter matches.
    ///
    /// Spans cut inside a multibyte character come back empty, as with
    /// [`Regex::split_next`].
    pub fn split<'t>(&mut self, text: &'t str) -> Vec<&'t str> {
        self.split_ranges(text.as_bytes())
            .into_iter()
            .map(|r| str_span(text, r))
            .collect()
    }

    pub fn split_bytes<'t>(&mut self, text: &'t [u8]) -> Vec<&'t [u8]> {
        self.split_ranges(text)
            .into_iter()
            .map(|r| &text[r])
            .collect()
    }

    // === Replacing ===

    /// Replace matches in `text` by `template`.
    ///
    /// `$0` stands for the whole match and `$N` for capture `N`; captures
    /// that did not participate expand to nothing. Any other `$` is copied.
    /// The result is valid until the next call on this object.
    pub fn replace(&mut self, text: &str, template: &str) -> &str {
        self.replace_bytes(text.as_bytes(), template.as_bytes());
        self.tmp_str = String::from_utf8_lossy(&self.tmp).into_owned();
        &self.tmp_str
    }

    pub fn replace_bytes(&mut self, text: &[u8], template: &[u8]) -> &[u8] {
        self.reset();
        let global = self.inner.flags.contains(RegexFlags::GLOBAL);
        let verbatim = self.inner.flags.contains(RegexFlags::NO_REF);
        let mut out = Vec::with_capacity(text.len());
        let mut last = 0;

        while let Some(m) = self.match_next_bytes(text) {
            out.extend_from_slice(&text[last..m.start()]);
            match m.replacement() {
                Some(r) => out.extend_from_slice(r.as_bytes()),
                None if verbatim => out.extend_from_slice(template),
                None => expand_template(template, text, m.range(), &self.refs, &mut out),
            }
            last = m.end();
            if !global {
                break;
            }
        }
        out.extend_from_slice(&text[last..]);
        self.tmp = out;
        &self.tmp
    }

    // === Accessors ===

    /// Span of capture `n` of the last match; `0` is the whole match.
    pub fn get_ref(&self, n: usize) -> Option<Range<usize>> {
        match n {
            0 => self.last_match.clone(),
            _ => self.refs.get(n - 1).cloned().flatten(),
        }
    }

    /// Capture spans of the last match, capture 1 first.
    pub fn refs(&self) -> &[Option<Range<usize>>] {
        &self.refs
    }

    /// Matches returned since the last reset.
    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn last_match(&self) -> Option<Range<usize>> {
        self.last_match.clone()
    }

    pub fn last_split(&self) -> Option<Range<usize>> {
        self.last_split.clone()
    }

    // === Stateless helpers ===

    /// Check whether `text` matches anywhere. Ignores the callback.
    pub fn is_match(&self, text: &str) -> bool {
        pregex_search(&self.inner, text.as_bytes(), 0).is_some()
    }

    /// First match in `text`. Ignores the callback.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_bytes(text.as_bytes())
    }

    pub fn find_bytes<'t>(&self, text: &'t [u8]) -> Option<Match<'t>> {
        let raw = pregex_search(&self.inner, text, 0)?;
        Some(self.stateless_match(text, &raw))
    }

    /// Iterate over all non-overlapping matches. Ignores the callback.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> FindIter<'r, 't> {
        FindIter {
            regex: self,
            text: text.as_bytes(),
            last_end: 0,
        }
    }

    /// Longest match starting exactly at byte `pos`, as `(id, length)`.
    pub fn longest_match_at(&self, text: &str, pos: usize) -> Option<(u32, usize)> {
        pregex_match_at(&self.inner, text.as_bytes(), pos).map(|m| (m.id(), m.len()))
    }

    pub(crate) fn match_at_bytes<'t>(&self, text: &'t [u8], pos: usize) -> Option<(Match<'t>, RawMatch)> {
        let raw = pregex_match_at(&self.inner, text, pos)?;
        Some((self.stateless_match(text, &raw), raw))
    }

    fn stateless_match<'t>(&self, text: &'t [u8], raw: &RawMatch) -> Match<'t> {
        if self.inner.flags.contains(RegexFlags::WCHAR) {
            let pos = char_count(self.inner.enc, &text[..raw.start]);
            let len = char_count(self.inner.enc, &text[raw.start..raw.end]);
            Match::from_raw(text, raw, pos, len)
        } else {
            Match::from_raw(text, raw, raw.start, raw.len())
        }
    }

    /// Access the underlying `RegexType`.
    pub fn as_raw(&self) -> &RegexType {
        &self.inner
    }
}

/// `text[r]`, or an empty string if `r` does not fall on character boundaries.
#[inline]
fn str_span(text: &str, r: Range<usize>) -> &str {
    text.get(r).unwrap_or_default()
}

fn expand_template(
    template: &[u8],
    text: &[u8],
    whole: Range<usize>,
    refs: &[Option<Range<usize>>],
    out: &mut Vec<u8>,
) {
    let mut rest = template;
    while let Some(i) = memchr(b'$', rest) {
        out.extend_from_slice(&rest[..i]);
        let digits = rest[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            out.push(b'$');
            rest = &rest[i + 1..];
            continue;
        }
        let n = rest[i + 1..i + 1 + digits]
            .iter()
            .fold(0usize, |n, d| n.saturating_mul(10).saturating_add((d - b'0') as usize));
        let span = match n {
            0 => Some(whole.clone()),
            _ => refs.get(n - 1).cloned().flatten(),
        };
        if let Some(r) = span {
            out.extend_from_slice(&text[r]);
        }
        rest = &rest[i + 1 + digits..];
    }
    out.extend_from_slice(rest);
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regex")
            .field("flags", &self.inner.flags)
            .field("patterns", &self.inner.pattern_count())
            .field("finalized", &self.inner.is_finalized())
            .finish_non_exhaustive()
    }
}

// === RegexBuilder ===

/// Builder for compiling a [`Regex`] with custom flags.
///
/// # Examples
///
/// ```
/// use pregex::api::Regex;
///
/// let re = Regex::builder("hello world")
///     .case_insensitive(true)
///     .build()
///     .unwrap();
/// assert!(re.is_match("Hello World"));
/// ```
pub struct RegexBuilder {
    pattern: Vec<u8>,
    flags: RegexFlags,
    dfa: bool,
}

impl RegexBuilder {
    pub fn new(pattern: &str) -> Self {
        RegexBuilder {
            pattern: pattern.as_bytes().to_vec(),
            flags: RegexFlags::empty(),
            dfa: true,
        }
    }

    fn flag(mut self, flag: RegexFlags, yes: bool) -> Self {
        self.flags.set(flag, yes);
        self
    }

    pub fn case_insensitive(self, yes: bool) -> Self {
        self.flag(RegexFlags::INSENSITIVE, yes)
    }

    /// Unicode universe with UTF-8 stepping instead of bytes.
    pub fn wide(self, yes: bool) -> Self {
        self.flag(RegexFlags::WCHAR, yes)
    }

    pub fn global(self, yes: bool) -> Self {
        self.flag(RegexFlags::GLOBAL, yes)
    }

    /// Treat the pattern as literal text.
    pub fn literal(self, yes: bool) -> Self {
        self.flag(RegexFlags::STATIC, yes)
    }

    pub fn no_ref(self, yes: bool) -> Self {
        self.flag(RegexFlags::NO_REF, yes)
    }

    pub fn no_errors(self, yes: bool) -> Self {
        self.flag(RegexFlags::NO_ERRORS, yes)
    }

    pub fn no_anchors(self, yes: bool) -> Self {
        self.flag(RegexFlags::NO_ANCHORS, yes)
    }

    pub fn greedy(self, yes: bool) -> Self {
        self.flag(RegexFlags::GREEDY, yes)
    }

    pub fn nongreedy(self, yes: bool) -> Self {
        self.flag(RegexFlags::NONGREEDY, yes)
    }

    /// Log the parsed tree, the automata and match attempts.
    pub fn debug(self, yes: bool) -> Self {
        self.flag(RegexFlags::DEBUG, yes)
    }

    /// Replace all flags at once.
    pub fn flags(mut self, flags: RegexFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Finalize into a DFA (the default) or keep matching with the NFA.
    pub fn dfa(mut self, yes: bool) -> Self {
        self.dfa = yes;
        self
    }

    /// Compile the pattern under id 0.
    pub fn build(self) -> Result<Regex, RegexError> {
        let mut re = Regex::create(self.flags);
        re.compile_bytes(&self.pattern, 0)?;
        if self.dfa {
            re.finalize()?;
        }
        Ok(re)
    }
}

// === FindIter ===

/// Iterator over all non-overlapping matches in a text.
pub struct FindIter<'r, 't> {
    regex: &'r Regex,
    text: &'t [u8],
    last_end: usize,
}

impl<'r, 't> Iterator for FindIter<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        let raw = pregex_search(&self.regex.inner, self.text, self.last_end)?;
        // matches are never empty, so this always advances
        self.last_end = raw.end;
        Some(self.regex.stateless_match(self.text, &raw))
    }
}
