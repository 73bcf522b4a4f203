// ccl.rs - Character classes.
//
// A CharClass is a normalized set of inclusive code-point ranges bounded by
// a (min, max) universe. Every mutation leaves the ranges sorted, disjoint
// and non-adjacent.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::error::RegexError;
use crate::regdef::*;
use crate::regenc::{encoding_for_universe, next_code, Encoding};
use crate::unicode;

// === Built-in shorthand definitions ===
const SHORTHAND_DIGIT: &[u8] = b"0-9";
const SHORTHAND_WORD: &[u8] = b"a-zA-Z_0-9";
const SHORTHAND_SPACE: &[u8] = b" \\f\\n\\r\\t\\v";

// === CodeRange ===

/// An inclusive code-point interval, `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeRange {
    pub begin: CodePoint,
    pub end: CodePoint,
}

impl CodeRange {
    /// Create a range; swapped bounds are put in order.
    pub fn new(begin: CodePoint, end: CodePoint) -> Self {
        if begin > end {
            CodeRange {
                begin: end,
                end: begin,
            }
        } else {
            CodeRange { begin, end }
        }
    }

    #[inline]
    pub fn contains(&self, ch: CodePoint) -> bool {
        self.begin <= ch && ch <= self.end
    }

    /// Number of characters in the range.
    #[inline]
    pub fn count(&self) -> usize {
        (self.end - self.begin) as usize + 1
    }
}

// === CharClass ===

/// A set of code points within a `(min, max)` universe.
///
/// # Examples
///
/// ```
/// use pregex::ccl::CharClass;
///
/// let mut ccl = CharClass::from_definition(0, 255, "a-z");
/// ccl.add('_' as u32);
/// assert!(ccl.test('q' as u32));
/// assert!(!ccl.test('Q' as u32));
/// assert_eq!(ccl.to_string(), "_a-z");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharClass {
    min: CodePoint,
    max: CodePoint,
    ranges: SmallVec<[CodeRange; 4]>,
}

impl CharClass {
    /// Create an empty class over the universe `[min, max]`.
    pub fn new(min: CodePoint, max: CodePoint) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        CharClass {
            min,
            max,
            ranges: SmallVec::new(),
        }
    }

    /// Create a class over the universe spanned by an encoding.
    pub fn for_encoding(enc: &dyn Encoding) -> Self {
        Self::new(enc.min_code(), enc.max_code())
    }

    /// Create a class covering the whole universe.
    pub fn full(min: CodePoint, max: CodePoint) -> Self {
        let mut ccl = Self::new(min, max);
        ccl.ranges.push(CodeRange::new(ccl.min, ccl.max));
        ccl
    }

    /// Create a class from a definition in the class mini-language.
    ///
    /// The definition is read one byte per character for byte universes and
    /// as UTF-8 otherwise.
    pub fn from_definition(min: CodePoint, max: CodePoint, def: &str) -> Self {
        let mut ccl = Self::new(min, max);
        ccl.parse(def, false);
        ccl
    }

    #[inline]
    pub fn min(&self) -> CodePoint {
        self.min
    }

    #[inline]
    pub fn max(&self) -> CodePoint {
        self.max
    }

    /// The normalized ranges, ascending.
    #[inline]
    pub fn ranges(&self) -> &[CodeRange] {
        &self.ranges
    }

    /// Two classes are compatible when they share the same universe.
    #[inline]
    pub fn compat(&self, other: &CharClass) -> bool {
        self.min == other.min && self.max == other.max
    }

    fn check_compat(&self, other: &CharClass) -> Result<(), RegexError> {
        if self.compat(other) {
            Ok(())
        } else {
            Err(RegexError::IncompatibleDomain)
        }
    }

    /// Number of ranges.
    #[inline]
    pub fn size(&self) -> usize {
        self.ranges.len()
    }

    /// Number of characters.
    pub fn count(&self) -> usize {
        self.ranges.iter().map(CodeRange::count).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True if the class covers the entire universe.
    pub fn is_full(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].begin == self.min && self.ranges[0].end == self.max
    }

    // === Normalization ===

    /// Sort and merge overlapping or touching ranges until a pass makes no merge.
    fn normalize(&mut self) {
        loop {
            self.ranges.sort_unstable();
            let before = self.ranges.len();
            let mut i = 1;
            while i < self.ranges.len() {
                let l = self.ranges[i - 1];
                let r = self.ranges[i];
                if r.begin <= l.end.saturating_add(1) {
                    if r.end > l.end {
                        self.ranges[i - 1].end = r.end;
                    }
                    self.ranges.remove(i);
                    continue;
                }
                i += 1;
            }
            if self.ranges.len() == before {
                break;
            }
        }
    }

    /// Push a range clipped to the universe, without normalizing.
    fn push_clipped(&mut self, begin: CodePoint, end: CodePoint) {
        let r = CodeRange::new(begin, end);
        if r.end < self.min || r.begin > self.max {
            return;
        }
        self.ranges.push(CodeRange {
            begin: r.begin.max(self.min),
            end: r.end.min(self.max),
        });
    }

    // === Membership ===

    /// Test whether `ch` is a member.
    pub fn test(&self, ch: CodePoint) -> bool {
        self.find_range(ch).is_some()
    }

    /// Test whether the whole of `[begin, end]` is covered.
    pub fn test_range(&self, begin: CodePoint, end: CodePoint) -> bool {
        let r = CodeRange::new(begin, end);
        match self.find_range(r.begin) {
            Some(i) => self.ranges[i].end >= r.end,
            None => false,
        }
    }

    /// Case-insensitive membership test.
    pub fn instest(&self, ch: CodePoint) -> bool {
        if self.test(ch) {
            return true;
        }
        unicode::swap_case(ch, self.max).is_some_and(|other| self.test(other))
    }

    fn find_range(&self, ch: CodePoint) -> Option<usize> {
        let i = self.ranges.partition_point(|r| r.end < ch);
        if i < self.ranges.len() && self.ranges[i].begin <= ch {
            Some(i)
        } else {
            None
        }
    }

    // === Mutation ===

    /// Add the range `[begin, end]`.
    pub fn add_range(&mut self, begin: CodePoint, end: CodePoint) {
        if self.test_range(begin, end) {
            return;
        }
        self.push_clipped(begin, end);
        self.normalize();
    }

    /// Add a single character.
    pub fn add(&mut self, ch: CodePoint) {
        self.add_range(ch, ch);
    }

    /// Remove the range `[begin, end]`.
    pub fn del_range(&mut self, begin: CodePoint, end: CodePoint) {
        let d = CodeRange::new(begin, end);
        let mut kept: SmallVec<[CodeRange; 4]> = SmallVec::new();
        for r in &self.ranges {
            if r.end < d.begin || r.begin > d.end {
                kept.push(*r);
                continue;
            }
            if r.begin < d.begin {
                kept.push(CodeRange::new(r.begin, d.begin - 1));
            }
            if r.end > d.end {
                kept.push(CodeRange::new(d.end + 1, r.end));
            }
        }
        self.ranges = kept;
        self.normalize();
    }

    /// Remove a single character.
    pub fn del(&mut self, ch: CodePoint) {
        self.del_range(ch, ch);
    }

    /// Remove all ranges.
    pub fn erase(&mut self) {
        self.ranges.clear();
    }

    /// Complement the class within its universe.
    pub fn negate(&mut self) {
        let mut gaps: SmallVec<[CodeRange; 4]> = SmallVec::new();
        let mut next = Some(self.min);
        for r in &self.ranges {
            if let Some(from) = next {
                if r.begin > from {
                    gaps.push(CodeRange::new(from, r.begin - 1));
                }
            }
            next = r.end.checked_add(1);
        }
        if let Some(from) = next {
            if from <= self.max {
                gaps.push(CodeRange::new(from, self.max));
            }
        }
        self.ranges = gaps;
        self.normalize();
    }

    /// Return the complement of the class within its universe.
    pub fn negated(&self) -> CharClass {
        let mut ccl = self.clone();
        ccl.negate();
        ccl
    }

    /// This class together with every character whose other case is a
    /// member, so that testing a character against the result is the same
    /// as testing it and its other case against `self`.
    pub fn case_folded(&self) -> CharClass {
        let mut out = self.clone();
        for &(code, other) in unicode::case_pairs() {
            if code > self.max {
                break;
            }
            if code >= self.min && other <= self.max && self.test(other) {
                out.push_clipped(code, code);
            }
        }
        out.normalize();
        out
    }

    // === Set algebra ===

    /// Add every range of `other` to this class.
    pub fn union_with(&mut self, other: &CharClass) -> Result<(), RegexError> {
        self.check_compat(other)?;
        self.ranges.extend(other.ranges.iter().copied());
        self.normalize();
        Ok(())
    }

    /// Return the union of both classes.
    pub fn union(&self, other: &CharClass) -> Result<CharClass, RegexError> {
        let mut ccl = self.clone();
        ccl.union_with(other)?;
        Ok(ccl)
    }

    /// Return the characters present in both classes.
    pub fn intersect(&self, other: &CharClass) -> Result<CharClass, RegexError> {
        self.check_compat(other)?;
        let mut ccl = CharClass::new(self.min, self.max);
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = self.ranges[i];
            let b = other.ranges[j];
            let begin = a.begin.max(b.begin);
            let end = a.end.min(b.end);
            if begin <= end {
                ccl.ranges.push(CodeRange::new(begin, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        ccl.normalize();
        Ok(ccl)
    }

    /// Return the characters of this class not present in `other`.
    pub fn diff(&self, other: &CharClass) -> Result<CharClass, RegexError> {
        self.check_compat(other)?;
        let mut ccl = self.clone();
        for r in &other.ranges {
            ccl.del_range(r.begin, r.end);
        }
        Ok(ccl)
    }

    /// Order two classes: fewer ranges first, then range by range.
    pub fn compare(&self, other: &CharClass) -> Result<Ordering, RegexError> {
        self.check_compat(other)?;
        Ok(self
            .ranges
            .len()
            .cmp(&other.ranges.len())
            .then_with(|| self.ranges.as_slice().cmp(other.ranges.as_slice())))
    }

    // === Access ===

    /// Return the character at `offset` counting through all ranges.
    pub fn get(&self, offset: usize) -> Option<CodePoint> {
        let mut offset = offset;
        for r in &self.ranges {
            if offset < r.count() {
                return Some(r.begin + offset as CodePoint);
            }
            offset -= r.count();
        }
        None
    }

    /// Return the range at `offset`.
    pub fn get_range(&self, offset: usize) -> Option<CodeRange> {
        self.ranges.get(offset).copied()
    }

    // === Parsing ===

    /// Parse a definition; with `extend` the parsed set is added to the
    /// existing ranges, otherwise it replaces them.
    pub fn parse(&mut self, def: &str, extend: bool) {
        let enc = encoding_for_universe(self.max);
        self.parse_bytes(def.as_bytes(), enc, extend);
    }

    /// Parse a definition given as raw bytes decoded with `enc`.
    pub fn parse_bytes(&mut self, def: &[u8], enc: &dyn Encoding, extend: bool) {
        if !extend {
            self.erase();
        }

        let mut p = 0;
        while p < def.len() {
            if def[p] == b'\\' && p + 1 < def.len() {
                if let Some(sh) = self.shorthand(def[p + 1]) {
                    self.ranges.extend(sh.ranges.iter().copied());
                    p += 2;
                    continue;
                }
            }

            let (begin, n) = pregex_ccl_parse_char(def, p, enc, true);
            p += n;
            let mut end = begin;

            // Is this a range def?
            if p + 1 < def.len() && def[p] == b'-' {
                let (e, n) = pregex_ccl_parse_char(def, p + 1, enc, true);
                end = e;
                p += 1 + n;
            }

            self.push_clipped(begin, end);
        }

        self.normalize();
    }

    /// Build the class for shorthand `\c` within this universe.
    pub fn shorthand(&self, c: u8) -> Option<CharClass> {
        let (def, neg) = match c {
            b'd' => (SHORTHAND_DIGIT, false),
            b'D' => (SHORTHAND_DIGIT, true),
            b'w' => (SHORTHAND_WORD, false),
            b'W' => (SHORTHAND_WORD, true),
            b's' => (SHORTHAND_SPACE, false),
            b'S' => (SHORTHAND_SPACE, true),
            _ => return None,
        };
        let mut sh = CharClass::new(self.min, self.max);
        sh.parse_bytes(def, encoding_for_universe(self.max), false);
        if neg {
            sh.negate();
        }
        Some(sh)
    }

    // === Output ===

    /// Render the class in the definition language.
    ///
    /// With `escape`, every character the class parser or the pattern parser
    /// would interpret is escaped, and the result parses back to the same
    /// class. Without it, characters are printed as they are.
    pub fn to_string_escaped(&self, escape: bool) -> String {
        let mut s = String::new();
        for r in &self.ranges {
            self.push_char(&mut s, r.begin, escape);
            if r.begin != r.end {
                s.push('-');
                self.push_char(&mut s, r.end, escape);
            }
        }
        s
    }

    fn push_char(&self, s: &mut String, ch: CodePoint, escape: bool) {
        if !escape {
            match char::from_u32(ch) {
                Some(c) => s.push(c),
                None => s.push_str(&format!("\\U{:08x}", ch)),
            }
            return;
        }
        pregex_escape_char(s, ch, self.max > PREGEX_BYTE_MAX);
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_escaped(true))
    }
}

// === Character-level helpers shared with the pattern parser ===

/// Append `ch` to `s`, escaping it so that both the class parser and the
/// pattern parser read it back as the same literal character.
pub(crate) fn pregex_escape_char(s: &mut String, ch: CodePoint, wide: bool) {
    match ch {
        0x0a => s.push_str("\\n"),
        0x09 => s.push_str("\\t"),
        0x0d => s.push_str("\\r"),
        0x20..=0x7e => {
            let c = ch as u8 as char;
            if "\\-[]^$()|*+?".contains(c) {
                s.push('\\');
            }
            s.push(c);
        }
        _ => match char::from_u32(ch) {
            Some(c) if wide && ch > 0xa0 && !c.is_control() && !c.is_whitespace() => s.push(c),
            _ if ch <= 0xff => s.push_str(&format!("\\x{:02x}", ch)),
            _ if ch <= 0xffff => s.push_str(&format!("\\u{:04x}", ch)),
            _ => s.push_str(&format!("\\U{:08x}", ch)),
        },
    }
}

#[inline]
fn hex_value(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

/// Read one character at byte offset `p`, interpreting escape sequences
/// when `escape` is set. Returns the code point and the bytes consumed.
///
/// Recognized escapes are `\n \t \r \b \f \v \a`, up to three octal digits,
/// `\xHH`, `\uHHHH` and `\UHHHHHHHH`. Any other escaped character stands for
/// itself; a trailing backslash is a literal backslash.
pub fn pregex_ccl_parse_char(
    def: &[u8],
    p: usize,
    enc: &dyn Encoding,
    escape: bool,
) -> (CodePoint, usize) {
    if !(escape && def[p] == b'\\' && p + 1 < def.len()) {
        return next_code(enc, def, p).unwrap_or((0, 1));
    }

    let q = p + 1;
    let named = match def[q] {
        b'n' => Some(0x0a),
        b't' => Some(0x09),
        b'r' => Some(0x0d),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'v' => Some(0x0b),
        b'a' => Some(0x07),
        _ => None,
    };
    if let Some(ch) = named {
        return (ch, 2);
    }

    if (b'0'..=b'7').contains(&def[q]) {
        let mut ch = 0;
        let mut n = 0;
        while n < 3 && q + n < def.len() && (b'0'..=b'7').contains(&def[q + n]) {
            ch = ch * 8 + (def[q + n] - b'0') as u32;
            n += 1;
        }
        return (ch, 1 + n);
    }

    let digits = match def[q] {
        b'x' => 2,
        b'u' => 4,
        b'U' => 8,
        _ => 0,
    };
    if digits > 0 {
        let mut ch: u32 = 0;
        let mut n = 0;
        while n < digits && q + 1 + n < def.len() {
            match hex_value(def[q + 1 + n]) {
                Some(v) => ch = (ch << 4) | v,
                None => break,
            }
            n += 1;
        }
        if n > 0 {
            return (ch, 2 + n);
        }
    }

    let (ch, n) = next_code(enc, def, q).unwrap_or((def[q] as CodePoint, 1));
    (ch, 1 + n)
}
