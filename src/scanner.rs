// scanner.rs - Multi-pattern scanner.
//
// Compiles a list of token patterns into one DFA and reports which pattern
// matched, in the style of a lexer: longest match at a position, next match
// from a position with its captures, and a token iterator.

use smallvec::SmallVec;

use crate::api::Regex;
use crate::error::RegexError;
use crate::regdef::RegexFlags;
use crate::regenc::step_forward;

/// Result of a capture group match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureIndex {
    /// Byte offset of the start of the capture.
    pub start: usize,
    /// Byte offset of the end of the capture.
    pub end: usize,
    /// Length of the capture in bytes (`end - start`).
    pub length: usize,
}

impl CaptureIndex {
    fn new(start: usize, end: usize) -> Self {
        CaptureIndex {
            start,
            end,
            length: end - start,
        }
    }
}

/// Result of a scanner match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerMatch {
    /// Id of the pattern that matched; its index unless given by `with_ids`.
    pub index: usize,
    /// Capture group information. Index 0 is the full match.
    pub capture_indices: SmallVec<[CaptureIndex; 8]>,
}

/// Configuration for creating a `Scanner`.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Compile-time flags applied to all patterns.
    pub flags: RegexFlags,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            flags: RegexFlags::WCHAR,
        }
    }
}

/// A token produced by [`Scanner::tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub id: u32,
    pub start: usize,
    pub end: usize,
    /// Matched text; empty when a byte-mode match splits a UTF-8 sequence.
    pub text: &'t str,
}

/// Multi-pattern scanner.
///
/// When several patterns match at the same position the longest match wins,
/// and among equally long ones the lowest id.
///
/// # Example
///
/// ```
/// use pregex::scanner::Scanner;
///
/// let scanner = Scanner::new(&["[0-9]+", "[a-z]+"]).unwrap();
/// let m = scanner.find_next_match("hello42", 0).unwrap();
/// assert_eq!(m.index, 1);
/// assert_eq!(m.capture_indices[0].start, 0);
/// assert_eq!(m.capture_indices[0].end, 5);
/// ```
pub struct Scanner {
    regex: Regex,
}

impl Scanner {
    /// Create a scanner; each pattern's id is its index.
    pub fn new(patterns: &[&str]) -> Result<Scanner, RegexError> {
        Self::with_config(patterns, &ScannerConfig::default())
    }

    pub fn with_config(patterns: &[&str], config: &ScannerConfig) -> Result<Scanner, RegexError> {
        let with_ids: Vec<(&str, u32)> = patterns
            .iter()
            .zip(0u32..)
            .map(|(p, id)| (*p, id))
            .collect();
        Self::with_ids_and_config(&with_ids, config)
    }

    /// Create a scanner from `(pattern, id)` pairs.
    pub fn with_ids(patterns: &[(&str, u32)]) -> Result<Scanner, RegexError> {
        Self::with_ids_and_config(patterns, &ScannerConfig::default())
    }

    pub fn with_ids_and_config(
        patterns: &[(&str, u32)],
        config: &ScannerConfig,
    ) -> Result<Scanner, RegexError> {
        if patterns.is_empty() {
            return Err(RegexError::InvalidArgument);
        }
        let mut regex = Regex::create(config.flags);
        for (pattern, id) in patterns {
            regex.compile(pattern, *id)?;
        }
        regex.finalize()?;
        Ok(Scanner { regex })
    }

    /// Longest match starting exactly at byte `pos`, as `(id, length)`.
    pub fn longest_match(&self, text: &str, pos: usize) -> Option<(u32, usize)> {
        self.regex.longest_match_at(text, pos)
    }

    /// First match at or after byte `start_position`.
    pub fn find_next_match(&self, text: &str, start_position: usize) -> Option<ScannerMatch> {
        let bytes = text.as_bytes();
        let mut pos = start_position;
        while pos < bytes.len() {
            if let Some((m, raw)) = self.regex.match_at_bytes(bytes, pos) {
                let mut capture_indices = SmallVec::new();
                capture_indices.push(CaptureIndex::new(m.start(), m.end()));
                if let Some(refs) = self.regex.as_raw().pattern_refs(m.id()) {
                    for r in &raw.refs[refs] {
                        capture_indices.push(match r {
                            Some(r) => CaptureIndex::new(r.start, r.end),
                            // unmatched optional group
                            None => CaptureIndex::new(0, 0),
                        });
                    }
                }
                return Some(ScannerMatch {
                    index: m.id() as usize,
                    capture_indices,
                });
            }
            pos = step_forward(self.regex.as_raw().enc, bytes, pos);
        }
        None
    }

    /// Iterate over the tokens of `text`. Characters no pattern matches are
    /// skipped.
    pub fn tokens<'s, 't>(&'s self, text: &'t str) -> Tokens<'s, 't> {
        Tokens {
            scanner: self,
            text,
            pos: 0,
        }
    }
}

/// Iterator returned by [`Scanner::tokens`].
pub struct Tokens<'s, 't> {
    scanner: &'s Scanner,
    text: &'t str,
    pos: usize,
}

impl<'s, 't> Iterator for Tokens<'s, 't> {
    type Item = Token<'t>;

    fn next(&mut self) -> Option<Token<'t>> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            let start = self.pos;
            match self.scanner.longest_match(self.text, start) {
                Some((id, len)) => {
                    self.pos = start + len;
                    return Some(Token {
                        id,
                        start,
                        end: self.pos,
                        text: self.text.get(start..self.pos).unwrap_or_default(),
                    });
                }
                None => self.pos = step_forward(self.scanner.regex.as_raw().enc, bytes, start),
            }
        }
        None
    }
}
