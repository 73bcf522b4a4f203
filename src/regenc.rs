// regenc.rs - Encoding trait and shared character-stepping helpers.
//
// Every stage reads patterns and subjects one character at a time through
// an Encoding: Latin-1 (one byte per character) or UTF-8.

use std::fmt;

use crate::encodings::latin1::PREGEX_ENCODING_LATIN1;
use crate::encodings::utf8::PREGEX_ENCODING_UTF8;
use crate::regdef::*;
use crate::unicode;

// === Encoding type alias ===
pub type PregexEncoding = &'static dyn Encoding;

// === Constants ===
pub const ASCII_LIMIT: CodePoint = 127;
pub const NEWLINE_CODE: CodePoint = 0x0a;
pub const CARRIAGE_RETURN_CODE: CodePoint = 0x0d;

// === Encoding Trait ===
pub trait Encoding: Send + Sync {
    /// Encoding name (e.g. "ISO-8859-1", "UTF-8")
    fn name(&self) -> &str;

    /// Lowest code point of the universe this encoding spans.
    fn min_code(&self) -> CodePoint {
        PREGEX_CHAR_MIN
    }

    /// Highest code point of the universe this encoding spans.
    fn max_code(&self) -> CodePoint;

    /// Returns the byte length of the character starting at p[0].
    /// Never exceeds p.len(); p must not be empty.
    fn mbc_enc_len(&self, p: &[u8]) -> usize;

    /// Decode the character starting at p[0].
    fn mbc_to_code(&self, p: &[u8]) -> CodePoint;

    /// Find the start of the character containing byte offset s.
    fn left_adjust_char_head(&self, data: &[u8], s: usize) -> usize;
}

impl fmt::Debug for dyn Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encoding({})", self.name())
    }
}

// === Encoding selection ===

/// The encoding used for patterns and subjects compiled with `flags`.
pub fn encoding_for_flags(flags: RegexFlags) -> PregexEncoding {
    if flags.contains(RegexFlags::WCHAR) {
        &PREGEX_ENCODING_UTF8
    } else {
        &PREGEX_ENCODING_LATIN1
    }
}

/// The natural encoding of a universe ending at `max`.
pub fn encoding_for_universe(max: CodePoint) -> PregexEncoding {
    if max > PREGEX_BYTE_MAX {
        &PREGEX_ENCODING_UTF8
    } else {
        &PREGEX_ENCODING_LATIN1
    }
}

// === Stepping helpers ===

/// Decode the character at byte offset `pos`.
/// Returns the code point and its byte length, or None at the end of data.
#[inline]
pub fn next_code(enc: &dyn Encoding, data: &[u8], pos: usize) -> Option<(CodePoint, usize)> {
    if pos >= data.len() {
        return None;
    }
    let p = &data[pos..];
    Some((enc.mbc_to_code(p), enc.mbc_enc_len(p)))
}

/// Decode the character ending right before byte offset `pos`.
#[inline]
pub fn prev_code(enc: &dyn Encoding, data: &[u8], pos: usize) -> Option<CodePoint> {
    if pos == 0 || pos > data.len() {
        return None;
    }
    let head = enc.left_adjust_char_head(data, pos - 1);
    Some(enc.mbc_to_code(&data[head..]))
}

/// Byte offset of the character following the one at `pos`.
#[inline]
pub fn step_forward(enc: &dyn Encoding, data: &[u8], pos: usize) -> usize {
    if pos >= data.len() {
        data.len()
    } else {
        pos + enc.mbc_enc_len(&data[pos..])
    }
}

/// Number of characters in `data`.
pub fn char_count(enc: &dyn Encoding, data: &[u8]) -> usize {
    let mut n = 0;
    let mut p = 0;
    while p < data.len() {
        p += enc.mbc_enc_len(&data[p..]);
        n += 1;
    }
    n
}

#[inline]
pub fn is_newline_code(code: CodePoint) -> bool {
    code == NEWLINE_CODE || code == CARRIAGE_RETURN_CODE
}

#[inline]
pub fn is_word_code(code: CodePoint) -> bool {
    unicode::is_word(code)
}

#[inline]
pub fn is_code_ascii(code: CodePoint) -> bool {
    code <= ASCII_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_utf8() {
        let enc = encoding_for_flags(RegexFlags::WCHAR);
        let s = "a€b".as_bytes();
        assert_eq!(next_code(enc, s, 0), Some(('a' as u32, 1)));
        assert_eq!(next_code(enc, s, 1), Some(('€' as u32, 3)));
        assert_eq!(prev_code(enc, s, 4), Some('€' as u32));
        assert_eq!(step_forward(enc, s, 1), 4);
        assert_eq!(char_count(enc, s), 3);
        assert_eq!(next_code(enc, s, 5), None);
        assert_eq!(prev_code(enc, s, 0), None);
    }

    #[test]
    fn stepping_bytes() {
        let enc = encoding_for_flags(RegexFlags::empty());
        let s = "a€".as_bytes();
        assert_eq!(char_count(enc, s), 4);
        assert_eq!(next_code(enc, s, 1), Some((0xe2, 1)));
        assert_eq!(prev_code(enc, s, 4), Some(0xac));
    }

    #[test]
    fn debug_names_the_encoding() {
        let enc = encoding_for_flags(RegexFlags::WCHAR);
        assert_eq!(format!("{:?}", enc), "Encoding(UTF-8)");
    }

    #[test]
    fn universe_selection() {
        assert_eq!(encoding_for_universe(0xff).name(), "ISO-8859-1");
        assert_eq!(encoding_for_universe(PREGEX_UNICODE_MAX).name(), "UTF-8");
    }

    #[test]
    fn newline_codes() {
        assert!(is_newline_code('\n' as u32));
        assert!(is_newline_code('\r' as u32));
        assert!(!is_newline_code(' ' as u32));
    }
}
