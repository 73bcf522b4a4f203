// unicode/mod.rs - Character properties and simple case mapping.
//
// Only one-to-one case mappings are used; characters whose other case
// expands to several characters (e.g. U+00DF) have no counterpart.

use std::sync::OnceLock;

use smallvec::SmallVec;

use crate::regdef::{CodePoint, PREGEX_UNICODE_MAX};

/// Return the other-case counterpart of `code`, if it has a one-to-one
/// mapping that stays within `max`.
pub fn swap_case(code: CodePoint, max: CodePoint) -> Option<CodePoint> {
    let c = char::from_u32(code)?;
    let mut mapped: SmallVec<[char; 3]> = if c.is_lowercase() {
        c.to_uppercase().collect()
    } else if c.is_uppercase() {
        c.to_lowercase().collect()
    } else {
        return None;
    };
    if mapped.len() != 1 {
        return None;
    }
    let other = mapped.pop()? as CodePoint;
    if other == code || other > max {
        None
    } else {
        Some(other)
    }
}

/// Every code point with a one-to-one other case, paired with it.
///
/// Sorted by the first member. Built on first use.
pub fn case_pairs() -> &'static [(CodePoint, CodePoint)] {
    static PAIRS: OnceLock<Vec<(CodePoint, CodePoint)>> = OnceLock::new();
    PAIRS.get_or_init(|| {
        (0..=PREGEX_UNICODE_MAX)
            .filter_map(|code| swap_case(code, PREGEX_UNICODE_MAX).map(|other| (code, other)))
            .collect()
    })
}

#[inline]
pub fn is_alnum(code: CodePoint) -> bool {
    char::from_u32(code).is_some_and(|c| c.is_alphanumeric())
}

/// Word characters for `\<` / `\>` anchors: alphanumerics and underscore.
#[inline]
pub fn is_word(code: CodePoint) -> bool {
    code == '_' as CodePoint || is_alnum(code)
}
