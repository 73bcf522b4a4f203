// direct.rs - Quick functions.
//
// One-shot entry points that create an object, compile a single pattern,
// finalize it, run one operation and drop the object again. Without
// `GLOBAL` they stop after the first match.

use crate::api::{Match, Regex};
use crate::error::RegexError;
use crate::regdef::RegexFlags;

fn quick(pattern: &str, flags: RegexFlags) -> Result<Regex, RegexError> {
    Regex::builder(pattern).flags(flags).build()
}

/// All matches of `pattern` in `text`.
///
/// # Examples
///
/// ```
/// use pregex::direct::qmatch;
/// use pregex::regdef::RegexFlags;
///
/// let words = qmatch("[a-z]+", "one two", RegexFlags::GLOBAL).unwrap();
/// assert_eq!(words.iter().map(|m| m.as_str()).collect::<Vec<_>>(), ["one", "two"]);
/// ```
pub fn qmatch<'t>(pattern: &str, text: &'t str, flags: RegexFlags) -> Result<Vec<Match<'t>>, RegexError> {
    Ok(quick(pattern, flags)?.matches(text))
}

/// Split `text` at matches of `pattern`.
pub fn qsplit<'t>(pattern: &str, text: &'t str, flags: RegexFlags) -> Result<Vec<&'t str>, RegexError> {
    Ok(quick(pattern, flags)?.split(text))
}

/// Replace matches of `pattern` in `text` by `template` (`$0`, `$1`, ...).
pub fn qreplace(
    pattern: &str,
    text: &str,
    template: &str,
    flags: RegexFlags,
) -> Result<String, RegexError> {
    let mut re = quick(pattern, flags)?;
    Ok(re.replace(text, template).to_string())
}
