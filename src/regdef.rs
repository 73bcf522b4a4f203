// regdef.rs - Public types and constants.
//
// Code points, compile/match flags, anchor bits, accept metadata and
// the numeric error codes shared by every engine stage.

use std::fmt;

use bitflags::bitflags;

// === Basic Types ===
pub type CodePoint = u32;

/// Lowest code point of every universe.
pub const PREGEX_CHAR_MIN: CodePoint = 0;
/// Highest code point of the byte universe.
pub const PREGEX_BYTE_MAX: CodePoint = 0xff;
/// Highest code point of the Unicode universe.
pub const PREGEX_UNICODE_MAX: CodePoint = 0x10ffff;

// === Flags ===

bitflags! {
    /// Compile and match modifiers.
    ///
    /// The bit values are stable and may be stored or exchanged as plain
    /// integers through [`RegexFlags::bits`] / [`RegexFlags::from_bits_truncate`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegexFlags: u32 {
        /// Pattern and subject are decoded as UTF-8 over the full Unicode universe.
        const WCHAR       = 1;
        /// Case-insensitive matching.
        const INSENSITIVE = 1 << 1;
        /// Process every match, not only the first.
        const GLOBAL      = 1 << 2;
        /// Treat the pattern as literal text.
        const STATIC      = 1 << 3;
        /// Do not track sub-expression references.
        const NO_REF      = 1 << 4;
        /// Recover from pattern syntax errors by taking the offending character literally.
        const NO_ERRORS   = 1 << 5;
        /// Anchor characters are ordinary characters.
        const NO_ANCHORS  = 1 << 6;
        /// Force longest-match behaviour at match time.
        const GREEDY      = 1 << 7;
        /// Prefer the shortest match.
        const NONGREEDY   = 1 << 8;
        /// Emit diagnostic traces through the `log` facade.
        const DEBUG       = 1 << 10;
    }
}

bitflags! {
    /// Zero-width conditions attached to an accepting alternative.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Anchors: u8 {
        /// Begin of line (`^`).
        const BOL = 1;
        /// End of line (`$`).
        const EOL = 1 << 1;
        /// Begin of word (`\<`).
        const BOW = 1 << 2;
        /// End of word (`\>`).
        const EOW = 1 << 3;
    }
}

/// Anchor requirements of the alternatives that accept together.
///
/// Bit `n` stands for the combination with [`Anchors::bits`] `n`; a match is
/// valid if any of the recorded combinations holds. The empty combination
/// always holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorSet(u16);

impl AnchorSet {
    /// True if some alternative needs no anchor at all.
    #[inline]
    pub fn is_unanchored(&self) -> bool {
        self.0 & 1 != 0
    }

    /// The single combination of a set built from one alternative.
    pub fn single(&self) -> Option<Anchors> {
        if self.0.count_ones() == 1 {
            Some(Anchors::from_bits_truncate(self.0.trailing_zeros() as u8))
        } else {
            None
        }
    }

    pub fn union(self, other: AnchorSet) -> AnchorSet {
        AnchorSet(self.0 | other.0)
    }

    /// The recorded combinations in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Anchors> + '_ {
        (0..16u8)
            .filter(move |&n| self.0 & (1u16 << n) != 0)
            .map(Anchors::from_bits_truncate)
    }

    /// True if `holds` accepts any of the recorded combinations.
    pub fn any(&self, holds: impl FnMut(Anchors) -> bool) -> bool {
        self.is_unanchored() || self.iter().any(holds)
    }
}

impl From<Anchors> for AnchorSet {
    fn from(anchors: Anchors) -> Self {
        AnchorSet(1u16 << anchors.bits())
    }
}

impl Default for AnchorSet {
    fn default() -> Self {
        Anchors::empty().into()
    }
}

impl fmt::Debug for AnchorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{:?}", a)?;
        }
        Ok(())
    }
}

// === Accept Metadata ===

/// Acceptance information carried by pattern-tree nodes and automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accept {
    /// Pattern id, `None` for a non-accepting state.
    pub accept: Option<u32>,
    /// Longest-match preference of the accepting pattern.
    pub greedy: bool,
    /// Anchors that must hold around a match of this pattern.
    pub anchors: AnchorSet,
}

impl Default for Accept {
    fn default() -> Self {
        Accept {
            accept: None,
            greedy: true,
            anchors: AnchorSet::default(),
        }
    }
}

impl Accept {
    pub fn new(id: u32, greedy: bool, anchors: Anchors) -> Self {
        Accept {
            accept: Some(id),
            greedy,
            anchors: anchors.into(),
        }
    }

    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.accept.is_some()
    }

    /// Anchors of a single alternative; empty when none are required.
    pub fn own_anchors(&self) -> Anchors {
        self.anchors.single().unwrap_or(Anchors::empty())
    }

    /// Fold another accept into this one.
    ///
    /// The lowest pattern id wins. For equal ids the greedy flags are OR-ed and
    /// the anchor sets are united: the merged state accepts whenever any of
    /// the merged alternatives would.
    pub fn merge(&mut self, other: &Accept) {
        let Some(id) = other.accept else {
            return;
        };
        match self.accept {
            Some(cur) if cur < id => {}
            Some(cur) if cur == id => {
                self.greedy |= other.greedy;
                self.anchors = self.anchors.union(other.anchors);
            }
            _ => *self = *other,
        }
    }
}

// === Error Codes ===
pub const PREGEX_NORMAL: i32 = 0;
pub const PREGEX_MISMATCH: i32 = -1;

pub const PREGEX_ERR_MEMORY: i32 = -5;
pub const PREGEX_ERR_INVALID_ARGUMENT: i32 = -30;
pub const PREGEX_ERR_INCOMPATIBLE_DOMAIN: i32 = -40;

// malformed automaton
pub const PREGEX_ERR_NO_START: i32 = -50;
pub const PREGEX_ERR_UNREACHABLE_ACCEPT: i32 = -51;

// pattern syntax
pub const PREGEX_ERR_EMPTY_EXPRESSION: i32 = -100;
pub const PREGEX_ERR_PREMATURE_END_OF_CHAR_CLASS: i32 = -102;
pub const PREGEX_ERR_END_PATTERN_AT_ESCAPE: i32 = -104;
pub const PREGEX_ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED: i32 = -113;
pub const PREGEX_ERR_UNMATCHED_CLOSE_PARENTHESIS: i32 = -116;
pub const PREGEX_ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS: i32 = -117;
pub const PREGEX_ERR_PARSE_DEPTH_LIMIT_OVER: i32 = -121;

#[inline]
pub fn pregex_is_pattern_error(ecode: i32) -> bool {
    ecode <= -100 && ecode > -1000
}

#[inline]
pub fn pregex_is_automaton_error(ecode: i32) -> bool {
    ecode == PREGEX_ERR_NO_START || ecode == PREGEX_ERR_UNREACHABLE_ACCEPT
}
