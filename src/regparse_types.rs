// regparse_types.rs - Pattern tree types.
// Ptn nodes, their direct constructors and the debug tree dump.

use std::fmt;

use crate::ccl::CharClass;
use crate::error::RegexError;
use crate::regdef::*;
use crate::regenc::{encoding_for_flags, next_code};
use crate::unicode;

// === Node Type Enum ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PtnType {
    Char = 0,
    Seq = 1,
    Alt = 2,
    Kle = 3,
    Pos = 4,
    Opt = 5,
    Sub = 6,
    RefSub = 7,
}

impl PtnType {
    pub fn name(self) -> &'static str {
        match self {
            PtnType::Char => "CHAR",
            PtnType::Seq => "SEQ",
            PtnType::Alt => "ALT",
            PtnType::Kle => "KLE",
            PtnType::Pos => "POS",
            PtnType::Opt => "OPT",
            PtnType::Sub => "SUB",
            PtnType::RefSub => "REFSUB",
        }
    }
}

/// Node payload. Every node exclusively owns its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PtnNode {
    /// One character out of a class.
    Char(CharClass),
    /// Left followed by right.
    Seq(Box<Ptn>, Box<Ptn>),
    /// Left or right.
    Alt(Box<Ptn>, Box<Ptn>),
    /// Zero or more repetitions (`*`).
    Kle(Box<Ptn>),
    /// One or more repetitions (`+`).
    Pos(Box<Ptn>),
    /// Zero or one occurrence (`?`).
    Opt(Box<Ptn>),
    /// Capturing sub-expression (`(...)`).
    Sub(Box<Ptn>),
    /// Non-capturing sub-expression, used for programmatic building blocks.
    RefSub(Box<Ptn>),
}

/// A pattern tree node.
///
/// `accept` is only set where a complete top-level alternative ends.
///
/// # Examples
///
/// ```
/// use pregex::regparse_types::Ptn;
/// use pregex::regdef::RegexFlags;
///
/// let digits = Ptn::char(pregex::ccl::CharClass::from_definition(0, 255, "0-9"));
/// let ptn = Ptn::seq(Ptn::string("v", RegexFlags::empty()).unwrap(), Ptn::pos(digits));
/// assert_eq!(ptn.to_regex(), "v[0-9]+");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ptn {
    pub node: PtnNode,
    pub accept: Option<Accept>,
}

impl Ptn {
    fn make(node: PtnNode) -> Ptn {
        Ptn { node, accept: None }
    }

    pub fn char(ccl: CharClass) -> Ptn {
        Ptn::make(PtnNode::Char(ccl))
    }

    /// A sequence of single characters matching `text` literally.
    ///
    /// With `INSENSITIVE`, every character also matches its other case.
    pub fn string(text: &str, flags: RegexFlags) -> Result<Ptn, RegexError> {
        Ptn::string_bytes(text.as_bytes(), flags)
    }

    /// Like [`Ptn::string`], decoding `text` with the encoding selected by `flags`.
    pub fn string_bytes(text: &[u8], flags: RegexFlags) -> Result<Ptn, RegexError> {
        let enc = encoding_for_flags(flags);
        let mut items = Vec::new();
        let mut p = 0;
        while let Some((ch, len)) = next_code(enc, text, p) {
            let mut ccl = CharClass::for_encoding(enc);
            ccl.add(ch);
            if flags.contains(RegexFlags::INSENSITIVE) {
                if let Some(other) = unicode::swap_case(ch, enc.max_code()) {
                    ccl.add(other);
                }
            }
            items.push(Ptn::char(ccl));
            p += len;
        }
        Ptn::seq_all(items).ok_or_else(|| RegexError::syntax(PREGEX_ERR_EMPTY_EXPRESSION, 0))
    }

    pub fn seq(left: Ptn, right: Ptn) -> Ptn {
        Ptn::make(PtnNode::Seq(Box::new(left), Box::new(right)))
    }

    pub fn alt(left: Ptn, right: Ptn) -> Ptn {
        Ptn::make(PtnNode::Alt(Box::new(left), Box::new(right)))
    }

    /// Concatenate all items, in order. The tree is kept balanced.
    pub fn seq_all(items: Vec<Ptn>) -> Option<Ptn> {
        balanced(items, Ptn::seq)
    }

    /// Alternate between all items. The tree is kept balanced.
    pub fn alt_all(items: Vec<Ptn>) -> Option<Ptn> {
        balanced(items, Ptn::alt)
    }

    pub fn kle(child: Ptn) -> Ptn {
        Ptn::make(PtnNode::Kle(Box::new(child)))
    }

    pub fn pos(child: Ptn) -> Ptn {
        Ptn::make(PtnNode::Pos(Box::new(child)))
    }

    pub fn opt(child: Ptn) -> Ptn {
        Ptn::make(PtnNode::Opt(Box::new(child)))
    }

    pub fn sub(child: Ptn) -> Ptn {
        Ptn::make(PtnNode::Sub(Box::new(child)))
    }

    pub fn refsub(child: Ptn) -> Ptn {
        Ptn::make(PtnNode::RefSub(Box::new(child)))
    }

    /// Attach accept metadata to this node.
    pub fn with_accept(mut self, accept: Accept) -> Ptn {
        self.accept = Some(accept);
        self
    }

    pub fn ptn_type(&self) -> PtnType {
        match self.node {
            PtnNode::Char(_) => PtnType::Char,
            PtnNode::Seq(..) => PtnType::Seq,
            PtnNode::Alt(..) => PtnType::Alt,
            PtnNode::Kle(_) => PtnType::Kle,
            PtnNode::Pos(_) => PtnType::Pos,
            PtnNode::Opt(_) => PtnType::Opt,
            PtnNode::Sub(_) => PtnType::Sub,
            PtnNode::RefSub(_) => PtnType::RefSub,
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> impl Iterator<Item = &Ptn> {
        let (a, b): (Option<&Ptn>, Option<&Ptn>) = match &self.node {
            PtnNode::Char(_) => (None, None),
            PtnNode::Seq(l, r) | PtnNode::Alt(l, r) => (Some(l.as_ref()), Some(r.as_ref())),
            PtnNode::Kle(c)
            | PtnNode::Pos(c)
            | PtnNode::Opt(c)
            | PtnNode::Sub(c)
            | PtnNode::RefSub(c) => (Some(c.as_ref()), None),
        };
        a.into_iter().chain(b)
    }

    /// True if this node or any descendant carries accept metadata.
    pub fn has_accept(&self) -> bool {
        self.accept.is_some() || self.children().any(Ptn::has_accept)
    }

    /// Universe `(min, max)` of the first character class in the tree.
    pub fn universe(&self) -> Option<(CodePoint, CodePoint)> {
        match &self.node {
            PtnNode::Char(ccl) => Some((ccl.min(), ccl.max())),
            _ => self.children().find_map(Ptn::universe),
        }
    }

    /// Number of capturing sub-expressions.
    pub fn sub_count(&self) -> usize {
        let own = usize::from(self.ptn_type() == PtnType::Sub);
        own + self.children().map(Ptn::sub_count).sum::<usize>()
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.ptn_type().name(), indent = depth * 2)?;
        if let PtnNode::Char(ccl) = &self.node {
            write!(f, " [{}]", ccl)?;
        }
        if let Some(acc) = &self.accept {
            if let Some(id) = acc.accept {
                write!(f, " accept={}", id)?;
            }
            if !acc.greedy {
                write!(f, " nongreedy")?;
            }
            if !acc.anchors.is_unanchored() {
                write!(f, " anchors={:?}", acc.anchors)?;
            }
        }
        writeln!(f)?;
        for child in self.children() {
            child.dump(f, depth + 1)?;
        }
        Ok(())
    }
}

fn balanced(mut items: Vec<Ptn>, join: fn(Ptn, Ptn) -> Ptn) -> Option<Ptn> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        n => {
            let right = items.split_off(n / 2);
            let l = balanced(items, join)?;
            let r = balanced(right, join)?;
            Some(join(l, r))
        }
    }
}

impl fmt::Display for Ptn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f, 0)
    }
}
