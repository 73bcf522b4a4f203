// regparse.rs - Pattern parser.
//
// Recursive-descent parser from pattern text to a Ptn tree, plus the
// inverse conversion back to pattern text.
//
// Grammar (postfix binds tightest, alternation loosest):
//
//   alter  := seq ('|' seq)*
//   seq    := factor+
//   factor := atom ('*' | '+' | '?')*
//   atom   := '(' alter ')' | '[' '^'? class ']' | '\' escape | char
//
// Anchors (`^`, `\<` leading and `$`, `\>` trailing) are recognized only at
// the ends of a top-level alternative.

use log::debug;

use crate::ccl::{pregex_ccl_parse_char, pregex_escape_char, CharClass};
use crate::error::RegexError;
use crate::regdef::*;
use crate::regenc::{encoding_for_flags, next_code, PregexEncoding};
use crate::regparse_types::*;

/// Maximum nesting depth of groups.
pub const PARSE_DEPTH_LIMIT: u32 = 512;

struct ParseEnv<'a> {
    pattern: &'a [u8],
    pos: usize,
    enc: PregexEncoding,
    flags: RegexFlags,
    depth: u32,
}

impl<'a> ParseEnv<'a> {
    #[inline]
    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    #[inline]
    fn peek_is(&self, s: &[u8]) -> bool {
        self.pattern[self.pos..].starts_with(s)
    }

    #[inline]
    fn recover(&self) -> bool {
        self.flags.contains(RegexFlags::NO_ERRORS)
    }

    #[inline]
    fn anchors_enabled(&self) -> bool {
        !self.flags.contains(RegexFlags::NO_ANCHORS)
    }

    fn fail(&self, code: i32, at: usize) -> RegexError {
        RegexError::syntax(code, at)
    }

    fn new_class(&self) -> CharClass {
        CharClass::for_encoding(self.enc)
    }

    /// Take the character at `pos` literally.
    fn literal(&mut self) -> Ptn {
        let (ch, len) = next_code(self.enc, self.pattern, self.pos).unwrap_or((0, 1));
        self.pos += len;
        let mut ccl = self.new_class();
        ccl.add(ch);
        Ptn::char(ccl)
    }

    /// Length and kind of a run of trailing anchors starting at `pos`, if the
    /// run ends the current top-level alternative.
    fn trailing_anchors(&self) -> Option<(Anchors, usize)> {
        let mut anchors = Anchors::empty();
        let mut p = self.pos;
        loop {
            let rest = &self.pattern[p..];
            if rest.starts_with(b"$") {
                anchors |= Anchors::EOL;
                p += 1;
            } else if rest.starts_with(b"\\>") {
                anchors |= Anchors::EOW;
                p += 2;
            } else {
                break;
            }
        }
        let ends = p == self.pattern.len() || self.pattern[p] == b'|';
        if p > self.pos && ends {
            Some((anchors, p - self.pos))
        } else {
            None
        }
    }

    fn leading_anchors(&mut self) -> Anchors {
        let mut anchors = Anchors::empty();
        loop {
            if self.peek_is(b"^") {
                anchors |= Anchors::BOL;
                self.pos += 1;
            } else if self.peek_is(b"\\<") {
                anchors |= Anchors::BOW;
                self.pos += 2;
            } else {
                return anchors;
            }
        }
    }

    // === Top level ===

    fn parse_top(&mut self, id: u32) -> Result<Ptn, RegexError> {
        let greedy = !self.flags.contains(RegexFlags::NONGREEDY);
        let mut alts = Vec::new();
        loop {
            let mut anchors = Anchors::empty();
            if self.anchors_enabled() {
                anchors |= self.leading_anchors();
            }
            let seq = self.parse_seq(true)?;
            if self.anchors_enabled() {
                if let Some((trailing, len)) = self.trailing_anchors() {
                    anchors |= trailing;
                    self.pos += len;
                }
            }
            alts.push(seq.with_accept(Accept::new(id, greedy, anchors)));

            match self.peek() {
                Some(b'|') => self.pos += 1,
                _ => break,
            }
        }
        Ptn::alt_all(alts).ok_or_else(|| self.fail(PREGEX_ERR_EMPTY_EXPRESSION, self.pos))
    }

    // === Alternation inside groups ===

    fn parse_alter(&mut self) -> Result<Ptn, RegexError> {
        let mut alts = vec![self.parse_seq(false)?];
        while self.peek() == Some(b'|') {
            self.pos += 1;
            alts.push(self.parse_seq(false)?);
        }
        Ptn::alt_all(alts).ok_or_else(|| self.fail(PREGEX_ERR_EMPTY_EXPRESSION, self.pos))
    }

    fn parse_seq(&mut self, top: bool) -> Result<Ptn, RegexError> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == b'|' || (c == b')' && self.depth > 0) {
                break;
            }
            if top && self.anchors_enabled() && self.trailing_anchors().is_some() {
                break;
            }
            items.push(self.parse_factor()?);
        }
        Ptn::seq_all(items).ok_or_else(|| self.fail(PREGEX_ERR_EMPTY_EXPRESSION, self.pos))
    }

    fn parse_factor(&mut self) -> Result<Ptn, RegexError> {
        let mut ptn = match self.peek() {
            Some(b'*' | b'+' | b'?') => {
                if !self.recover() {
                    return Err(self.fail(
                        PREGEX_ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED,
                        self.pos,
                    ));
                }
                self.literal()
            }
            _ => self.parse_atom()?,
        };

        loop {
            let op = match self.peek() {
                Some(c @ (b'*' | b'+' | b'?')) => c,
                _ => return Ok(ptn),
            };
            self.pos += 1;
            ptn = closure(ptn, op);
        }
    }

    fn parse_atom(&mut self) -> Result<Ptn, RegexError> {
        match self.peek() {
            Some(b'(') => self.parse_group(),
            Some(b'[') => self.parse_class(),
            Some(b'\\') => self.parse_escape(),
            Some(b')') => {
                // only reached outside of any group
                if !self.recover() {
                    return Err(self.fail(PREGEX_ERR_UNMATCHED_CLOSE_PARENTHESIS, self.pos));
                }
                Ok(self.literal())
            }
            _ => Ok(self.literal()),
        }
    }

    fn parse_group(&mut self) -> Result<Ptn, RegexError> {
        let open = self.pos;
        if self.depth >= PARSE_DEPTH_LIMIT {
            return Err(self.fail(PREGEX_ERR_PARSE_DEPTH_LIMIT_OVER, open));
        }
        self.pos += 1;
        self.depth += 1;
        let inner = self.parse_alter();
        self.depth -= 1;
        let inner = inner?;

        if self.peek() != Some(b')') {
            if !self.recover() {
                return Err(self.fail(PREGEX_ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS, open));
            }
            self.pos = open;
            return Ok(self.literal());
        }
        self.pos += 1;
        Ok(Ptn::sub(inner))
    }

    fn parse_class(&mut self) -> Result<Ptn, RegexError> {
        let open = self.pos;
        let mut p = open + 1;
        let negate = self.pattern.get(p) == Some(&b'^');
        if negate {
            p += 1;
        }
        let body_start = p;
        while p < self.pattern.len() && self.pattern[p] != b']' {
            p += if self.pattern[p] == b'\\' && p + 1 < self.pattern.len() {
                2
            } else {
                1
            };
        }
        if p >= self.pattern.len() {
            if !self.recover() {
                return Err(self.fail(PREGEX_ERR_PREMATURE_END_OF_CHAR_CLASS, open));
            }
            return Ok(self.literal());
        }

        let mut ccl = self.new_class();
        ccl.parse_bytes(&self.pattern[body_start..p], self.enc, false);
        if negate {
            ccl.negate();
        }
        self.pos = p + 1;
        Ok(Ptn::char(ccl))
    }

    fn parse_escape(&mut self) -> Result<Ptn, RegexError> {
        let Some(&c) = self.pattern.get(self.pos + 1) else {
            if !self.recover() {
                return Err(self.fail(PREGEX_ERR_END_PATTERN_AT_ESCAPE, self.pos));
            }
            return Ok(self.literal());
        };

        if let Some(sh) = self.new_class().shorthand(c) {
            self.pos += 2;
            return Ok(Ptn::char(sh));
        }

        let (ch, len) = pregex_ccl_parse_char(self.pattern, self.pos, self.enc, true);
        self.pos += len;
        let mut ccl = self.new_class();
        ccl.add(ch);
        Ok(Ptn::char(ccl))
    }
}

/// Apply a postfix operator. Stacked operators collapse into a single
/// closure, so `a+*` and `a*?` both become `a*`.
fn closure(ptn: Ptn, op: u8) -> Ptn {
    let inner = match ptn.ptn_type() {
        PtnType::Kle => b'*',
        PtnType::Pos => b'+',
        PtnType::Opt => b'?',
        _ => 0,
    };
    if inner != 0 && ptn.accept.is_none() {
        let merged = if inner == op { op } else { b'*' };
        if let PtnNode::Kle(child) | PtnNode::Pos(child) | PtnNode::Opt(child) = ptn.node {
            return wrap(*child, merged);
        }
    }
    wrap(ptn, op)
}

fn wrap(ptn: Ptn, op: u8) -> Ptn {
    match op {
        b'*' => Ptn::kle(ptn),
        b'+' => Ptn::pos(ptn),
        _ => Ptn::opt(ptn),
    }
}

/// Parse `pattern` into a pattern tree whose top-level alternatives accept
/// with pattern id `id`.
///
/// With `STATIC` the whole pattern is a literal string and no anchors are
/// recognized.
pub fn pregex_ptn_parse(pattern: &[u8], flags: RegexFlags, id: u32) -> Result<Ptn, RegexError> {
    let greedy = !flags.contains(RegexFlags::NONGREEDY);
    let ptn = if flags.contains(RegexFlags::STATIC) {
        Ptn::string_bytes(pattern, flags)?.with_accept(Accept::new(id, greedy, Anchors::empty()))
    } else {
        let mut env = ParseEnv {
            pattern,
            pos: 0,
            enc: encoding_for_flags(flags),
            flags,
            depth: 0,
        };
        env.parse_top(id)?
    };

    if flags.contains(RegexFlags::DEBUG) {
        debug!("pregex_ptn_parse: {:?}\n{}", String::from_utf8_lossy(pattern), ptn);
    }
    Ok(ptn)
}

// === Conversion back to pattern text ===

/// Binding strength of a node's outermost construct.
fn precedence(ptn: &Ptn) -> u8 {
    if ptn.accept.is_some_and(|a| !a.own_anchors().is_empty()) {
        return 0;
    }
    match ptn.node {
        PtnNode::Alt(..) => 0,
        PtnNode::Seq(..) => 1,
        PtnNode::Kle(_) | PtnNode::Pos(_) | PtnNode::Opt(_) => 2,
        PtnNode::Char(_) | PtnNode::Sub(_) | PtnNode::RefSub(_) => 3,
    }
}

fn emit_child(out: &mut String, ptn: &Ptn, min_prec: u8) {
    if precedence(ptn) < min_prec {
        out.push('(');
        emit(out, ptn);
        out.push(')');
    } else {
        emit(out, ptn);
    }
}

fn emit(out: &mut String, ptn: &Ptn) {
    let anchors = ptn.accept.map_or(Anchors::empty(), |a| a.own_anchors());
    if anchors.contains(Anchors::BOL) {
        out.push('^');
    }
    if anchors.contains(Anchors::BOW) {
        out.push_str("\\<");
    }

    match &ptn.node {
        PtnNode::Char(ccl) => {
            if ccl.count() == 1 {
                if let Some(ch) = ccl.get(0) {
                    pregex_escape_char(out, ch, ccl.max() > PREGEX_BYTE_MAX);
                }
            } else {
                out.push('[');
                out.push_str(&ccl.to_string());
                out.push(']');
            }
        }
        PtnNode::Seq(l, r) => {
            emit_child(out, l, 1);
            emit_child(out, r, 1);
        }
        PtnNode::Alt(l, r) => {
            emit(out, l);
            out.push('|');
            emit(out, r);
        }
        PtnNode::Kle(c) => {
            emit_child(out, c, 2);
            out.push('*');
        }
        PtnNode::Pos(c) => {
            emit_child(out, c, 2);
            out.push('+');
        }
        PtnNode::Opt(c) => {
            emit_child(out, c, 2);
            out.push('?');
        }
        PtnNode::Sub(c) | PtnNode::RefSub(c) => {
            out.push('(');
            emit(out, c);
            out.push(')');
        }
    }

    if anchors.contains(Anchors::EOW) {
        out.push_str("\\>");
    }
    if anchors.contains(Anchors::EOL) {
        out.push('$');
    }
}

/// Render a pattern tree as pattern text.
///
/// Parsing the result accepts the same language as the tree. Sub-expressions
/// are emitted as groups, so non-capturing groups come back capturing.
pub fn pregex_ptn_to_regex(ptn: &Ptn) -> String {
    let mut out = String::new();
    emit(&mut out, ptn);
    out
}

impl Ptn {
    /// Parse `pattern` with the given flags, tagging it as pattern 0.
    pub fn parse(pattern: &str, flags: RegexFlags) -> Result<Ptn, RegexError> {
        pregex_ptn_parse(pattern.as_bytes(), flags, 0)
    }

    /// Render the tree as pattern text; see [`pregex_ptn_to_regex`].
    pub fn to_regex(&self) -> String {
        pregex_ptn_to_regex(self)
    }
}
