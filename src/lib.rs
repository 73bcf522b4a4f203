//! # pregex
//!
//! A regular expression engine built from automata: patterns are parsed into
//! a tree, compiled into a Thompson NFA and optionally turned into a
//! minimized DFA. Both machines run over bytes (Latin-1) or, with
//! [`RegexFlags::WCHAR`](regdef::RegexFlags::WCHAR), over UTF-8 text.
//!
//! Several patterns can share one machine, each reporting its own id, which
//! makes the engine usable as a lexer front end.
//!
//! ## Quick Start
//!
//! ```rust
//! use pregex::prelude::*;
//!
//! let re = Regex::new("[0-9][0-9]*-[0-9]+").unwrap();
//! let m = re.find("Ticket 2026-17 closed").unwrap();
//! assert_eq!(m.as_str(), "2026-17");
//! assert_eq!(m.start(), 7);
//! ```
//!
//! Repeated matching, splitting and replacing keep their state in the object:
//!
//! ```rust
//! use pregex::prelude::*;
//!
//! let mut re = Regex::builder("([gG]liding)")
//!     .case_insensitive(true)
//!     .global(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     re.replace("Gliding and gliding", "<b>$1</b>"),
//!     "<b>Gliding</b> and <b>gliding</b>"
//! );
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regdef`] | Flags, accept metadata, error codes |
//! | [`ccl`] | Character classes |
//! | [`regparse_types`] | Pattern tree |
//! | [`regparse`] | Pattern parser and pattern printer |
//! | [`regcomp`] | NFA construction and compile entry points |
//! | [`regdfa`] | Subset construction, minimization, default transitions |
//! | [`regexec`] | Matching engine |
//! | [`regint`] | Compiled object internals |
//! | [`api`] | `Regex`, `RegexBuilder`, `Match` |
//! | [`direct`] | `qmatch`, `qsplit`, `qreplace` |
//! | [`scanner`] | Multi-pattern scanner |
//! | [`regenc`] | Encoding trait |
//! | [`regerror`] | Error messages |

pub mod api;
pub mod ccl;
pub mod direct;
pub mod encodings;
pub mod error;
pub mod prelude;
pub mod regcomp;
pub mod regdef;
pub mod regdfa;
pub mod regenc;
pub mod regerror;
pub mod regexec;
pub mod regint;
pub mod regparse;
pub mod regparse_types;
pub mod scanner;
pub mod unicode;
