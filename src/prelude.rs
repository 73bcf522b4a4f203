// prelude.rs - Convenient re-exports for the object API.
//
//! # Prelude
//!
//! ```
//! use pregex::prelude::*;
//!
//! let re = Regex::new("[0-9]+").unwrap();
//! let m = re.find("answer: 42").unwrap();
//! assert_eq!(m.as_str(), "42");
//! ```

pub use crate::api::{FindIter, Match, MatchVerdict, Regex, RegexBuilder};
pub use crate::direct::{qmatch, qreplace, qsplit};
pub use crate::error::RegexError;
pub use crate::regdef::RegexFlags;
pub use crate::scanner::{Scanner, ScannerConfig, Token};
