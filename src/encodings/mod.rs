// encodings/mod.rs - Encoding registry
// Byte-oriented and wide-character (UTF-8) stepping.

pub mod latin1;
pub mod utf8;

pub use latin1::PREGEX_ENCODING_LATIN1;
pub use utf8::PREGEX_ENCODING_UTF8;
