// encodings/latin1.rs - Byte encoding.
// Every byte is one character; the universe is U+0000 - U+00FF.

use crate::regdef::*;
use crate::regenc::*;

pub struct Latin1Encoding;

pub static PREGEX_ENCODING_LATIN1: Latin1Encoding = Latin1Encoding;

impl Encoding for Latin1Encoding {
    fn name(&self) -> &str {
        "ISO-8859-1"
    }

    fn max_code(&self) -> CodePoint {
        PREGEX_BYTE_MAX
    }

    #[inline]
    fn mbc_enc_len(&self, _p: &[u8]) -> usize {
        1
    }

    #[inline]
    fn mbc_to_code(&self, p: &[u8]) -> CodePoint {
        p[0] as CodePoint
    }

    #[inline]
    fn left_adjust_char_head(&self, _data: &[u8], s: usize) -> usize {
        s
    }
}
