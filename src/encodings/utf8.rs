// encodings/utf8.rs - UTF-8 encoding.
// RFC 3629 range: U+0000 - U+10FFFF. Malformed lead bytes decode as
// one-byte characters carrying their byte value.

use crate::regdef::*;
use crate::regenc::*;

// === UTF-8 Helpers ===

#[inline]
fn utf8_istail(c: u8) -> bool {
    (c & 0xc0) == 0x80
}

// === EncLen_UTF8 Table ===
// Maps first byte to character length (RFC 3629: max 4 bytes).

static ENC_LEN_UTF8: [u8; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

/// Length of the well-formed prefix of the sequence starting at p[0].
#[inline]
fn seq_len(p: &[u8]) -> usize {
    let want = ENC_LEN_UTF8[p[0] as usize] as usize;
    let mut len = 1;
    while len < want && len < p.len() && utf8_istail(p[len]) {
        len += 1;
    }
    if len == want {
        len
    } else {
        1
    }
}

// === UTF-8 Encoding Struct ===

pub struct Utf8Encoding;

pub static PREGEX_ENCODING_UTF8: Utf8Encoding = Utf8Encoding;

impl Encoding for Utf8Encoding {
    fn name(&self) -> &str {
        "UTF-8"
    }

    fn max_code(&self) -> CodePoint {
        PREGEX_UNICODE_MAX
    }

    #[inline]
    fn mbc_enc_len(&self, p: &[u8]) -> usize {
        seq_len(p)
    }

    fn mbc_to_code(&self, p: &[u8]) -> CodePoint {
        let len = seq_len(p);
        let c = p[0] as u32;
        if len > 1 {
            let remaining = len - 1;
            let mut n = c & ((1u32 << (6 - remaining)) - 1);
            for &b in &p[1..len] {
                n = (n << 6) | ((b as u32) & 0x3f);
            }
            n
        } else {
            c
        }
    }

    fn left_adjust_char_head(&self, data: &[u8], s: usize) -> usize {
        let mut p = s;
        while p > 0 && s - p < 3 && utf8_istail(data[p]) {
            p -= 1;
        }
        // a stray tail byte is a character of its own
        if seq_len(&data[p..]) > s - p {
            p
        } else {
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_multibyte() {
        let enc = &PREGEX_ENCODING_UTF8;
        assert_eq!(enc.mbc_to_code("é".as_bytes()), 0xe9);
        assert_eq!(enc.mbc_to_code("€".as_bytes()), 0x20ac);
        assert_eq!(enc.mbc_to_code("𝒜".as_bytes()), 0x1d49c);
        assert_eq!(enc.mbc_enc_len("𝒜".as_bytes()), 4);
    }

    #[test]
    fn malformed_sequences_are_single_bytes() {
        let enc = &PREGEX_ENCODING_UTF8;
        assert_eq!(enc.mbc_enc_len(&[0xe2, 0x82]), 1);
        assert_eq!(enc.mbc_to_code(&[0xe2, 0x41]), 0xe2);
        assert_eq!(enc.mbc_enc_len(&[0x80]), 1);
    }

    #[test]
    fn left_adjust() {
        let enc = &PREGEX_ENCODING_UTF8;
        let s = "a€".as_bytes();
        assert_eq!(enc.left_adjust_char_head(s, 3), 1);
        assert_eq!(enc.left_adjust_char_head(s, 1), 1);
        assert_eq!(enc.left_adjust_char_head(s, 0), 0);
        let stray = [b'a', 0x80];
        assert_eq!(enc.left_adjust_char_head(&stray, 1), 1);
    }
}
