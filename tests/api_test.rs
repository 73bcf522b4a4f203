// api_test.rs - Integration tests for the object API and quick functions.

use std::cell::Cell;
use std::rc::Rc;

use pregex::api::{Regex, RegexBuilder};
use pregex::error::RegexError;
use pregex::prelude::*;
use pregex::regdef::*;

fn both(pattern: &str, flags: RegexFlags) -> [Regex; 2] {
    [false, true].map(|dfa| {
        Regex::builder(pattern)
            .flags(flags)
            .dfa(dfa)
            .build()
            .unwrap_or_else(|e| panic!("compile failed for {:?}: {}", pattern, e))
    })
}

// === End-to-end ===

#[test]
fn short_whole_words() {
    for mut re in both("\\<[A-Za-z_][A-Za-z_]?\\>", RegexFlags::GLOBAL) {
        let words: Vec<&str> = re
            .matches("Gliding is a recreational activity")
            .iter()
            .map(|m| m.as_str())
            .collect();
        assert_eq!(words, vec!["is", "a"]);
    }
}

#[test]
fn split_on_punctuation() {
    for mut re in both("[.,;] ?", RegexFlags::GLOBAL) {
        assert_eq!(re.split("a, b; c."), vec!["a", "b", "c", ""]);
    }
}

#[test]
fn replace_with_capture() {
    let flags = RegexFlags::INSENSITIVE | RegexFlags::GLOBAL;
    for mut re in both("([gG]liding)", flags) {
        assert_eq!(
            re.replace("Gliding and gliding", "<b>$1</b>"),
            "<b>Gliding</b> and <b>gliding</b>"
        );
    }
    assert_eq!(
        qreplace("([gG]liding)", "Gliding and gliding", "<b>$1</b>", flags).unwrap(),
        "<b>Gliding</b> and <b>gliding</b>"
    );
}

#[test]
fn two_patterns_one_object() {
    for dfa in [false, true] {
        let mut re = Regex::create(RegexFlags::GLOBAL);
        re.compile("[A-Z]+", 0).unwrap();
        re.compile("[0-9]+", 1).unwrap();
        if dfa {
            re.finalize().unwrap();
        }
        let found: Vec<(u32, &str)> = re.matches("AB12").iter().map(|m| (m.id(), m.as_str())).collect();
        assert_eq!(found, vec![(0, "AB"), (1, "12")]);
    }
}

#[test]
fn rejecting_callback_leaves_text_alone() {
    for mut re in both("[a-z]+", RegexFlags::GLOBAL) {
        re.set_match_fn(|_| MatchVerdict::Reject);
        let text = "every word stays";
        assert_eq!(re.replace(text, "X"), text);
        assert_eq!(re.match_count(), 0);
    }
}

// === Regex::new / find ===

#[test]
fn simple_pattern() {
    let re = Regex::new("[0-9]+").unwrap();
    let m = re.find("abc 123 def").unwrap();
    assert_eq!(m.as_str(), "123");
    assert_eq!(m.range(), 4..7);
}

#[test]
fn no_match_returns_none() {
    let re = Regex::new("xyz").unwrap();
    assert!(re.find("abc").is_none());
    assert!(!re.is_match("abc"));
}

#[test]
fn invalid_pattern_syntax_error() {
    let err = Regex::new("(unclosed").unwrap_err();
    match err {
        RegexError::Syntax { code, position, .. } => {
            assert_eq!(code, PREGEX_ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS);
            assert_eq!(position, 0);
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn find_iter_all_matches() {
    let re = Regex::new("[a-z]+").unwrap();
    let words: Vec<&str> = re.find_iter("one, two; three").map(|m| m.as_str()).collect();
    assert_eq!(words, vec!["one", "two", "three"]);
    assert_eq!(re.find_iter("").count(), 0);
}

#[test]
fn find_bytes_on_binary_data() {
    let re = Regex::new("\\x00\\xff+").unwrap();
    let data = [1u8, 0, 0xff, 0xff, 2];
    let m = re.find_bytes(&data).unwrap();
    assert_eq!(m.range(), 1..4);
    assert_eq!(m.as_bytes(), &[0, 0xff, 0xff]);
}

#[test]
fn longest_match_at_position() {
    let re = Regex::new("[0-9]+").unwrap();
    assert_eq!(re.longest_match_at("a12b", 0), None);
    assert_eq!(re.longest_match_at("a12b", 1), Some((0, 2)));
}

// === Builder ===

#[test]
fn builder_flags() {
    let re = RegexBuilder::new("abc")
        .case_insensitive(true)
        .global(true)
        .build()
        .unwrap();
    assert_eq!(re.flags(), RegexFlags::INSENSITIVE | RegexFlags::GLOBAL);
    assert!(re.is_finalized());

    let re = Regex::builder("abc").dfa(false).build().unwrap();
    assert!(!re.is_finalized());
    assert!(re.is_match("xabc"));
}

#[test]
fn builder_toggles_off() {
    let re = Regex::builder("a").global(true).global(false).build().unwrap();
    assert!(!re.flags().contains(RegexFlags::GLOBAL));
}

// === Stateful matching ===

#[test]
fn match_next_walks_and_resets() {
    let mut re = Regex::new("[0-9]+").unwrap();
    let text = "1 22 333";
    assert_eq!(re.match_next(text).map(|m| m.range()), Some(0..1));
    assert_eq!(re.last_match(), Some(0..1));
    assert_eq!(re.match_next(text).map(|m| m.range()), Some(2..4));
    assert_eq!(re.match_next(text).map(|m| m.range()), Some(5..8));
    assert!(re.match_next(text).is_none());
    assert!(re.match_next(text).is_none());
    assert_eq!(re.match_count(), 3);

    re.reset();
    assert_eq!(re.match_count(), 0);
    assert_eq!(re.last_match(), None);
    assert_eq!(re.match_next(text).map(|m| m.range()), Some(0..1));
}

#[test]
fn split_next_walks() {
    let mut re = Regex::new(", *").unwrap();
    let text = "a, b,c,";
    let mut spans = Vec::new();
    while let Some(s) = re.split_next(text) {
        spans.push(s);
        assert!(re.last_split().is_some());
    }
    assert_eq!(spans, vec!["a", "b", "c", ""]);
}

#[test]
fn split_without_delimiter() {
    let mut re = Regex::builder(";").global(true).build().unwrap();
    assert_eq!(re.split("abc"), vec!["abc"]);
    assert_eq!(re.split(""), vec![""]);
    assert_eq!(re.split(";;"), vec!["", "", ""]);
}

#[test]
fn split_bytes_and_replace_bytes() {
    let mut re = Regex::builder("\\xff").global(true).build().unwrap();
    let data = [b'a', 0xff, b'b'];
    assert_eq!(re.split_bytes(&data), vec![&b"a"[..], &b"b"[..]]);
    assert_eq!(re.replace_bytes(&data, b"-"), b"a-b");
}

#[test]
fn captures_of_last_match() {
    let mut re = Regex::new("([a-z]+)@([a-z]+)").unwrap();
    let m = re.match_next("mail: joe@example now").unwrap();
    assert_eq!(m.as_str(), "joe@example");
    assert_eq!(re.get_ref(0), Some(6..17));
    assert_eq!(re.get_ref(1), Some(6..9));
    assert_eq!(re.get_ref(2), Some(10..17));
    assert_eq!(re.refs().len(), 2);
}

// === Replace templates ===

#[test]
fn template_references() {
    let mut re = Regex::builder("([a-z]+)=([0-9]+)").global(true).build().unwrap();
    assert_eq!(re.replace("a=1 b=22", "$2=$1"), "1=a 22=b");
    assert_eq!(re.replace("a=1", "[$0]"), "[a=1]");
    // unknown captures expand to nothing, a lone dollar stays
    assert_eq!(re.replace("a=1", "$9$"), "$");
    assert_eq!(re.replace("a=1", "$x"), "$x");
}

#[test]
fn replace_without_match_copies_input() {
    let mut re = Regex::new("q").unwrap();
    assert_eq!(re.replace("abc", "x"), "abc");
}

#[test]
fn replace_result_valid_until_next_call() {
    let mut re = Regex::builder("o").global(true).build().unwrap();
    let first = re.replace("foo", "0").to_string();
    let second = re.replace("boo", "1").to_string();
    assert_eq!(first, "f00");
    assert_eq!(second, "b11");
}

// === Callbacks ===

#[test]
fn callback_replacement_payload() {
    let mut re = Regex::builder("[0-9]+").global(true).build().unwrap();
    re.set_match_fn(|m| {
        let n: u32 = m.as_str().parse().unwrap_or(0);
        MatchVerdict::Replace((n * 2).to_string())
    });
    assert!(re.has_match_fn());
    assert_eq!(re.replace("3 apples, 21 pears", "?"), "6 apples, 42 pears");

    re.reset();
    let m = re.match_next("x7").unwrap();
    assert_eq!(m.replacement(), Some("14"));

    re.clear_match_fn();
    assert!(!re.has_match_fn());
    assert_eq!(re.replace("3", "?"), "?");
}

#[test]
fn callback_sees_every_candidate() {
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    let mut re = Regex::builder("[a-z]").global(true).build().unwrap();
    re.set_match_fn(move |_| {
        counter.set(counter.get() + 1);
        MatchVerdict::Keep
    });
    assert_eq!(re.matches("a1b2c").len(), 3);
    assert_eq!(seen.get(), 3);
}

#[test]
fn stateless_helpers_ignore_the_callback() {
    let mut re = Regex::new("a").unwrap();
    re.set_match_fn(|_| MatchVerdict::Reject);
    assert!(re.is_match("a"));
    assert!(re.find("a").is_some());
    assert!(re.match_next("a").is_none());
}

// === Quick functions ===

#[test]
fn quick_functions() {
    let found = qmatch("[0-9]+", "a1b22", RegexFlags::GLOBAL).unwrap();
    assert_eq!(found.iter().map(|m| m.as_str()).collect::<Vec<_>>(), vec!["1", "22"]);
    assert_eq!(qsplit(" +", "a  b c", RegexFlags::GLOBAL).unwrap(), vec!["a", "b", "c"]);
    assert_eq!(
        qreplace("[aeiou]", "banana", "_", RegexFlags::GLOBAL).unwrap(),
        "b_n_n_"
    );
    assert!(qmatch("(", "x", RegexFlags::empty()).is_err());
}

// === Debug output ===

#[test]
fn debug_format() {
    let re = Regex::new("a|b").unwrap();
    let s = format!("{:?}", re);
    assert!(s.contains("Regex"), "{}", s);
    assert!(s.contains("finalized: true"), "{}", s);
}
