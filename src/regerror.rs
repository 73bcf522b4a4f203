// regerror.rs - Error code to string conversion.
//
// Maps the numeric error codes from regdef to human-readable messages.

use crate::regdef::*;

/// Get the message for an error code.
pub fn pregex_error_code_to_format(code: i32) -> &'static str {
    match code {
        PREGEX_NORMAL => "success",
        PREGEX_MISMATCH => "mismatch",
        PREGEX_ERR_MEMORY => "fail to memory allocation",
        PREGEX_ERR_INVALID_ARGUMENT => "invalid argument",
        PREGEX_ERR_INCOMPATIBLE_DOMAIN => "incompatible character universes",
        PREGEX_ERR_NO_START => "automaton has no start state",
        PREGEX_ERR_UNREACHABLE_ACCEPT => "no accepting state is reachable",
        PREGEX_ERR_EMPTY_EXPRESSION => "empty expression",
        PREGEX_ERR_PREMATURE_END_OF_CHAR_CLASS => "premature end of char-class",
        PREGEX_ERR_END_PATTERN_AT_ESCAPE => "end pattern at escape",
        PREGEX_ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED => {
            "target of repeat operator is not specified"
        }
        PREGEX_ERR_UNMATCHED_CLOSE_PARENTHESIS => "unmatched close parenthesis",
        PREGEX_ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS => {
            "end pattern with unmatched parenthesis"
        }
        PREGEX_ERR_PARSE_DEPTH_LIMIT_OVER => "parse depth limit over",
        _ => "undefined error code",
    }
}

/// Format a pattern error with the offending byte position.
pub fn pregex_error_code_to_str(code: i32, position: usize) -> String {
    let msg = pregex_error_code_to_format(code);
    if pregex_is_pattern_error(code) {
        format!("{} at position {}", msg, position)
    } else {
        msg.to_string()
    }
}
