#![no_main]

use etherdaw_compiler::notation::{parse_degree, parse_duration_expr, parse_token, TokenContext};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_token(s, TokenContext::Note);
    let _ = parse_token(s, TokenContext::Chord);
    let _ = parse_degree(s);
    if let Ok(beats) = parse_duration_expr(s) {
        assert!(beats.is_finite() && beats > 0.0);
    }
});
