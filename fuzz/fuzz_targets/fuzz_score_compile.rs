#![no_main]

use etherdaw_compiler::{compile, CompileOptions};
use etherdaw_spec::Score;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(score) = Score::from_json(text) else {
        return;
    };
    // Huge bar counts are valid input but only measure allocation speed.
    if score.sections.values().any(|s| s.bars > 256) {
        return;
    }
    let options = CompileOptions::new().with_parallel(false);
    if let Ok(output) = compile(&score, &options) {
        assert!(output
            .timeline
            .events
            .windows(2)
            .all(|w| w[0].time_beats <= w[1].time_beats));
        let _ = serde_json::to_string(&output.timeline);
    }
});
