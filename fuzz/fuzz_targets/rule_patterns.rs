#![no_main]

use libfuzzer_sys::fuzz_target;
use rulesplit::{RuleEngine, RuleSpec};

const MAX_PATTERN_LEN: usize = 256;
const MAX_VALUE_LEN: usize = 1024;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let reject = data[0] & 0x1 == 0x1;
    let pattern_len = (data[1] as usize).min(MAX_PATTERN_LEN).min(data.len() - 2);
    let pattern = String::from_utf8_lossy(&data[2..2 + pattern_len]);
    let rest = &data[2 + pattern_len..];
    let value = String::from_utf8_lossy(&rest[..rest.len().min(MAX_VALUE_LEN)]);

    let spec = if reject {
        RuleSpec::reject(pattern.to_string())
    } else {
        RuleSpec::accept(pattern.to_string())
    };

    // Bad patterns must be reported, never panic
    let Ok(engine) = RuleEngine::from_specs(&[spec]) else {
        return;
    };

    let first = engine.is_valid(&value);
    assert_eq!(first, engine.is_valid(&value));
});
