#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use rulesplit::presets::{preset_rules, DEFAULT_PRESET};
use rulesplit::{build_record, CsvRecordSource, RuleEngine};

const MAX_INPUT_LEN: usize = 16 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > MAX_INPUT_LEN {
        return;
    }

    let has_header = data[0] & 0x1 == 0x1;
    let source = CsvRecordSource::from_reader(Cursor::new(data[1..].to_vec()), has_header);

    let Ok(specs) = preset_rules(DEFAULT_PRESET) else {
        return;
    };
    let Ok(engine) = RuleEngine::from_specs(&specs) else {
        return;
    };

    for row in source {
        let Ok(fields) = row else {
            break;
        };
        let width = fields.len();
        match build_record(fields) {
            Ok(record) => {
                assert_eq!(width, 2);
                let _ = engine.is_valid(&record.value);
            }
            Err(reason) => {
                // Every rejection must explain itself
                assert!(!reason.to_string().is_empty());
            }
        }
    }
});
