#![no_main]

use callsift::call_log::LogRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Any parsed record has non-empty components and writes back to itself
        if let Some(record) = LogRecord::parse(line) {
            assert!(!record.image().is_empty());
            assert!(!record.function().is_empty());
            assert_eq!(LogRecord::parse(&record.to_string()), Some(record));
        }
    }
});
