#![no_main]

use callsift::relevance::{classify, is_relevant};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        // Total over all inputs and consistent with classify
        assert_eq!(is_relevant(name), classify(name).is_none());
    }
});
