#![no_main]

use ichiryu_rules::{apply_correction, parse_correction};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Some(correction) = parse_correction(&raw, "fuzzer") {
        assert!(matches!(raw.matches('/').count(), 2 | 3));
        let flags = raw.split('/').nth(3).unwrap_or_default();
        assert_eq!(correction.case_insensitive, flags.contains('i'));
        let _ = apply_correction("the quick brown fox", &correction);
    }
});
