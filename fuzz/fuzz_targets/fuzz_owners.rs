#![no_main]
use libfuzzer_sys::fuzz_target;

use launchgate_engine::approvers::owners::{decode_owners_content, parse_owners_text};

fuzz_target!(|data: &[u8]| {
    for email in decode_owners_content(data) {
        assert!(email.contains('@') && email.contains('.'));
        assert!(!email.contains('#'));
    }
    if let Ok(text) = std::str::from_utf8(data) {
        for email in parse_owners_text(text) {
            assert_eq!(email.trim(), email);
        }
    }
});
