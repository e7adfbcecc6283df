#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Err(e) = stellaris_save::text::TreeParser::new().parse(text) {
            let offset = e.offset().unwrap_or(0);
            assert!(offset <= text.len());
        }
    }
});
