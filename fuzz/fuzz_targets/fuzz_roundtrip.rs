#![no_main]
use libfuzzer_sys::fuzz_target;
use stellaris_save::text::Document;

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };

    let doc = match Document::parse(text) {
        Ok(x) => x,
        Err(_) => return,
    };

    let once = doc.to_string();
    let reparsed = Document::parse(&once).unwrap();
    assert!(doc.same_content(&reparsed));
    assert_eq!(once, reparsed.to_string());

    #[cfg(feature = "json")]
    {
        let _ = doc.root().to_json(doc.tree());
    }
});
