#![no_main]
use libfuzzer_sys::fuzz_target;
use stellaris_save::save::SwapOptions;
use stellaris_save::StellarisSave;

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };

    let mut save = match StellarisSave::from_strs("", text) {
        Ok(x) => x,
        Err(_) => return,
    };

    let ids: Vec<_> = save.systems().map(|x| x.id()).take(2).collect();
    if let [a, b] = ids[..] {
        let _ = save.swap_systems(a, b, SwapOptions::default());
    }
    let _ = save.to_strings();
});
