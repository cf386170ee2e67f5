#![no_main]

use libfuzzer_sys::fuzz_target;
use potluck_core::codec::{decode_state, encode_state};

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(state) = decode_state(token) {
        // Anything that decodes must survive being shared again.
        decode_state(&encode_state(&state)).expect("re-encoded token decodes");
    }
});
