#![no_main]

use libfuzzer_sys::fuzz_target;
use potluck_core::codec::decompress;
use potluck_core::model::validate;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(state) = decompress(&record) {
        let leftover: Vec<_> = validate(&state)
            .into_iter()
            .filter(|v| v.is_repairable())
            .collect();
        assert!(leftover.is_empty(), "repair left {leftover:?}");
    }
});
