#![no_main]

use libfuzzer_sys::fuzz_target;
use potluck_core::link::ShareLink;

fn url_safe(token: &str) -> bool {
    token
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(link) = ShareLink::parse(input) {
        let reparsed = ShareLink::parse(&link.to_string()).expect("rendered link parses");
        assert_eq!(reparsed.event_code, link.event_code);
        if link.token.as_deref().is_some_and(url_safe) {
            assert_eq!(reparsed.token, link.token);
        }
    }
});
