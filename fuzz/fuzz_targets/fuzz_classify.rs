#![no_main]

use libfuzzer_sys::fuzz_target;
use rpc_error_codes::{classify, ErrorIdentity, Origin};

fuzz_target!(|data: &[u8]| {
    if let Ok(path) = std::str::from_utf8(data) {
        let code = classify(&ErrorIdentity::from_qualified(path));
        assert!(Origin::from_code(code).is_some());

        if let Some((module, name)) = path.split_once('\0') {
            let code = classify(&ErrorIdentity::new(module, name));
            assert!(Origin::from_code(code).is_some());
        }
    }
});
