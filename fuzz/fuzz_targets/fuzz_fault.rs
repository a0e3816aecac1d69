#![no_main]

use libfuzzer_sys::fuzz_target;
use rpc_error_codes::{ForeignError, RpcFault, MAX_SANITIZED_LEN};

fuzz_target!(|data: &[u8]| {
    let message = String::from_utf8_lossy(data).into_owned();
    let err = ForeignError::from_qualified("psycopg.errors.DataError", message.clone());
    let fault = RpcFault::from_error(&err).with_metadata("request", message);

    assert!(fault.message().len() <= MAX_SANITIZED_LEN);
    assert!(!fault.message().chars().any(char::is_control));

    let mut line = String::new();
    let _ = fault.internal_log().write_to(&mut line);
});
