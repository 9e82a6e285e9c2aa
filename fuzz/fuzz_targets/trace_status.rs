#![no_main]

use davpub_dav::status::final_status;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let trace = String::from_utf8_lossy(data);
    let response = final_status(&trace);

    assert_eq!(response.status.len(), 3);
    assert!(response.status.bytes().all(|b| b.is_ascii_digit()));
    // An interim response is never reported as final.
    assert_ne!(response.status, "100");
    assert_eq!(response.is_server_error(), response.status.starts_with('5'));
});
