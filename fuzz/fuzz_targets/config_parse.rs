#![no_main]

use davpub::config::Config;
use davpub_retry::RetryExecutor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = toml::from_str::<Config>(text) {
        assert!(RetryExecutor::new(config.retry).max_attempts() >= 1);
    }
});
