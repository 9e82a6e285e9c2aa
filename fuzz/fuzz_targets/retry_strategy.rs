#![no_main]

use std::time::Duration;

use davpub_retry::{RetryStrategyConfig, RetryStrategyType, calculate_delay};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (u32, u8, u64, u64, u8)| {
    let (attempt, strategy_type, base_ms, max_ms, jitter_byte) = data;

    let attempt = attempt % 100 + 1;
    let strategy = match strategy_type % 4 {
        0 => RetryStrategyType::Immediate,
        1 => RetryStrategyType::Exponential,
        2 => RetryStrategyType::Linear,
        _ => RetryStrategyType::Constant,
    };
    let base_delay = Duration::from_millis(base_ms % 10_000 + 1);
    let max_delay = Duration::from_millis(max_ms % 300_000 + 100);
    let jitter = f64::from(jitter_byte) / 255.0;

    let config = RetryStrategyConfig {
        strategy,
        max_attempts: 100,
        base_delay,
        max_delay,
        jitter,
    };

    let delay = calculate_delay(&config, attempt);

    if strategy == RetryStrategyType::Immediate {
        assert_eq!(delay, Duration::ZERO);
    } else {
        // Jitter may stretch a capped delay by at most the jitter factor.
        let bound = max_delay.as_millis() as f64 * (1.0 + jitter) + 1.0;
        assert!((delay.as_millis() as f64) <= bound);
    }

    if strategy == RetryStrategyType::Constant && jitter_byte == 0 {
        assert_eq!(delay, base_delay.min(max_delay));
    }
});
