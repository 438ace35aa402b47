//! Shared fakes for the integration tests.
#![allow(dead_code)]

pub mod console;
pub mod fake_fs;
pub mod mock_notifier;

use escalog::config::Config;
use std::time::{Duration, Instant};

/// A configuration with every channel disabled and a short timeout.
pub fn test_config() -> Config {
    Config {
        module_tag: "SVC".to_string(),
        dispatch_timeout_ms: 2000,
        ..Default::default()
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
