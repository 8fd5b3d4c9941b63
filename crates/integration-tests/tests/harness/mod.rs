//! Shared test harness
//!
//! Mock backend servers speaking each provider's wire protocol, plus small
//! helpers for building configurations pointed at them.
#![allow(dead_code)]

pub mod mock;

use prism_config::ProviderConfig;
use url::Url;

/// Build a configuration pointed at a mock backend
pub fn mock_config(provider: &str, base_url: &str) -> ProviderConfig {
    ProviderConfig::new(provider, "mock-model")
        .with_api_key("test-key")
        .with_base_url(Url::parse(base_url).expect("mock base url"))
}
