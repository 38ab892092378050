//! Reducer configuration
//!
//! Defaults suit a coordinating node that trusts nothing about its shards.
//! Every field can be overridden from the environment ([`ReduceConfig::from_env`])
//! and then from a JSON5 file ([`ConfigOverrides::parse_json5`]).

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{ReduceError, ReduceResult};

/// Reject partials whose `from`/`size` differ from the first partial.
pub const STRICT_WINDOW_ENV: &str = "TOPHITS_STRICT_WINDOW";
/// Verify that each partial arrives already ranked.
pub const VALIDATE_SHARD_ORDER_ENV: &str = "TOPHITS_VALIDATE_SHARD_ORDER";
/// Upper bound on partials per reduction (`0` = unbounded).
pub const MAX_PARTIALS_ENV: &str = "TOPHITS_MAX_PARTIALS";

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

/// Configuration for [`TopHitsReducer`](crate::reduce::TopHitsReducer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Mismatched windows are an error (`true`) or resolved to the first
    /// partial's window with a warning (`false`).
    pub strict_window: bool,
    /// Fail with `UnorderedPartial` when a shard's hits are not ranked.
    pub validate_shard_order: bool,
    /// Maximum partials per reduction; `0` disables the limit.
    pub max_partials: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            strict_window: true,
            validate_shard_order: false,
            max_partials: 0,
        }
    }
}

impl ReduceConfig {
    /// Load config from environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strict_window: env_bool(STRICT_WINDOW_ENV, defaults.strict_window),
            validate_shard_order: env_bool(
                VALIDATE_SHARD_ORDER_ENV,
                defaults.validate_shard_order,
            ),
            max_partials: env_usize(MAX_PARTIALS_ENV, defaults.max_partials),
        }
    }

    /// Apply the fields set in `overrides`.
    #[must_use]
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            strict_window: overrides.strict_window.unwrap_or(self.strict_window),
            validate_shard_order: overrides
                .validate_shard_order
                .unwrap_or(self.validate_shard_order),
            max_partials: overrides.max_partials.unwrap_or(self.max_partials),
        }
    }

    /// Whether `count` partials exceed the configured limit.
    #[must_use]
    pub const fn exceeds_partial_limit(&self, count: usize) -> bool {
        self.max_partials > 0 && count > self.max_partials
    }
}

/// Partial config read from a file; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub strict_window: Option<bool>,
    pub validate_shard_order: Option<bool>,
    pub max_partials: Option<usize>,
}

impl ConfigOverrides {
    /// Parse overrides from JSON5 text.
    ///
    /// # Errors
    /// Returns [`ReduceError::Config`] on malformed input or unknown keys.
    pub fn parse_json5(text: &str) -> ReduceResult<Self> {
        json5::from_str(text).map_err(|e| ReduceError::Config(e.to_string()))
    }
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key).ok()
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env_value(key).map_or(default, |v| parse_bool(&v, default))
}

fn env_usize(key: &str, default: usize) -> usize {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
