//! Interceptor configuration
//!
//! Settings are read from an optional JSON file and then overridden by
//! `INTERCEPTOR_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::breakpoints::{REQUEST_BREAKPOINT_SET, RESPONSE_BREAKPOINT_SET};
use crate::error::InterceptError;
use crate::Result;
use intercept_common::Direction;

pub const ENV_REQUEST_LEVEL_KEY: &str = "INTERCEPTOR_REQUEST_LEVEL_KEY";
pub const ENV_RESPONSE_LEVEL_KEY: &str = "INTERCEPTOR_RESPONSE_LEVEL_KEY";
pub const ENV_REQUEST_BREAKPOINT_SET: &str = "INTERCEPTOR_REQUEST_BREAKPOINT_SET";
pub const ENV_RESPONSE_BREAKPOINT_SET: &str = "INTERCEPTOR_RESPONSE_BREAKPOINT_SET";
pub const ENV_RELOAD_ON_OPEN: &str = "INTERCEPTOR_RELOAD_LEVELS_ON_OPEN";
pub const ENV_RESET_ON_CLOSE: &str = "INTERCEPTOR_RESET_LEVELS_ON_CLOSE";

/// Static interceptor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Workspace property holding the request level
    pub request_level_key: String,
    /// Workspace property holding the response level
    pub response_level_key: String,
    /// Condition set consulted for request breakpoints
    pub request_breakpoint_set: String,
    /// Condition set consulted for response breakpoints
    pub response_breakpoint_set: String,
    /// Reload persisted levels when a workspace is opened, not only on reset
    pub reload_levels_on_open: bool,
    /// Fall back to `Disabled` for both directions when the workspace closes
    pub reset_levels_on_close: bool,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            request_level_key: "proxy.interceptor.level.request".to_string(),
            response_level_key: "proxy.interceptor.level.response".to_string(),
            request_breakpoint_set: REQUEST_BREAKPOINT_SET.to_string(),
            response_breakpoint_set: RESPONSE_BREAKPOINT_SET.to_string(),
            reload_levels_on_open: true,
            reset_levels_on_close: true,
        }
    }
}

impl InterceptorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: InterceptorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded interceptor config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults, then file (if given), then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ENV_REQUEST_LEVEL_KEY) {
            self.request_level_key = v;
        }
        if let Ok(v) = std::env::var(ENV_RESPONSE_LEVEL_KEY) {
            self.response_level_key = v;
        }
        if let Ok(v) = std::env::var(ENV_REQUEST_BREAKPOINT_SET) {
            self.request_breakpoint_set = v;
        }
        if let Ok(v) = std::env::var(ENV_RESPONSE_BREAKPOINT_SET) {
            self.response_breakpoint_set = v;
        }
        if let Ok(v) = std::env::var(ENV_RELOAD_ON_OPEN) {
            self.reload_levels_on_open = parse_bool(ENV_RELOAD_ON_OPEN, &v)?;
        }
        if let Ok(v) = std::env::var(ENV_RESET_ON_CLOSE) {
            self.reset_levels_on_close = parse_bool(ENV_RESET_ON_CLOSE, &v)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_level_key.trim().is_empty() || self.response_level_key.trim().is_empty() {
            return Err(InterceptError::config("interceptor", "level property keys must not be empty"));
        }
        if self.request_level_key == self.response_level_key {
            return Err(InterceptError::config(
                "interceptor",
                format!("request and response share level key '{}'", self.request_level_key),
            ));
        }
        Ok(())
    }

    pub fn level_key(&self, direction: Direction) -> &str {
        match direction {
            Direction::Request => &self.request_level_key,
            Direction::Response => &self.response_level_key,
        }
    }

    pub fn breakpoint_set(&self, direction: Direction) -> &str {
        match direction {
            Direction::Request => &self.request_breakpoint_set,
            Direction::Response => &self.response_breakpoint_set,
        }
    }

    /// Direction whose breakpoints are tracked under `set_name`, if any
    pub fn direction_for_set(&self, set_name: &str) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| self.breakpoint_set(*d) == set_name)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(InterceptError::config(var, format!("expected a boolean, got '{}'", other))),
    }
}
