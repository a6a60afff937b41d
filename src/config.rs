// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engine_core::constants::{config as keys, shell, timeouts};
use crate::engine_core::errors::RunnerError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub engine: EngineConfig,
}

/// The slice of configuration the execution engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interpreter that receives the raw command string
    pub shell: String,
    pub run_timeout_ms: u64,
    pub start_timeout_ms: u64,
    /// Per-stream capture cap; `None` is unbounded
    pub max_output_bytes: Option<usize>,
    /// Deliver SIGTERM to children when the runner itself dies (Linux)
    pub bind_to_parent: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, RunnerError> {
        let config = Self {
            log_level: env::var(keys::ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string()),
            log_format: env::var(keys::ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string()),
            engine: EngineConfig {
                shell: env::var(keys::ENV_SHELL)
                    .unwrap_or_else(|_| shell::DEFAULT_SHELL.to_string()),
                run_timeout_ms: parse_var(keys::ENV_RUN_TIMEOUT_MS)?
                    .unwrap_or(timeouts::DEFAULT_RUN_TIMEOUT_MS),
                start_timeout_ms: parse_var(keys::ENV_START_TIMEOUT_MS)?
                    .unwrap_or(timeouts::DEFAULT_START_TIMEOUT_MS),
                max_output_bytes: parse_var(keys::ENV_MAX_OUTPUT_BYTES)?,
                bind_to_parent: env::var(keys::ENV_BIND_TO_PARENT)
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        };
        config.engine.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Blocking calls always carry a timer, so their default cannot be 0.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.run_timeout_ms == 0 {
            return Err(RunnerError::ConfigurationError(format!(
                "{} must be greater than 0",
                keys::ENV_RUN_TIMEOUT_MS
            )));
        }
        if self.shell.trim().is_empty() {
            return Err(RunnerError::ConfigurationError(format!(
                "{} must not be empty",
                keys::ENV_SHELL
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shell: shell::DEFAULT_SHELL.to_string(),
            run_timeout_ms: timeouts::DEFAULT_RUN_TIMEOUT_MS,
            start_timeout_ms: timeouts::DEFAULT_START_TIMEOUT_MS,
            max_output_bytes: None,
            bind_to_parent: false,
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, RunnerError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, RunnerError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        RunnerError::ConfigurationError(format!("{} has invalid value '{}': {}", key, raw, e))
    })
}

fn parse_flag(raw: &str) -> bool {
    let v = raw.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes"
}
