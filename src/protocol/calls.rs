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

//! The six logical calls and their dispatch onto the engine.
//!
//! Every call produces a well-formed JSON value. Engine-level failures
//! (unknown id, process not running, signal not delivered) become
//! `{"success": false, "error": ..., "code": ...}`; only structurally broken
//! input is rejected here, as `invalid_argument`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine_core::errors::RunnerError;
use crate::engine_core::models::{
    Ack, OutputView, ProcessId, ProcessStatus, ProcessSummary, RunOutcome, StartAck,
};
use crate::exec::engine::ExecutionEngine;
use crate::exec::registry::ProcessRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Call {
    /// Blocking execution; `timeoutMs` defaults to the configured run timeout
    Run {
        command: String,
        timeout_ms: Option<u64>,
    },
    /// Tracked execution; `timeoutMs` defaults to the configured start timeout
    Start {
        command: String,
        timeout_ms: Option<u64>,
    },
    Output {
        process_id: String,
        #[serde(default)]
        tail: usize,
    },
    List {
        status: Option<String>,
    },
    Kill {
        process_id: String,
    },
    Clear {
        process_id: Option<String>,
    },
}

/// Owns one engine and one registry.
#[derive(Clone, Default)]
pub struct CommandRunner {
    engine: ExecutionEngine,
    registry: ProcessRegistry,
}

impl CommandRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(ExecutionEngine::new(config), ProcessRegistry::new())
    }

    pub fn with_parts(engine: ExecutionEngine, registry: ProcessRegistry) -> Self {
        Self { engine, registry }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub async fn run(&self, command: &str, timeout_ms: Option<u64>) -> RunOutcome {
        let timeout_ms = timeout_ms.unwrap_or(self.engine.config().run_timeout_ms);
        self.engine.run_blocking(command, timeout_ms).await
    }

    pub fn start(&self, command: &str, timeout_ms: Option<u64>) -> StartAck {
        let timeout_ms = timeout_ms.unwrap_or(self.engine.config().start_timeout_ms);
        self.engine.start_async(&self.registry, command, timeout_ms)
    }

    pub fn output(&self, process_id: &str, tail: usize) -> Result<OutputView, RunnerError> {
        let id = parse_id(process_id)?;
        self.registry.output(&id, tail)
    }

    pub fn list(&self, status: Option<&str>) -> Result<Vec<ProcessSummary>, RunnerError> {
        let filter = status.map(str::parse::<ProcessStatus>).transpose()?;
        Ok(self.registry.list(filter))
    }

    pub fn kill(&self, process_id: &str) -> Result<Ack, RunnerError> {
        let id = parse_id(process_id)?;
        self.registry.kill(&id)?;
        Ok(Ack::ok(format!("Sent termination signal to process {}", id)).with_process_id(id))
    }

    pub fn clear(&self, process_id: Option<&str>) -> Result<Ack, RunnerError> {
        match process_id {
            Some(raw) => {
                let id = parse_id(raw)?;
                let cleared = self.registry.clear(Some(&id))?;
                Ok(Ack::ok(format!("Cleared process {}", id))
                    .with_process_id(id)
                    .with_cleared(cleared))
            }
            None => {
                let cleared = self.registry.clear(None)?;
                Ok(Ack::ok(format!("Cleared {} finished process(es)", cleared))
                    .with_cleared(cleared))
            }
        }
    }

    pub async fn dispatch(&self, call: Call) -> Value {
        debug!("dispatch {:?}", call);
        match call {
            Call::Run {
                command,
                timeout_ms,
            } => payload(Ok(self.run(&command, timeout_ms).await)),
            Call::Start {
                command,
                timeout_ms,
            } => payload(Ok(self.start(&command, timeout_ms))),
            Call::Output { process_id, tail } => payload(self.output(&process_id, tail)),
            Call::List { status } => payload(self.list(status.as_deref())),
            Call::Kill { process_id } => payload(self.kill(&process_id)),
            Call::Clear { process_id } => payload(self.clear(process_id.as_deref())),
        }
    }

    /// Parse one JSON call and dispatch it.
    pub async fn dispatch_json(&self, raw: &str) -> Value {
        match serde_json::from_str::<Call>(raw) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => error_payload(&RunnerError::InvalidArgument(format!(
                "malformed call: {}",
                e
            ))),
        }
    }
}

/// A missing identifier is a structural problem; a present but unknown one
/// (including one that is not a valid id at all) is simply not found.
fn parse_id(raw: &str) -> Result<ProcessId, RunnerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RunnerError::InvalidArgument(
            "processId is required".to_string(),
        ));
    }
    raw.parse()
        .map_err(|_| RunnerError::NotFound(raw.to_string()))
}

fn payload<T: Serialize>(result: Result<T, RunnerError>) -> Value {
    match result {
        Ok(value) => serde_json::to_value(value).unwrap_or_else(|e| {
            error_payload(&RunnerError::IoError(std::io::Error::other(e)))
        }),
        Err(e) => error_payload(&e),
    }
}

pub fn error_payload(err: &RunnerError) -> Value {
    serde_json::to_value(Ack::failure(err)).unwrap_or_else(|_| {
        serde_json::json!({ "success": false, "error": err.to_string(), "code": err.code() })
    })
}
