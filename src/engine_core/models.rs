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

//! Domain models for the lilith-runner engine.
//!
//! `ProcessRecord` is the tracked state of one launched command. Every state
//! change goes through its lifecycle methods, which only act while the record
//! is `running`; once a terminal status is claimed, later exit, error and
//! timeout callbacks are silent no-ops.
//!
//! The remaining types are the JSON result payloads handed back to callers.
//! Their field names are part of the observable contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::engine_core::constants::status;
use crate::engine_core::errors::RunnerError;
use crate::utils::{text, time};

/// Newtype wrapper around Uuid for type-safe process identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Generate a new random ProcessId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for ProcessId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ProcessId)
    }
}

impl From<ProcessId> for String {
    fn from(id: ProcessId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for ProcessId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Uuid::parse_str(&s).map(ProcessId)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status. Everything except `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
    Killed,
    Error,
    TimedOut,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => status::RUNNING,
            ProcessStatus::Completed => status::COMPLETED,
            ProcessStatus::Failed => status::FAILED,
            ProcessStatus::Killed => status::KILLED,
            ProcessStatus::Error => status::ERROR,
            ProcessStatus::TimedOut => status::TIMED_OUT,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            status::RUNNING => Ok(ProcessStatus::Running),
            status::COMPLETED => Ok(ProcessStatus::Completed),
            status::FAILED => Ok(ProcessStatus::Failed),
            status::KILLED => Ok(ProcessStatus::Killed),
            status::ERROR => Ok(ProcessStatus::Error),
            status::TIMED_OUT => Ok(ProcessStatus::TimedOut),
            other => Err(RunnerError::InvalidArgument(format!(
                "unknown status '{}', expected one of {}",
                other,
                status::ALL.join("|")
            ))),
        }
    }
}

/// Which child output channel a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Tracked state of one launched command.
///
/// Output is stored as raw bytes and only decoded at projection time, so a
/// chunk boundary inside a multi-byte character is harmless.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub id: ProcessId,
    pub command: String,
    pub status: ProcessStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub timed_out: bool,
    /// The child was waited on but output is still draining. Its pid may
    /// already belong to an unrelated process.
    pub reaped: bool,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Per-stream byte cap; `None` keeps everything
    pub output_limit: Option<usize>,
}

impl ProcessRecord {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: ProcessId::generate(),
            command: command.into(),
            status: ProcessStatus::Running,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            error_message: None,
            pid: None,
            started_at: time::now(),
            finished_at: None,
            timed_out: false,
            reaped: false,
            stdout_truncated: false,
            stderr_truncated: false,
            output_limit: None,
        }
    }

    pub fn with_output_limit(mut self, limit: Option<usize>) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }

    /// Append a chunk to one of the output buffers. Ignored once terminal.
    pub fn append(&mut self, stream: StreamKind, chunk: &[u8]) {
        if !self.is_running() {
            return;
        }
        let (buf, truncated) = match stream {
            StreamKind::Stdout => (&mut self.stdout, &mut self.stdout_truncated),
            StreamKind::Stderr => (&mut self.stderr, &mut self.stderr_truncated),
        };
        match self.output_limit {
            Some(limit) => {
                let room = limit.saturating_sub(buf.len());
                if chunk.len() > room {
                    buf.extend_from_slice(&chunk[..room]);
                    *truncated = true;
                } else {
                    buf.extend_from_slice(chunk);
                }
            }
            None => buf.extend_from_slice(chunk),
        }
    }

    /// Flag a timeout-induced termination. The status stays `running` until
    /// the child actually exits.
    pub fn mark_timed_out(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.timed_out = true;
        true
    }

    pub fn mark_reaped(&mut self) {
        self.reaped = true;
    }

    /// Natural exit. `code` is `None` when the child died from a signal.
    pub fn finish_exit(&mut self, code: Option<i32>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.exit_code = code;
        let next = if self.timed_out {
            ProcessStatus::TimedOut
        } else if code == Some(0) {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Failed
        };
        self.claim(next);
        true
    }

    /// Launch or stream failure.
    pub fn finish_error(&mut self, message: impl Into<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.error_message = Some(message.into());
        self.claim(ProcessStatus::Error);
        true
    }

    /// User-initiated kill after the signal was delivered.
    pub fn finish_killed(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.claim(ProcessStatus::Killed);
        true
    }

    fn claim(&mut self, next: ProcessStatus) {
        self.status = next;
        self.finished_at = Some(time::now());
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            id: self.id,
            pid: self.pid,
            command: self.command.clone(),
            status: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Result of a blocking `run` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stdout_truncated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stderr_truncated: bool,
}

impl RunOutcome {
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            success: record.status == ProcessStatus::Completed,
            exit_code: record.exit_code,
            stdout: text::project(&record.stdout, 0),
            stderr: text::project(&record.stderr, 0),
            timed_out: record.timed_out,
            error: record.error_message.clone(),
            stdout_truncated: record.stdout_truncated,
            stderr_truncated: record.stderr_truncated,
        }
    }
}

/// Result of a non-blocking `start` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    pub process_id: ProcessId,
    pub pid: Option<u32>,
}

/// Read-time projection of a `ProcessRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputView {
    pub id: ProcessId,
    pub command: String,
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stdout_truncated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stderr_truncated: bool,
}

impl OutputView {
    /// `tail > 0` keeps only the last `tail` lines of each stream.
    pub fn project(record: &ProcessRecord, tail: usize) -> Self {
        Self {
            id: record.id,
            command: record.command.clone(),
            status: record.status,
            stdout: text::project(&record.stdout, tail),
            stderr: text::project(&record.stderr, tail),
            exit_code: record.exit_code,
            error_message: record.error_message.clone(),
            pid: record.pid,
            started_at: record.started_at,
            finished_at: record.finished_at,
            timed_out: record.timed_out,
            stdout_truncated: record.stdout_truncated,
            stderr_truncated: record.stderr_truncated,
        }
    }
}

/// One row of a `list` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub id: ProcessId,
    pub pid: Option<u32>,
    pub command: String,
    pub status: ProcessStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Acknowledgement for `kill`/`clear`, and the shape of every error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            process_id: None,
            message: Some(message.into()),
            cleared: None,
            error: None,
            code: None,
        }
    }

    pub fn failure(err: &RunnerError) -> Self {
        Self {
            success: false,
            process_id: None,
            message: None,
            cleared: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }

    pub fn with_process_id(mut self, id: ProcessId) -> Self {
        self.process_id = Some(id);
        self
    }

    pub fn with_cleared(mut self, count: usize) -> Self {
        self.cleared = Some(count);
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}
