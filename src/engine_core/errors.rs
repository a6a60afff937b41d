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

// Domain error types

use thiserror::Error;

use crate::engine_core::models::ProcessStatus;

/// Main error type for the runner
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Referenced process identifier is unknown to the registry
    #[error("Process not found: {0}")]
    NotFound(String),

    /// Operation requires a running process
    #[error("Process {id} is not running (status: {status})")]
    NotRunning { id: String, status: ProcessStatus },

    /// The child exited and is being finalized
    #[error("Process {0} has already exited")]
    AlreadyExited(String),

    /// The shell or child process could not be created
    #[error("Launch error: {0}")]
    LaunchError(String),

    /// A termination signal could not be delivered
    #[error("Failed to signal pid {pid}: {reason}")]
    SignalError { pid: u32, reason: String },

    /// Structurally invalid input rejected before reaching the engine
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// I/O Error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RunnerError {
    /// Stable machine-readable tag carried in error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            RunnerError::NotFound(_) => "not_found",
            RunnerError::NotRunning { .. } | RunnerError::AlreadyExited(_) => "not_running",
            RunnerError::LaunchError(_) => "launch_error",
            RunnerError::SignalError { .. } => "signal_error",
            RunnerError::InvalidArgument(_) => "invalid_argument",
            RunnerError::ConfigurationError(_) => "configuration_error",
            RunnerError::IoError(_) => "io_error",
        }
    }
}
