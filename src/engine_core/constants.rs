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

//! lilith-runner Constants - Single source of truth for all configuration values.
//!
//! This module centralizes timeouts, buffer sizes, status strings and
//! environment variable names so the engine and its adapters agree on them.

/// Execution timeouts (milliseconds)
pub mod timeouts {
    /// Default timer for blocking `run` calls
    pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 30_000;
    /// Default timer for tracked `start` calls (0 = unbounded)
    pub const DEFAULT_START_TIMEOUT_MS: u64 = 0;
    /// How long finalization waits for stdout/stderr to reach EOF after exit.
    /// Pipes inherited by background grandchildren can stay open forever.
    pub const STREAM_DRAIN_GRACE_MS: u64 = 500;
}

/// Stream capture
pub mod capture {
    /// Read buffer reserved per chunk
    pub const READ_CHUNK_BYTES: usize = 8 * 1024;
}

/// Wire strings for `ProcessStatus`
pub mod status {
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const KILLED: &str = "killed";
    pub const ERROR: &str = "error";
    pub const TIMED_OUT: &str = "timed_out";

    pub const ALL: [&str; 6] = [RUNNING, COMPLETED, FAILED, KILLED, ERROR, TIMED_OUT];
}

/// Shell interpreters
pub mod shell {
    #[cfg(unix)]
    pub const DEFAULT_SHELL: &str = "sh";
    #[cfg(unix)]
    pub const COMMAND_FLAG: &str = "-c";

    #[cfg(windows)]
    pub const DEFAULT_SHELL: &str = "cmd";
    #[cfg(windows)]
    pub const COMMAND_FLAG: &str = "/C";
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
    pub const ENV_SHELL: &str = "LILITH_RUNNER_SHELL";
    pub const ENV_RUN_TIMEOUT_MS: &str = "LILITH_RUNNER_RUN_TIMEOUT_MS";
    pub const ENV_START_TIMEOUT_MS: &str = "LILITH_RUNNER_START_TIMEOUT_MS";
    pub const ENV_MAX_OUTPUT_BYTES: &str = "LILITH_RUNNER_MAX_OUTPUT_BYTES";
    pub const ENV_BIND_TO_PARENT: &str = "LILITH_RUNNER_BIND_TO_PARENT";
}

/// Transport Limits
pub mod limits {
    /// Maximum accepted length of one call line (1 MB)
    pub const MAX_CALL_LINE_BYTES: usize = 1024 * 1024;
}
