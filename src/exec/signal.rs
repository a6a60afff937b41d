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

//! Graceful termination.
//!
//! Only a cooperative stop request is sent. A child that ignores it keeps
//! running; delivery is what we guarantee, not destruction.

use tracing::debug;

use crate::engine_core::errors::RunnerError;

#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<(), RunnerError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| RunnerError::SignalError {
        pid,
        reason: "pid out of range".to_string(),
    })?;
    debug!("sending SIGTERM to {}", pid);
    signal::kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|e| RunnerError::SignalError {
        pid,
        reason: e.to_string(),
    })
}

#[cfg(windows)]
pub fn terminate(pid: u32) -> Result<(), RunnerError> {
    debug!("requesting termination of {}", pid);
    // Without /F taskkill posts a close request instead of forcing exit.
    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .output()
        .map_err(|e| RunnerError::SignalError {
            pid,
            reason: e.to_string(),
        })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(RunnerError::SignalError {
            pid,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
