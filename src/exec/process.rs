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

//! Child process creation.
//!
//! Commands are handed to a shell as one raw string, so pipes, redirects and
//! globbing in the command line behave as the caller wrote them.

use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine_core::constants::shell;
use crate::engine_core::errors::RunnerError;

pub struct SpawnedChild {
    pub child: Child,
    pub pid: Option<u32>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

pub fn spawn_shell(command_line: &str, config: &EngineConfig) -> Result<SpawnedChild, RunnerError> {
    debug!("spawning via '{}': {}", config.shell, command_line);

    let mut command = Command::new(&config.shell);

    #[cfg(not(windows))]
    command.arg(shell::COMMAND_FLAG).arg(command_line);

    // cmd.exe does its own parsing; quoting the string again would change it.
    #[cfg(windows)]
    command.arg(shell::COMMAND_FLAG).raw_arg(command_line);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    // ------------------------------------------------------------------
    // LINUX: PR_SET_PDEATHSIG
    // ------------------------------------------------------------------
    #[cfg(target_os = "linux")]
    if config.bind_to_parent {
        // SAFETY: prctl is async-signal-safe and only touches the calling
        // (freshly forked) process. PR_SET_PDEATHSIG with SIGTERM asks the
        // kernel to signal the child when lilith-runner dies.
        unsafe {
            command.pre_exec(|| {
                let ret = libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                if ret != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = command.spawn().map_err(|e| {
        RunnerError::LaunchError(format!("Failed to spawn '{}': {}", config.shell, e))
    })?;

    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    debug!("spawned pid {:?}", pid);

    Ok(SpawnedChild {
        child,
        pid,
        stdout,
        stderr,
    })
}
