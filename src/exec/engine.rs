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

//! Execution Engine.
//!
//! Both execution modes share one supervisor: spawn through the shell, attach
//! a reader task per output stream, race `child.wait()` against an optional
//! deadline, then finalize the record. Blocking calls drive a private record
//! and return its outcome; tracked calls drive a record owned by a
//! [`ProcessRegistry`] and return right after the spawn.
//!
//! Both `run_blocking` and `start_async` must be called from within a tokio
//! runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine_core::constants::timeouts::{DEFAULT_RUN_TIMEOUT_MS, STREAM_DRAIN_GRACE_MS};
use crate::engine_core::errors::RunnerError;
use crate::engine_core::models::{ProcessRecord, RunOutcome, StartAck, StreamKind};
use crate::exec::capture;
use crate::exec::process::{self, SpawnedChild};
use crate::exec::registry::{lock_record, ProcessRegistry, SharedRecord};
use crate::exec::signal;

#[derive(Clone)]
pub struct ExecutionEngine {
    config: Arc<EngineConfig>,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `command` and wait for it to finish.
    ///
    /// A blocking call always carries a timer; `timeout_ms == 0` falls back to
    /// the configured default. Never returns an error: launch failures come
    /// back as `success: false` with `error` set.
    pub async fn run_blocking(&self, command: &str, timeout_ms: u64) -> RunOutcome {
        let timeout_ms = match (timeout_ms, self.config.run_timeout_ms) {
            (0, 0) => DEFAULT_RUN_TIMEOUT_MS,
            (0, configured) => configured,
            (requested, _) => requested,
        };
        let record: SharedRecord = Arc::new(Mutex::new(self.new_record(command)));

        match self.launch(command, &record) {
            Ok(spawned) => {
                supervise(spawned, record.clone(), Some(Duration::from_millis(timeout_ms))).await
            }
            Err(e) => {
                warn!("run '{}' failed to launch: {}", command, e);
                lock_record(&record).finish_error(e.to_string());
            }
        }

        let outcome = RunOutcome::from_record(&lock_record(&record));
        outcome
    }

    /// Register and spawn `command`, returning as soon as the child exists.
    ///
    /// The record is visible in `registry` before the spawn is attempted. With
    /// `timeout_ms == 0` the child runs until it exits or is killed.
    pub fn start_async(&self, registry: &ProcessRegistry, command: &str, timeout_ms: u64) -> StartAck {
        let shared = registry.insert(self.new_record(command));
        let process_id = lock_record(&shared).id;

        match self.launch(command, &shared) {
            Ok(spawned) => {
                let pid = spawned.pid;
                let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
                info!("started {} (pid {:?}): {}", process_id, pid, command);
                tokio::spawn(supervise(spawned, shared, timeout));
                StartAck { process_id, pid }
            }
            Err(e) => {
                warn!("start {} failed to launch: {}", process_id, e);
                lock_record(&shared).finish_error(e.to_string());
                StartAck {
                    process_id,
                    pid: None,
                }
            }
        }
    }

    fn new_record(&self, command: &str) -> ProcessRecord {
        ProcessRecord::new(command).with_output_limit(self.config.max_output_bytes)
    }

    fn launch(&self, command: &str, record: &SharedRecord) -> Result<SpawnedChild, RunnerError> {
        let spawned = process::spawn_shell(command, &self.config)?;
        lock_record(record).pid = spawned.pid;
        Ok(spawned)
    }
}

/// Drive one child to a terminal state.
async fn supervise(spawned: SpawnedChild, record: SharedRecord, timeout: Option<Duration>) {
    let SpawnedChild {
        mut child,
        pid,
        stdout,
        stderr,
    } = spawned;

    let mut readers = Vec::with_capacity(2);
    if let Some(out) = stdout {
        readers.push(capture::spawn_stream_reader(out, StreamKind::Stdout, record.clone()));
    }
    if let Some(err) = stderr {
        readers.push(capture::spawn_stream_reader(err, StreamKind::Stderr, record.clone()));
    }

    // An unarmed deadline is never polled.
    let deadline = tokio::time::sleep(timeout.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);
    let mut armed = timeout.is_some();

    let exit = loop {
        tokio::select! {
            status = child.wait() => break status,
            () = &mut deadline, if armed => {
                armed = false;
                on_deadline(&record, pid);
            }
        }
    };

    if exit.is_ok() {
        lock_record(&record).mark_reaped();
    }

    // Output written just before exit is still in the pipes.
    let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    let grace = Duration::from_millis(STREAM_DRAIN_GRACE_MS);
    if tokio::time::timeout(grace, futures::future::join_all(readers))
        .await
        .is_err()
    {
        warn!("pid {:?}: output pipes still open after exit, detaching readers", pid);
        for abort in aborts {
            abort.abort();
        }
    }

    let mut rec = lock_record(&record);
    match exit {
        Ok(status) => {
            if rec.finish_exit(status.code()) {
                info!(
                    "process {} (pid {:?}) finished: {} ({:?})",
                    rec.id, pid, rec.status, status
                );
            } else {
                debug!("process {} exit ignored, already {}", rec.id, rec.status);
            }
        }
        Err(e) => {
            rec.finish_error(format!("Failed to wait for child: {}", e));
        }
    }
}

fn on_deadline(record: &SharedRecord, pid: Option<u32>) {
    let mut rec = lock_record(record);
    if !rec.is_running() {
        return;
    }
    if let Some(pid) = pid {
        if let Err(e) = signal::terminate(pid) {
            warn!("timeout signal for {} not delivered: {}", rec.id, e);
        }
    }
    rec.mark_timed_out();
    info!("process {} (pid {:?}) timed out", rec.id, pid);
}
