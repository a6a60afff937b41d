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

//! Process Registry: the lifecycle authority for tracked processes.
//!
//! The table preserves insertion order for `list`. Each record sits behind its
//! own mutex; the table lock is always taken before a record lock, never the
//! other way round. Records are only removed by `clear`, nothing expires.
//!
//! A cleared record that is still running keeps receiving callbacks from its
//! supervisor, but those writes land in a detached record nobody can look up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::engine_core::errors::RunnerError;
use crate::engine_core::models::{
    OutputView, ProcessId, ProcessRecord, ProcessStatus, ProcessSummary,
};
use crate::exec::signal;

pub type SharedRecord = Arc<Mutex<ProcessRecord>>;

/// Every critical section on a record is a single field update, so a
/// poisoned lock still guards consistent data.
pub fn lock_record(record: &SharedRecord) -> MutexGuard<'_, ProcessRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Table {
    order: Vec<ProcessId>,
    records: HashMap<ProcessId, SharedRecord>,
}

#[derive(Clone, Default)]
pub struct ProcessRegistry {
    table: Arc<Mutex<Table>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a record and hand back the shared handle its supervisor writes to.
    pub fn insert(&self, record: ProcessRecord) -> SharedRecord {
        let id = record.id;
        let shared = Arc::new(Mutex::new(record));
        let mut table = self.table();
        table.order.push(id);
        table.records.insert(id, shared.clone());
        shared
    }

    pub fn shared(&self, id: &ProcessId) -> Result<SharedRecord, RunnerError> {
        self.table()
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| RunnerError::NotFound(id.to_string()))
    }

    /// Snapshot of the record as it is right now.
    pub fn get(&self, id: &ProcessId) -> Result<ProcessRecord, RunnerError> {
        let shared = self.shared(id)?;
        let record = lock_record(&shared).clone();
        Ok(record)
    }

    pub fn output(&self, id: &ProcessId, tail: usize) -> Result<OutputView, RunnerError> {
        let shared = self.shared(id)?;
        let record = lock_record(&shared);
        Ok(OutputView::project(&record, tail))
    }

    pub fn list(&self, filter: Option<ProcessStatus>) -> Vec<ProcessSummary> {
        let table = self.table();
        table
            .order
            .iter()
            .filter_map(|id| table.records.get(id))
            .map(|shared| lock_record(shared).summary())
            .filter(|summary| filter.map_or(true, |status| summary.status == status))
            .collect()
    }

    /// Send a graceful termination signal to a running process.
    ///
    /// The status only becomes `killed` once the signal was delivered; on a
    /// delivery failure the record is left exactly as it was.
    pub fn kill(&self, id: &ProcessId) -> Result<(), RunnerError> {
        let shared = self.shared(id)?;
        let mut record = lock_record(&shared);
        if !record.is_running() {
            return Err(RunnerError::NotRunning {
                id: id.to_string(),
                status: record.status,
            });
        }
        if record.reaped {
            return Err(RunnerError::AlreadyExited(id.to_string()));
        }
        let pid = record.pid.ok_or_else(|| RunnerError::SignalError {
            pid: 0,
            reason: "process has no pid yet".to_string(),
        })?;

        if let Err(e) = signal::terminate(pid) {
            warn!("kill {} (pid {}) failed: {}", id, pid, e);
            return Err(e);
        }
        record.finish_killed();
        info!("process {} (pid {}) killed", id, pid);
        Ok(())
    }

    /// Remove one record (any status) or, with no id, every terminal record.
    pub fn clear(&self, id: Option<&ProcessId>) -> Result<usize, RunnerError> {
        let mut table = self.table();
        match id {
            Some(id) => {
                if table.records.remove(id).is_none() {
                    return Err(RunnerError::NotFound(id.to_string()));
                }
                table.order.retain(|other| other != id);
                Ok(1)
            }
            None => {
                let before = table.records.len();
                table
                    .records
                    .retain(|_, shared| lock_record(shared).is_running());
                let Table { order, records } = &mut *table;
                order.retain(|other| records.contains_key(other));
                Ok(before - records.len())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
