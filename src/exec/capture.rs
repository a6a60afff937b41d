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

//! Stream capture: one background task per child output channel.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine_core::constants::capture::READ_CHUNK_BYTES;
use crate::engine_core::models::StreamKind;
use crate::exec::registry::{lock_record, SharedRecord};

/// Spawns a task that appends every chunk read from `stream` to `record`
/// as soon as it arrives. A read error finalizes the record as `error`.
pub fn spawn_stream_reader<R>(stream: R, kind: StreamKind, record: SharedRecord) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = stream;
        let mut buf = BytesMut::with_capacity(READ_CHUNK_BYTES);

        loop {
            buf.clear();
            buf.reserve(READ_CHUNK_BYTES);
            match stream.read_buf(&mut buf).await {
                Ok(0) => break, // Pipe closed
                Ok(n) => {
                    debug!("{}: {} bytes", kind, n);
                    lock_record(&record).append(kind, &buf);
                }
                Err(e) => {
                    warn!("{} read failed: {}", kind, e);
                    lock_record(&record).finish_error(format!("{} stream error: {}", kind, e));
                    break;
                }
            }
        }
    })
}
