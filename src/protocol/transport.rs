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

//! Newline-delimited JSON over standard I/O.
//!
//! One call object per input line, one result object per output line.
//! Calls that return at once (`start`, `output`, `list`, `kill`, `clear`)
//! are answered in input order. A blocking `run` is handed to its own task
//! and answered when it finishes, so it never holds up the calls behind it.
//!
//! A call may carry a `requestId` of any JSON type. Its reply then comes
//! back as `{"requestId": <id>, "result": <reply>}`; without one the reply
//! is the bare result.

use futures_util::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, Stdin, Stdout};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::engine_core::constants::limits;
use crate::engine_core::errors::RunnerError;
use crate::protocol::calls::{error_payload, Call, CommandRunner};

const REQUEST_ID: &str = "requestId";

pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    /// Bytes of a line whose read was interrupted; `read_line` resumes here.
    pending: Vec<u8>,
    writer: FramedWrite<W, LinesCodec>,
}

impl LineTransport<Stdin, Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Next input line; `None` at EOF. A bad line (too long, not UTF-8) is
    /// reported as `InvalidArgument` and reading continues with the next one.
    ///
    /// Cancel safe: a partially read line is kept and completed by the next
    /// call.
    pub async fn read_line(&mut self) -> Option<Result<String, RunnerError>> {
        match self.reader.read_until(b'\n', &mut self.pending).await {
            Ok(0) if self.pending.is_empty() => return None, // EOF
            Ok(_) => {}
            Err(e) => return Some(Err(RunnerError::IoError(e))),
        }
        let buf = std::mem::take(&mut self.pending);

        if buf.len() > limits::MAX_CALL_LINE_BYTES {
            return Some(Err(RunnerError::InvalidArgument(format!(
                "call exceeded size limit of {} bytes",
                limits::MAX_CALL_LINE_BYTES
            ))));
        }

        Some(String::from_utf8(buf).map_err(|_| {
            RunnerError::InvalidArgument("Invalid UTF-8 in call".to_string())
        }))
    }

    pub async fn write_value(&mut self, value: &Value) -> Result<(), RunnerError> {
        let json = serde_json::to_string(value).map_err(|e| RunnerError::IoError(e.into()))?;
        debug!("Sending: {}", json);
        self.writer.send(json).await.map_err(|e| match e {
            LinesCodecError::Io(io) => RunnerError::IoError(io),
            other => RunnerError::IoError(std::io::Error::other(other)),
        })
    }
}

/// Split a line into its optional `requestId` and the call itself.
fn parse_request(line: &str) -> (Option<Value>, Result<Call, RunnerError>) {
    let malformed = |e: serde_json::Error| RunnerError::InvalidArgument(format!("malformed call: {}", e));

    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (None, Err(malformed(e))),
    };
    let request_id = value.as_object_mut().and_then(|o| o.remove(REQUEST_ID));
    (request_id, serde_json::from_value(value).map_err(malformed))
}

fn tag(request_id: Option<Value>, result: Value) -> Value {
    match request_id {
        Some(id) => {
            let mut envelope = serde_json::Map::new();
            envelope.insert(REQUEST_ID.to_string(), id);
            envelope.insert("result".to_string(), result);
            Value::Object(envelope)
        }
        None => result,
    }
}

/// Serve calls until the input reaches EOF and every in-flight `run` has
/// been answered.
pub async fn serve<R, W>(
    runner: &CommandRunner,
    mut transport: LineTransport<R, W>,
) -> Result<(), RunnerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("serving calls on stdio");
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Value>();
    // Dropped at EOF; the channel then closes once the last run reports.
    let mut done_tx = Some(done_tx);

    loop {
        tokio::select! {
            line = transport.read_line(), if done_tx.is_some() => {
                let line = match line {
                    None => {
                        debug!("input closed");
                        done_tx = None;
                        continue;
                    }
                    Some(Ok(line)) if line.trim().is_empty() => continue,
                    Some(Ok(line)) => line,
                    Some(Err(RunnerError::IoError(e))) => return Err(RunnerError::IoError(e)),
                    Some(Err(e)) => {
                        warn!("rejected input: {}", e);
                        transport.write_value(&error_payload(&e)).await?;
                        continue;
                    }
                };
                debug!("Received: {}", line.trim());

                match parse_request(&line) {
                    (request_id, Ok(call @ Call::Run { .. })) => {
                        let runner = runner.clone();
                        let done = done_tx.clone();
                        tokio::spawn(async move {
                            let reply = tag(request_id, runner.dispatch(call).await);
                            if let Some(done) = done {
                                if done.send(reply).is_err() {
                                    debug!("run finished after the transport closed");
                                }
                            }
                        });
                    }
                    (request_id, Ok(call)) => {
                        let reply = tag(request_id, runner.dispatch(call).await);
                        transport.write_value(&reply).await?;
                    }
                    (request_id, Err(e)) => {
                        warn!("rejected call: {}", e);
                        transport.write_value(&tag(request_id, error_payload(&e))).await?;
                    }
                }
            }
            reply = done_rx.recv() => match reply {
                Some(reply) => transport.write_value(&reply).await?,
                None => break,
            },
        }
    }

    info!("input closed, {} tracked process(es) left", runner.registry().len());
    Ok(())
}
