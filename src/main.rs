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

// Main entry point for lilith-runner
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lilith_runner::config::Config;
use lilith_runner::protocol::calls::CommandRunner;
use lilith_runner::protocol::transport::{self, LineTransport};

const DEFAULT_LOG_FILTER: &str = "lilith_runner=debug,info";

#[derive(Parser, Debug)]
#[command(name = "lilith-runner", version, about, long_about = None)]
struct Cli {
    /// Shell that interprets commands (overrides LILITH_RUNNER_SHELL)
    #[arg(long, global = true)]
    shell: Option<String>,

    /// Per-stream capture cap in bytes (overrides LILITH_RUNNER_MAX_OUTPUT_BYTES)
    #[arg(long, global = true)]
    max_output_bytes: Option<usize>,

    /// Signal children when lilith-runner dies (Linux only)
    #[arg(long, global = true)]
    bind_to_parent: bool,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run one command, print its outcome as JSON and exit with 0 on success
    Run {
        /// Command line handed to the shell as-is
        command: String,

        /// Termination deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Read newline-delimited JSON calls from stdin, answer on stdout
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config from env, using defaults: {}",
            e
        );
        Config::default()
    });

    if let Some(shell) = cli.shell {
        config.engine.shell = shell;
    }
    if let Some(max) = cli.max_output_bytes {
        config.engine.max_output_bytes = Some(max);
    }
    if cli.bind_to_parent {
        config.engine.bind_to_parent = true;
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }
    install_panic_hook();

    let runner = CommandRunner::new(config.engine.clone());

    match cli.command {
        Mode::Run {
            command,
            timeout_ms,
        } => {
            let outcome = runner.run(&command, timeout_ms).await;
            let json = serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?;
            println!("{}", json);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Mode::Serve => {
            info!("lilith-runner v{} starting", env!("CARGO_PKG_VERSION"));
            tokio::select! {
                res = transport::serve(&runner, LineTransport::stdio()) => {
                    res.context("Transport failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down.");
                }
            }
        }
    }

    Ok(())
}

/// Routes panics through tracing so they land in the same stream as the
/// rest of the log, then defers to the default hook.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());

        error!(%location, "lilith-runner panicked: {}", message);
        default_hook(info);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // stdout carries results; logs always go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.log_format.as_str() {
        "json" => builder.json().flatten_event(true).try_init(),
        _ => builder.compact().try_init(),
    }
}
