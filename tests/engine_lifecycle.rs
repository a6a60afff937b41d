//! Integration tests for the Execution Engine and Process Registry
//! Covers:
//! - Blocking runs: success, failure, timeout, launch errors, partial output
//! - Tracked runs: visibility before completion, polling, timeouts
//! - Kill semantics and idempotent finalization
//! - Output caps and pipes held open by background jobs
#![cfg(unix)]

use lilith_runner::config::EngineConfig;
use lilith_runner::engine_core::models::{ProcessId, ProcessStatus};
use lilith_runner::exec::engine::ExecutionEngine;
use lilith_runner::exec::registry::ProcessRegistry;
use std::time::{Duration, Instant};

// --- Helpers ---

fn engine() -> ExecutionEngine {
    ExecutionEngine::new(EngineConfig::default())
}

async fn wait_for_exit(registry: &ProcessRegistry, id: &ProcessId, within: Duration) -> ProcessStatus {
    let deadline = Instant::now() + within;
    loop {
        let status = registry.get(id).expect("record vanished").status;
        if status.is_terminal() {
            return status;
        }
        assert!(Instant::now() < deadline, "process {} still running after {:?}", id, within);
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

// --- Blocking mode ---

#[tokio::test]
async fn test_run_echo_succeeds() {
    let outcome = engine().run_blocking("echo hi", 5000).await;
    assert!(outcome.success);
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout, "hi");
    assert_eq!(outcome.stderr, "");
    assert!(!outcome.timed_out);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_run_nonzero_exit_fails() {
    let outcome = engine().run_blocking("echo oops >&2; exit 3", 5000).await;
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.stderr, "oops");
    assert!(!outcome.timed_out);
}

#[tokio::test]
async fn test_run_honours_shell_syntax() {
    let outcome = engine()
        .run_blocking("printf 'b\\na\\nc\\n' | sort | head -n 2", 5000)
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.stdout, "a\nb");
}

#[tokio::test]
async fn test_run_timeout_terminates_child() {
    let started = Instant::now();
    let outcome = engine().run_blocking("sleep 5", 100).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!outcome.success);
    assert!(outcome.timed_out);
    assert_ne!(outcome.exit_code, Some(0));
}

#[tokio::test]
async fn test_run_timeout_keeps_partial_output() {
    let outcome = engine().run_blocking("echo before; sleep 5; echo after", 300).await;
    assert!(outcome.timed_out);
    assert_eq!(outcome.stdout, "before");
}

#[tokio::test]
async fn test_run_redirects_into_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let target = dir.path().join("out.txt");
    let command = format!("echo stored > '{}' && cat '{}'", target.display(), target.display());

    let outcome = engine().run_blocking(&command, 5000).await;
    assert!(outcome.success);
    assert_eq!(outcome.stdout, "stored");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "stored\n");
}

#[tokio::test]
async fn test_run_zero_timeout_uses_default() {
    let outcome = engine().run_blocking("true", 0).await;
    assert!(outcome.success);
    assert!(!outcome.timed_out);
}

#[tokio::test]
async fn test_run_zero_configured_default_still_gets_a_timer() {
    let engine = ExecutionEngine::new(EngineConfig {
        run_timeout_ms: 0,
        ..EngineConfig::default()
    });
    let outcome = engine.run_blocking("sleep 0.2; echo ok", 0).await;
    assert!(outcome.success);
    assert!(!outcome.timed_out);
    assert_eq!(outcome.stdout, "ok");
}

#[tokio::test]
async fn test_run_launch_error_is_reported() {
    let engine = ExecutionEngine::new(EngineConfig {
        shell: "/definitely/not/a/shell".to_string(),
        ..EngineConfig::default()
    });
    let outcome = engine.run_blocking("echo hi", 1000).await;

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, None);
    assert!(!outcome.timed_out);
    let error = outcome.error.expect("launch error message");
    assert!(error.contains("/definitely/not/a/shell"));
}

#[tokio::test]
async fn test_run_background_job_does_not_hold_result() {
    let started = Instant::now();
    let outcome = engine().run_blocking("sleep 3 & echo done", 10_000).await;

    assert!(started.elapsed() < Duration::from_millis(2500));
    assert!(outcome.success);
    assert_eq!(outcome.stdout, "done");
}

#[tokio::test]
async fn test_run_output_cap_is_flagged() {
    let engine = ExecutionEngine::new(EngineConfig {
        max_output_bytes: Some(5),
        ..EngineConfig::default()
    });
    let outcome = engine.run_blocking("printf abcdefghij", 5000).await;

    assert!(outcome.success);
    assert_eq!(outcome.stdout, "abcde");
    assert!(outcome.stdout_truncated);
    assert!(!outcome.stderr_truncated);
}

// --- Tracked mode ---

#[tokio::test]
async fn test_start_is_visible_immediately_then_completes() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "sleep 1", 0);

    assert!(ack.pid.is_some());
    let view = registry.output(&ack.process_id, 0).unwrap();
    assert_eq!(view.status, ProcessStatus::Running);
    assert!(view.finished_at.is_none());
    assert_eq!(view.pid, ack.pid);

    let status = wait_for_exit(&registry, &ack.process_id, Duration::from_secs(5)).await;
    assert_eq!(status, ProcessStatus::Completed);
    let record = registry.get(&ack.process_id).unwrap();
    assert_eq!(record.exit_code, Some(0));
    assert!(record.finished_at.is_some());
}

#[tokio::test]
async fn test_start_output_grows_while_running() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "echo first; sleep 2; echo second", 0);

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let view = registry.output(&ack.process_id, 0).unwrap();
        if view.stdout == "first" {
            assert_eq!(view.status, ProcessStatus::Running);
            break;
        }
        assert!(Instant::now() < deadline, "first chunk never arrived");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    wait_for_exit(&registry, &ack.process_id, Duration::from_secs(5)).await;
    assert_eq!(registry.output(&ack.process_id, 0).unwrap().stdout, "first\nsecond");
}

#[tokio::test]
async fn test_start_tail_projection() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "for i in 1 2 3 4 5; do echo line$i; done", 0);
    wait_for_exit(&registry, &ack.process_id, Duration::from_secs(5)).await;

    let tail = registry.output(&ack.process_id, 2).unwrap();
    assert_eq!(tail.stdout, "line4\nline5");
    assert_eq!(tail, registry.output(&ack.process_id, 2).unwrap());
    assert_eq!(registry.output(&ack.process_id, 0).unwrap().stdout.lines().count(), 5);
}

#[tokio::test]
async fn test_start_timeout_marks_timed_out() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "sleep 5", 200);

    let status = wait_for_exit(&registry, &ack.process_id, Duration::from_secs(3)).await;
    assert_eq!(status, ProcessStatus::TimedOut);
    assert!(registry.get(&ack.process_id).unwrap().timed_out);
}

#[tokio::test]
async fn test_ignored_termination_keeps_running_past_timeout() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "trap '' TERM; sleep 2", 200);

    tokio::time::sleep(Duration::from_millis(700)).await;
    let record = registry.get(&ack.process_id).unwrap();
    assert_eq!(record.status, ProcessStatus::Running);
    assert!(record.timed_out);
    assert!(record.finished_at.is_none());

    let status = wait_for_exit(&registry, &ack.process_id, Duration::from_secs(5)).await;
    assert_eq!(status, ProcessStatus::TimedOut);
    assert_eq!(registry.get(&ack.process_id).unwrap().exit_code, Some(0));
}

#[tokio::test]
async fn test_start_launch_error_records_error() {
    let registry = ProcessRegistry::new();
    let engine = ExecutionEngine::new(EngineConfig {
        shell: "/definitely/not/a/shell".to_string(),
        ..EngineConfig::default()
    });
    let ack = engine.start_async(&registry, "echo hi", 0);

    assert!(ack.pid.is_none());
    let record = registry.get(&ack.process_id).unwrap();
    assert_eq!(record.status, ProcessStatus::Error);
    assert!(record.error_message.is_some());
    assert!(record.finished_at.is_some());
}

// --- Kill ---

#[tokio::test]
async fn test_kill_running_process() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "sleep 5", 0);

    registry.kill(&ack.process_id).unwrap();
    let killed = registry.get(&ack.process_id).unwrap();
    assert_eq!(killed.status, ProcessStatus::Killed);
    assert!(!killed.timed_out);
    let finished_at = killed.finished_at;
    assert!(finished_at.is_some());

    // The exit that follows the signal must not rewrite the record.
    tokio::time::sleep(Duration::from_millis(700)).await;
    let later = registry.get(&ack.process_id).unwrap();
    assert_eq!(later.status, ProcessStatus::Killed);
    assert_eq!(later.finished_at, finished_at);
    assert_eq!(later.exit_code, None);

    let err = registry.kill(&ack.process_id).unwrap_err();
    assert_eq!(err.code(), "not_running");
}

#[tokio::test]
async fn test_kill_while_output_drains_sends_nothing() {
    let registry = ProcessRegistry::new();
    // The background sleep keeps stdout open after the shell is reaped.
    let ack = engine().start_async(&registry, "sleep 2 & echo bg", 0);

    let deadline = Instant::now() + Duration::from_secs(3);
    while !registry.get(&ack.process_id).unwrap().reaped {
        assert!(Instant::now() < deadline, "shell was never reaped");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = registry.kill(&ack.process_id).unwrap_err();
    assert_eq!(err.code(), "not_running");

    let status = wait_for_exit(&registry, &ack.process_id, Duration::from_secs(3)).await;
    assert_eq!(status, ProcessStatus::Completed);
    assert_eq!(registry.output(&ack.process_id, 0).unwrap().stdout, "bg");
}

#[tokio::test]
async fn test_kill_completed_is_not_running() {
    let registry = ProcessRegistry::new();
    let ack = engine().start_async(&registry, "true", 0);
    wait_for_exit(&registry, &ack.process_id, Duration::from_secs(5)).await;
    let before = registry.get(&ack.process_id).unwrap().finished_at;

    assert_eq!(registry.kill(&ack.process_id).unwrap_err().code(), "not_running");
    assert_eq!(registry.get(&ack.process_id).unwrap().finished_at, before);
}

// --- Listing and clearing ---

#[tokio::test]
async fn test_list_running_after_one_finishes() {
    let registry = ProcessRegistry::new();
    let engine = engine();
    let quick = engine.start_async(&registry, "true", 0);
    let slow = engine.start_async(&registry, "sleep 3", 0);
    wait_for_exit(&registry, &quick.process_id, Duration::from_secs(5)).await;

    let running = registry.list(Some(ProcessStatus::Running));
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, slow.process_id);
    assert_eq!(running[0].command, "sleep 3");

    let all: Vec<_> = registry.list(None).into_iter().map(|s| s.id).collect();
    assert_eq!(all, vec![quick.process_id, slow.process_id]);

    assert_eq!(registry.clear(None).unwrap(), 1);
    assert_eq!(registry.list(None).len(), 1);

    // Clearing a running record is allowed.
    assert_eq!(registry.clear(Some(&slow.process_id)).unwrap(), 1);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_independent_registries() {
    let first = ProcessRegistry::new();
    let second = ProcessRegistry::new();
    let ack = engine().start_async(&first, "true", 0);

    assert!(first.get(&ack.process_id).is_ok());
    assert_eq!(second.get(&ack.process_id).unwrap_err().code(), "not_found");
}
