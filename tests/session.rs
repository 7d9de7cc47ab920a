//! Process-level session tests against a real shell.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use anyhow::Result;

use notch_core::config::SessionConfig;
use notch_core::terminal::{PtySession, SESSION_ENDED};

fn sh_config(args: &[&str]) -> SessionConfig {
    SessionConfig {
        shell: "/bin/sh".to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        ..SessionConfig::default()
    }
}

/// Poll until the predicate holds or the deadline passes.
fn wait_for(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    predicate()
}

#[test]
fn test_echo_round_trip() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = PtySession::new(sh_config(&[]));
    let output = Arc::new(Mutex::new(String::new()));
    let threads: Arc<Mutex<HashSet<ThreadId>>> = Arc::new(Mutex::new(HashSet::new()));

    let sink_output = output.clone();
    let sink_threads = threads.clone();
    session.set_output_sink(move |text| {
        sink_output.lock().unwrap().push_str(text);
        sink_threads.lock().unwrap().insert(std::thread::current().id());
    });

    session.start();
    assert!(session.is_running());

    session.write(b"echo hi\r");
    let seen = wait_for(
        || output.lock().unwrap().contains("hi"),
        Duration::from_secs(10),
    );
    assert!(seen, "shell output never contained 'hi': {:?}", output.lock().unwrap());

    session.stop();
    assert!(!session.is_running());

    // Every delivery came from the one delivery thread
    assert_eq!(threads.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn test_sentinel_after_child_exit() {
    let mut session = PtySession::new(sh_config(&["-c", "exit 0"]));
    let output = Arc::new(Mutex::new(String::new()));

    let sink_output = output.clone();
    session.set_output_sink(move |text| {
        sink_output.lock().unwrap().push_str(text);
    });

    session.start();
    let seen = wait_for(
        || output.lock().unwrap().contains(SESSION_ENDED),
        Duration::from_secs(10),
    );
    assert!(seen, "sentinel never delivered: {:?}", output.lock().unwrap());
}

#[test]
fn test_write_before_start_is_noop() {
    let session = PtySession::new(sh_config(&[]));
    session.write(b"echo never\r");
    assert!(!session.is_running());
}

#[test]
fn test_stop_is_idempotent() {
    let mut session = PtySession::new(sh_config(&[]));
    session.stop();
    session.stop();

    session.start();
    session.stop();
    session.stop();
    assert!(!session.is_running());
}

#[test]
fn test_reset_recovers_an_exited_shell() {
    let mut session = PtySession::new(sh_config(&["-c", "exit 0"]));
    let output = Arc::new(Mutex::new(String::new()));

    let sink_output = output.clone();
    session.set_output_sink(move |text| {
        sink_output.lock().unwrap().push_str(text);
    });

    session.start();
    let exited = wait_for(
        || output.lock().unwrap().contains(SESSION_ENDED),
        Duration::from_secs(10),
    );
    assert!(exited);

    session.reset();
    assert!(session.is_running());
    session.stop();
}

#[test]
fn test_allocation_failure_is_reported_not_fatal() {
    // A nonexistent shell still allocates the PTY; the child exec fails and
    // the parent just sees EOF plus the sentinel. A NUL-poisoned path fails
    // before the fork and must surface through the callback.
    let mut session = PtySession::new(SessionConfig {
        shell: "/bin/\0sh".to_string(),
        ..SessionConfig::default()
    });
    let output = Arc::new(Mutex::new(String::new()));

    let sink_output = output.clone();
    session.set_output_sink(move |text| {
        sink_output.lock().unwrap().push_str(text);
    });

    session.start();
    assert!(!session.is_running());
    let reported = wait_for(
        || output.lock().unwrap().contains("failed to start shell"),
        Duration::from_secs(5),
    );
    assert!(reported, "spawn failure not reported: {:?}", output.lock().unwrap());
}
