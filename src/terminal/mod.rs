//! PTY session lifecycle and the background read loop.
//!
//! A `PtySession` owns one interactive shell: the PTY master descriptor, the
//! child process, and the reader thread that streams decoded output to the
//! display layer's callback. Input encoding lives in `keys`, output filtering
//! in `filter`, and the raw descriptor/process plumbing in `pty`.

pub mod filter;
pub mod keys;
pub mod pty;

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::config::SessionConfig;
use self::pty::{INVALID_FD, NO_CHILD};

/// Final message delivered through the output callback when the read loop
/// ends, whether the shell exited on its own or the session was stopped.
pub const SESSION_ENDED: &str = "[session ended]";

/// Read size for the background loop.
const READ_CHUNK: usize = 4096;

type OutputSink = Box<dyn FnMut(&str) + Send>;

/// An embedded shell session behind a PTY master descriptor.
///
/// The session is the single owner of its OS resources: master descriptor and
/// child pid are created and destroyed together, and both return to their
/// sentinel values after `stop`. The display layer registers a callback with
/// `set_output_sink`; decoded, escape-stripped chunks arrive there in read
/// order, always from the session's one delivery thread.
pub struct PtySession {
    config: SessionConfig,
    /// Master side of the PTY; `INVALID_FD` when not running.
    master: RawFd,
    /// Shell process id; `NO_CHILD` when not running.
    child: libc::pid_t,
    /// Cooperative cancellation flag shared with the current reader thread.
    /// Replaced wholesale on every `start` so a stale reader from a previous
    /// generation can never be re-armed.
    running: Arc<AtomicBool>,
    chunks_tx: Sender<String>,
    sink: Arc<Mutex<Option<OutputSink>>>,
}

impl PtySession {
    /// Create a stopped session and its delivery thread.
    pub fn new(config: SessionConfig) -> Self {
        let (chunks_tx, chunks_rx) = mpsc::channel::<String>();
        let sink: Arc<Mutex<Option<OutputSink>>> = Arc::new(Mutex::new(None));

        // Single delivery context: whichever thread produced a chunk, the
        // registered sink only ever runs here. The thread exits once the
        // session and every reader generation have dropped their senders.
        let delivery_sink = sink.clone();
        thread::spawn(move || {
            while let Ok(text) = chunks_rx.recv() {
                if let Some(callback) = delivery_sink.lock().unwrap().as_mut() {
                    callback(&text);
                }
            }
        });

        Self {
            config,
            master: INVALID_FD,
            child: NO_CHILD,
            running: Arc::new(AtomicBool::new(false)),
            chunks_tx,
            sink,
        }
    }

    /// Register the output callback. Chunks produced before registration are
    /// dropped.
    pub fn set_output_sink<F>(&self, sink: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        *self.sink.lock().unwrap() = Some(Box::new(sink));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start the shell. Stops any previous session first, so repeated calls
    /// never leak a descriptor.
    ///
    /// PTY allocation failure is reported through the output callback and
    /// leaves the session stopped; the caller may retry.
    pub fn start(&mut self) {
        self.stop();

        let spawned = match pty::spawn_shell(&self.config) {
            Ok(spawned) => spawned,
            Err(e) => {
                log::error!("Failed to start shell: {}", e);
                let _ = self
                    .chunks_tx
                    .send(format!("[failed to start shell: {}]\r\n", e));
                return;
            }
        };

        log::debug!(
            "Shell {} started: pid {}, master fd {}",
            self.config.shell,
            spawned.pid,
            spawned.master
        );
        self.master = spawned.master;
        self.child = spawned.pid;

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();

        let fd = spawned.master;
        let pid = spawned.pid;
        let chunks_tx = self.chunks_tx.clone();
        thread::spawn(move || read_loop(fd, pid, running, chunks_tx));
    }

    /// Stop the shell. Idempotent and safe during teardown.
    ///
    /// Best-effort asynchronous: the reader thread may still be blocked in
    /// its read when this returns and exits on its own once descriptor
    /// closure or child death unblocks it. A final delivery (including the
    /// session-ended sentinel) can still arrive afterwards.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if self.child != NO_CHILD {
            pty::terminate_child(self.child);
            self.child = NO_CHILD;
        }
        if self.master != INVALID_FD {
            pty::close_master(self.master);
            self.master = INVALID_FD;
        }
    }

    /// Stop then start: recovers a hung or exited shell with fresh state.
    pub fn reset(&mut self) {
        self.stop();
        self.start();
    }

    /// Write bytes verbatim to the PTY master.
    ///
    /// No framing is added; callers include `\r` where a terminal program
    /// expects it. Writing to a stopped session is a silent no-op, since
    /// writes racing teardown are expected.
    pub fn write(&self, bytes: &[u8]) {
        if self.master == INVALID_FD || bytes.is_empty() {
            return;
        }
        pty::write_master(self.master, bytes);
    }

    /// Resize the terminal. Remembered in the config for the next start;
    /// applied to the live PTY when running.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.config.cols = cols;
        self.config.rows = rows;
        if self.master == INVALID_FD {
            return;
        }
        if let Err(e) = pty::resize(self.master, cols, rows) {
            log::warn!("Resize to {}x{} failed: {}", cols, rows, e);
        }
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background read loop, one per session generation.
///
/// Blocks in `read` until data arrives, EOF occurs, or `stop` closes the
/// descriptor. Errors and EOF are treated identically: the loop ends, the
/// sentinel goes out, and the child is reaped off the caller thread.
fn read_loop(fd: RawFd, pid: libc::pid_t, running: Arc<AtomicBool>, chunks_tx: Sender<String>) {
    let mut buf = [0u8; READ_CHUNK];

    while running.load(Ordering::SeqCst) {
        let count = pty::read_master(fd, &mut buf);
        if count <= 0 {
            break;
        }
        let text = filter::decode_text(&buf[..count as usize]);
        let visible = filter::strip_escapes(&text);
        if visible.is_empty() {
            continue;
        }
        if chunks_tx.send(visible).is_err() {
            break;
        }
    }

    let _ = chunks_tx.send(SESSION_ENDED.to_string());
    pty::reap_child(pid);
    log::debug!("Reader for pid {} exited", pid);
}
