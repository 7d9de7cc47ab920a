use std::ffi::CString;
use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

use crate::config::SessionConfig;

/// Sentinel for "no descriptor held".
pub const INVALID_FD: RawFd = -1;
/// Sentinel for "no child process".
pub const NO_CHILD: libc::pid_t = -1;

/// Errors spawning the shell behind a PTY.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("pty allocation failed: {0}")]
    Allocation(#[from] io::Error),
    #[error("shell path or argument contains a NUL byte")]
    BadArgument,
}

/// Master descriptor and child pid of a freshly spawned shell.
///
/// Plain values, not owning handles: the session stores them behind sentinel
/// values and decides when to close the descriptor and signal the child.
pub struct PtyChild {
    pub master: RawFd,
    pub pid: libc::pid_t,
}

/// Fork a shell behind a new PTY pair sized to the configured geometry.
/// The slave side becomes the child's controlling terminal.
pub fn spawn_shell(config: &SessionConfig) -> Result<PtyChild, SpawnError> {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());

    // All child-side strings are built before forking; only raw libc calls
    // happen between fork and exec.
    let shell_c = CString::new(config.shell.as_str()).map_err(|_| SpawnError::BadArgument)?;
    let mut argv_c: Vec<CString> = vec![shell_c.clone()];
    for arg in &config.args {
        argv_c.push(CString::new(arg.as_str()).map_err(|_| SpawnError::BadArgument)?);
    }
    let argv_ptrs: Vec<*const libc::c_char> = argv_c
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect();

    // Inherited environment plus terminal overrides
    let env_c: Vec<CString> = [
        format!("TERM={}", config.term),
        format!("COLUMNS={}", config.cols),
        format!("LINES={}", config.rows),
        format!("HOME={}", home),
    ]
    .into_iter()
    .map(|s| CString::new(s).map_err(|_| SpawnError::BadArgument))
    .collect::<Result<_, _>>()?;
    let home_c = CString::new(home).map_err(|_| SpawnError::BadArgument)?;

    let mut win_size = libc::winsize {
        ws_row: config.rows,
        ws_col: config.cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    let mut master_fd: libc::c_int = INVALID_FD;

    unsafe {
        let child_pid = libc::forkpty(
            &mut master_fd,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut win_size,
        );

        if child_pid < 0 {
            return Err(SpawnError::Allocation(io::Error::last_os_error()));
        }

        if child_pid == 0 {
            // Child process: home as working directory, terminal environment
            // applied, then the shell replaces this process image
            libc::chdir(home_c.as_ptr());
            for entry in &env_c {
                libc::putenv(entry.as_ptr() as *mut _);
            }
            libc::execvp(shell_c.as_ptr(), argv_ptrs.as_ptr());
            // Exec failed; must never fall through to parent-side state
            libc::_exit(1);
        }

        Ok(PtyChild {
            master: master_fd,
            pid: child_pid,
        })
    }
}

/// Blocking read from the master descriptor.
/// Returns bytes read, 0 on EOF, negative on error (including a descriptor
/// closed out from under the reader).
pub fn read_master(fd: RawFd, buf: &mut [u8]) -> isize {
    unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) }
}

/// Write bytes to the master descriptor, looping over short writes.
/// A failed write abandons the remainder; the caller treats writes to a dead
/// descriptor as a no-op, so nothing is reported.
pub fn write_master(fd: RawFd, bytes: &[u8]) {
    let mut written = 0;
    while written < bytes.len() {
        let result = unsafe {
            libc::write(
                fd,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
            )
        };
        if result <= 0 {
            break;
        }
        written += result as usize;
    }
}

pub fn close_master(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Apply a new window size to the PTY.
pub fn resize(fd: RawFd, cols: u16, rows: u16) -> Result<(), io::Error> {
    let win_size = libc::winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &win_size) };

    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Best-effort child termination: SIGTERM, escalating to SIGKILL if the
/// child has not exited yet. Never blocks the calling thread.
pub fn terminate_child(pid: libc::pid_t) {
    unsafe {
        libc::kill(pid, libc::SIGTERM);

        let mut status: libc::c_int = 0;
        if libc::waitpid(pid, &mut status, libc::WNOHANG) == 0 {
            libc::kill(pid, libc::SIGKILL);
            libc::waitpid(pid, &mut status, libc::WNOHANG);
        }
    }
}

/// Blocking wait so no zombie outlives the session. Runs on the reader
/// thread once the read loop has ended; tolerates a child that
/// `terminate_child` already reaped.
pub fn reap_child(pid: libc::pid_t) {
    let mut status: libc::c_int = 0;
    unsafe {
        libc::waitpid(pid, &mut status, 0);
    }
}
