//! C FFI interface for Swift integration.
//!
//! All functions exported here are callable from Swift via the C bridge.
//! Naming convention: notch_<module>_<action>

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use crate::config::SessionConfig;
use crate::terminal::keys::{encode_key, KeyCode, KeyEvent, Modifiers};
use crate::terminal::PtySession;

// ═══════════════════════════════════════════════════════════
// Session FFI
// ═══════════════════════════════════════════════════════════

/// Opaque pointer to a PtySession.
pub type NotchSessionHandle = *mut PtySession;

/// Output callback invoked with each decoded, escape-stripped text chunk.
/// Always called from the session's single delivery thread.
pub type NotchOutputCallback = extern "C" fn(text: *const c_char, userdata: *mut c_void);

/// Create a session from a JSON configuration string.
/// Pass null for defaults. Returns null if the JSON does not parse.
#[no_mangle]
pub extern "C" fn notch_session_create(config_json: *const c_char) -> NotchSessionHandle {
    let config = if config_json.is_null() {
        SessionConfig::default()
    } else {
        let raw = unsafe { CStr::from_ptr(config_json).to_str().unwrap_or("") };
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Invalid session config: {}", e);
                return std::ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(PtySession::new(config)))
}

/// Destroy a session, stopping the shell first.
#[no_mangle]
pub extern "C" fn notch_session_destroy(handle: NotchSessionHandle) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
    }
}

/// Start (or restart) the shell behind the session.
#[no_mangle]
pub extern "C" fn notch_session_start(handle: NotchSessionHandle) {
    if handle.is_null() {
        return;
    }
    let session = unsafe { &mut *handle };
    session.start();
}

/// Stop the shell. Safe to call repeatedly.
#[no_mangle]
pub extern "C" fn notch_session_stop(handle: NotchSessionHandle) {
    if handle.is_null() {
        return;
    }
    let session = unsafe { &mut *handle };
    session.stop();
}

/// Stop and start again with fresh state.
#[no_mangle]
pub extern "C" fn notch_session_reset(handle: NotchSessionHandle) {
    if handle.is_null() {
        return;
    }
    let session = unsafe { &mut *handle };
    session.reset();
}

/// Write raw bytes to the shell.
/// Returns 0 on success, -1 on invalid arguments. Writing to a stopped
/// session succeeds as a no-op.
#[no_mangle]
pub extern "C" fn notch_session_write(
    handle: NotchSessionHandle,
    data: *const u8,
    len: usize,
) -> i32 {
    if handle.is_null() || data.is_null() {
        return -1;
    }

    let session = unsafe { &*handle };
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    session.write(bytes);
    0
}

/// Resize the terminal.
#[no_mangle]
pub extern "C" fn notch_session_resize(
    handle: NotchSessionHandle,
    cols: u16,
    rows: u16,
) -> i32 {
    if handle.is_null() {
        return -1;
    }
    let session = unsafe { &mut *handle };
    session.resize(cols, rows);
    0
}

/// Returns 1 if the shell is running, 0 if not, -1 on invalid handle.
#[no_mangle]
pub extern "C" fn notch_session_is_running(handle: NotchSessionHandle) -> i32 {
    if handle.is_null() {
        return -1;
    }
    let session = unsafe { &*handle };
    if session.is_running() {
        1
    } else {
        0
    }
}

/// Context carrying the raw userdata pointer into the delivery thread.
struct SinkContext {
    callback: NotchOutputCallback,
    userdata: *mut c_void,
}

// The panel guarantees the userdata outlives the session
unsafe impl Send for SinkContext {}

/// Register the output callback for a session.
/// The callback runs on the session's delivery thread; the text pointer is
/// only valid for the duration of the call.
#[no_mangle]
pub extern "C" fn notch_session_set_output_callback(
    handle: NotchSessionHandle,
    callback: NotchOutputCallback,
    userdata: *mut c_void,
) {
    if handle.is_null() {
        return;
    }
    let session = unsafe { &*handle };
    let context = SinkContext { callback, userdata };

    session.set_output_sink(move |text| {
        // Force the whole `context` to be captured (Send) rather than its
        // individual raw-pointer field under edition-2021 disjoint captures.
        let context = &context;
        // Interior NUL bytes cannot cross a C string boundary
        let sanitized: String = text.chars().filter(|&c| c != '\0').collect();
        let c_text = CString::new(sanitized).unwrap_or_default();
        (context.callback)(c_text.as_ptr(), context.userdata);
    });
}

/// Current session configuration as JSON (reflects later resizes).
/// Caller must free the returned string with notch_string_free.
#[no_mangle]
pub extern "C" fn notch_session_config_json(handle: NotchSessionHandle) -> *mut c_char {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    let session = unsafe { &*handle };

    match serde_json::to_string(session.config()) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

// ═══════════════════════════════════════════════════════════
// Key Encoding FFI
// ═══════════════════════════════════════════════════════════

/// Key codes accepted by `notch_key_encode`:
/// 0 = plain text, 1 = up, 2 = down, 3 = left, 4 = right, 5 = return,
/// 6 = tab, 7 = backspace, 8 = forward delete, 9 = page up, 10 = page down,
/// 11 = home, 12 = end, 13 = escape. Unknown values fall back to plain text.
fn key_code_from_raw(code: u32) -> KeyCode {
    match code {
        1 => KeyCode::Up,
        2 => KeyCode::Down,
        3 => KeyCode::Left,
        4 => KeyCode::Right,
        5 => KeyCode::Return,
        6 => KeyCode::Tab,
        7 => KeyCode::Backspace,
        8 => KeyCode::ForwardDelete,
        9 => KeyCode::PageUp,
        10 => KeyCode::PageDown,
        11 => KeyCode::Home,
        12 => KeyCode::End,
        13 => KeyCode::Escape,
        _ => KeyCode::Text,
    }
}

/// Encode one key press into the bytes a terminal program expects.
/// `text` may be null for special keys. Writes at most `out_cap` bytes into
/// `out` and returns the number written, or -1 on invalid arguments.
#[no_mangle]
pub extern "C" fn notch_key_encode(
    code: u32,
    control: bool,
    alt: bool,
    text: *const c_char,
    out: *mut u8,
    out_cap: usize,
) -> i64 {
    if out.is_null() {
        return -1;
    }

    let text_str = if text.is_null() {
        ""
    } else {
        unsafe { CStr::from_ptr(text).to_str().unwrap_or("") }
    };

    let event = KeyEvent {
        code: key_code_from_raw(code),
        modifiers: Modifiers { control, alt },
        text: text_str.to_string(),
    };

    let bytes = encode_key(&event);
    let copy_len = bytes.len().min(out_cap);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), out, copy_len);
    }
    copy_len as i64
}

// ═══════════════════════════════════════════════════════════
// Utility FFI
// ═══════════════════════════════════════════════════════════

/// Free a string allocated by Rust.
#[no_mangle]
pub extern "C" fn notch_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

/// Initialize the Rust logger.
#[no_mangle]
pub extern "C" fn notch_init() {
    let _ = env_logger::try_init();
    log::info!("Notch Core initialized");
}
