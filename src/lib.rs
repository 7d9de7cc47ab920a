//! Notch Core — terminal engine for the Notch panel
//!
//! Owns the embedded shell session behind the drop-down terminal: PTY
//! spawning, the background read loop, escape-sequence filtering, and
//! key-to-byte encoding, through a C FFI interface consumed by Swift.

pub mod config;
pub mod ffi;
pub mod terminal;
