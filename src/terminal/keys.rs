//! Input encoding for the terminal PTY.
//!
//! Converts key-press events from the panel into the byte sequences a
//! terminal-aware program expects. Handles:
//! - Special keys (arrows, paging, editing keys)
//! - Control key combinations (Ctrl-A through Ctrl-Z plus punctuation)
//! - Ordinary printable text, including multi-character IME commits

use serde::{Deserialize, Serialize};

/// Logical key identity, independent of any UI toolkit's key codes.
///
/// `Text` means no special key: the event's text field carries the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCode {
    Text,
    Up,
    Down,
    Left,
    Right,
    Return,
    Tab,
    Backspace,
    ForwardDelete,
    PageUp,
    PageDown,
    Home,
    End,
    Escape,
}

/// Modifier flags attached to a key event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        control: false,
        alt: false,
    };
    pub const CONTROL: Modifiers = Modifiers {
        control: true,
        alt: false,
    };
}

/// One key press as produced by the input layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    /// Raw printable text for ordinary characters; empty for special keys.
    pub text: String,
}

impl KeyEvent {
    pub fn special(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            text: String::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            code: KeyCode::Text,
            modifiers: Modifiers::NONE,
            text: text.into(),
        }
    }

    pub fn control(text: impl Into<String>) -> Self {
        Self {
            code: KeyCode::Text,
            modifiers: Modifiers::CONTROL,
            text: text.into(),
        }
    }
}

/// Encode a key event as the bytes written to the PTY master.
///
/// Special keys are checked before modifier handling; control arithmetic
/// before printable passthrough. Never fails: an event with no special code,
/// no control mapping, and no text encodes to an empty vector. No newline is
/// ever appended; Return is a plain `\r` and callers treat it as their
/// submission signal.
pub fn encode_key(event: &KeyEvent) -> Vec<u8> {
    match event.code {
        KeyCode::Up => return b"\x1b[A".to_vec(),
        KeyCode::Down => return b"\x1b[B".to_vec(),
        KeyCode::Right => return b"\x1b[C".to_vec(),
        KeyCode::Left => return b"\x1b[D".to_vec(),
        KeyCode::Return => return b"\r".to_vec(),
        KeyCode::Tab => return b"\t".to_vec(),
        KeyCode::Backspace => return vec![0x7f],
        KeyCode::ForwardDelete => return b"\x1b[3~".to_vec(),
        KeyCode::PageUp => return b"\x1b[5~".to_vec(),
        KeyCode::PageDown => return b"\x1b[6~".to_vec(),
        KeyCode::Home => return b"\x1b[H".to_vec(),
        KeyCode::End => return b"\x1b[F".to_vec(),
        KeyCode::Escape => return vec![0x1b],
        KeyCode::Text => {}
    }

    if event.modifiers.control {
        if let Some(byte) = control_byte(&event.text) {
            return with_alt_prefix(event.modifiers, vec![byte]);
        }
    }

    if event.text.is_empty() {
        return Vec::new();
    }
    with_alt_prefix(event.modifiers, event.text.as_bytes().to_vec())
}

/// Canonical control-key arithmetic: `@`-`_` map down by 64, backtick-`z`
/// by 96, so Ctrl-A is 0x01 through Ctrl-Z at 0x1A, plus the punctuation
/// controls (Ctrl-@, Ctrl-[, Ctrl-\, Ctrl-], Ctrl-^, Ctrl-_).
fn control_byte(text: &str) -> Option<u8> {
    let ch = text.chars().next()? as u32;
    match ch {
        0x40..=0x5f => Some((ch - 64) as u8),
        0x60..=0x7a => Some((ch - 96) as u8),
        _ => None,
    }
}

/// Alt acts as Meta: prefix the encoded bytes with a single escape.
fn with_alt_prefix(modifiers: Modifiers, bytes: Vec<u8>) -> Vec<u8> {
    if !modifiers.alt {
        return bytes;
    }
    let mut prefixed = Vec::with_capacity(bytes.len() + 1);
    prefixed.push(0x1b);
    prefixed.extend(bytes);
    prefixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_keys() {
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Up)), [0x1b, 0x5b, 0x41]);
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Down)), b"\x1b[B");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Left)), b"\x1b[D");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Right)), b"\x1b[C");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Return)), [0x0d]);
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Tab)), [0x09]);
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Backspace)), [0x7f]);
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::ForwardDelete)), b"\x1b[3~");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::PageUp)), b"\x1b[5~");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::PageDown)), b"\x1b[6~");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Home)), b"\x1b[H");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::End)), b"\x1b[F");
        assert_eq!(encode_key(&KeyEvent::special(KeyCode::Escape)), [0x1b]);
    }

    #[test]
    fn test_control_letters() {
        assert_eq!(encode_key(&KeyEvent::control("a")), [0x01]);
        assert_eq!(encode_key(&KeyEvent::control("c")), [0x03]);
        assert_eq!(encode_key(&KeyEvent::control("z")), [0x1a]);
        // Uppercase maps through the same control codes
        assert_eq!(encode_key(&KeyEvent::control("C")), [0x03]);
    }

    #[test]
    fn test_control_punctuation() {
        assert_eq!(encode_key(&KeyEvent::control("@")), [0x00]);
        assert_eq!(encode_key(&KeyEvent::control("[")), [0x1b]);
        assert_eq!(encode_key(&KeyEvent::control("_")), [0x1f]);
    }

    #[test]
    fn test_control_outside_range_falls_through_to_text() {
        assert_eq!(encode_key(&KeyEvent::control("1")), b"1");
    }

    #[test]
    fn test_printable_passthrough() {
        assert_eq!(encode_key(&KeyEvent::text("ls -la")), b"ls -la");
        // Multi-character IME commit, verbatim and without a trailing newline
        assert_eq!(encode_key(&KeyEvent::text("日本語")), "日本語".as_bytes());
    }

    #[test]
    fn test_empty_event_is_ignored() {
        assert_eq!(encode_key(&KeyEvent::text("")), Vec::<u8>::new());
    }

    #[test]
    fn test_alt_prefixes_escape() {
        let event = KeyEvent {
            code: KeyCode::Text,
            modifiers: Modifiers {
                control: false,
                alt: true,
            },
            text: "f".to_string(),
        };
        assert_eq!(encode_key(&event), [0x1b, b'f']);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let event = KeyEvent::control("c");
        assert_eq!(encode_key(&event), encode_key(&event));
    }
}
