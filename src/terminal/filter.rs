//! Output filtering between the PTY read loop and the display layer.
//!
//! Best-effort visual cleanup, not a terminal emulator: escape sequences are
//! removed so raw escape bytes never reach a plain-text display, but cursor
//! movement, color, and screen-clearing semantics are not interpreted.

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Decode a chunk of PTY output.
///
/// PTY streams are not guaranteed well-formed UTF-8 mid-stream, so invalid
/// chunks fall back to a one-byte-per-character (Latin-1) decoding instead of
/// dropping data.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Remove ANSI/VT escape sequences from decoded text.
///
/// CSI sequences (`ESC [`) are skipped through their parameter bytes and final
/// letter; OSC sequences (`ESC ]`) through their BEL or ESC terminator; any
/// other escape consumes the escape plus one following character. Everything
/// else copies through unchanged.
///
/// Operates on one chunk at a time with no carried state: a lone ESC or an
/// unfinished sequence at the end of a chunk is consumed, not held for the
/// next chunk.
pub fn strip_escapes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != ESC {
            output.push(chars[i]);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            // CSI: parameters and intermediates, then one final letter
            Some('[') => {
                i += 2;
                while i < chars.len() && !chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                i += 1;
            }
            // OSC: runs to a BEL or another escape, then one more character
            Some(']') => {
                i += 2;
                while i < chars.len() && chars[i] != BEL && chars[i] != ESC {
                    i += 1;
                }
                i += 1;
            }
            // Two-character escape
            Some(_) => {
                i += 2;
            }
            // Lone trailing escape
            None => {
                i += 1;
            }
        }
    }

    output
}
