//! Escape-sequence stripping for terminal output.
//!
//! Only used to turn raw PTY bytes into plain text for classification and
//! help parsing. The display path always receives the untouched bytes.

/// Strip ANSI/VT escape sequences and non-printing control characters.
///
/// Handles CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`),
/// charset designations (`ESC ( B`) and other two-byte escapes. Carriage
/// returns are dropped so `\r\n` becomes `\n`; tabs and newlines survive.
pub fn strip_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek().copied() {
                Some('[') => {
                    chars.next();
                    // Parameter and intermediate bytes (0x20–0x3F)
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii() && (0x20..=0x3F).contains(&(next as u8)) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    // Final byte (0x40–0x7E)
                    if let Some(&next) = chars.peek() {
                        if next.is_ascii() && (0x40..=0x7E).contains(&(next as u8)) {
                            chars.next();
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                Some('(') | Some(')') | Some('*') | Some('+') => {
                    chars.next();
                    chars.next();
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\n' | '\t' => result.push(c),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }
    result
}
