const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Interrupt,
    EndOfInput,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Normal,
    SeenEsc,
    SeenBracket,
}

/// Turns raw input bytes into key events, one byte at a time.
///
/// Only `ESC [ A|B|C|D` is decoded. Any other escape sequence is consumed up
/// to and including its final byte and produces nothing, so a stray `~` from
/// `ESC [ 3 ~` never lands in the buffer.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: DecodeState,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = DecodeState::Normal;
    }

    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Normal
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            DecodeState::Normal => self.decode_normal(byte),
            DecodeState::SeenEsc => {
                self.state = match byte {
                    b'[' => DecodeState::SeenBracket,
                    ESC => DecodeState::SeenEsc,
                    _ => DecodeState::Normal,
                };
                None
            }
            DecodeState::SeenBracket => match byte {
                // a new sequence cuts the unfinished one short
                ESC => {
                    self.state = DecodeState::SeenEsc;
                    None
                }
                // parameter and intermediate bytes
                0x20..=0x3f => None,
                b'A' => self.finish(Key::Up),
                b'B' => self.finish(Key::Down),
                b'C' => self.finish(Key::Right),
                b'D' => self.finish(Key::Left),
                _ => {
                    self.state = DecodeState::Normal;
                    None
                }
            },
        }
    }

    fn finish(&mut self, key: Key) -> Option<Key> {
        self.state = DecodeState::Normal;
        Some(key)
    }

    fn decode_normal(&mut self, byte: u8) -> Option<Key> {
        match byte {
            ESC => {
                self.state = DecodeState::SeenEsc;
                None
            }
            b'\n' | b'\r' => Some(Key::Enter),
            DELETE | BACKSPACE => Some(Key::Backspace),
            CTRL_C => Some(Key::Interrupt),
            CTRL_D => Some(Key::EndOfInput),
            0x20..=0x7e => Some(Key::Char(byte as char)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Key> {
        let mut decoder = KeyDecoder::new();
        bytes.iter().filter_map(|b| decoder.feed(*b)).collect()
    }

    #[test]
    fn decodes_printable_and_control_bytes() {
        assert_eq!(
            decode_all(b"ab\x7f\n"),
            vec![Key::Char('a'), Key::Char('b'), Key::Backspace, Key::Enter]
        );
        assert_eq!(decode_all(&[CTRL_C, CTRL_D]), vec![Key::Interrupt, Key::EndOfInput]);
    }

    #[test]
    fn decodes_arrow_sequences() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn swallows_unknown_sequences_entirely() {
        // Delete key, then F5, then Home with modifiers
        assert_eq!(decode_all(b"\x1b[3~x\x1b[15~y\x1b[1;5Hz"), vec![
            Key::Char('x'),
            Key::Char('y'),
            Key::Char('z')
        ]);
    }

    #[test]
    fn esc_followed_by_other_byte_returns_to_normal() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(ESC), None);
        assert!(!decoder.is_idle());
        assert_eq!(decoder.feed(b'O'), None);
        assert!(decoder.is_idle());
        assert_eq!(decoder.feed(b'q'), Some(Key::Char('q')));
    }

    #[test]
    fn repeated_esc_restarts_the_sequence() {
        assert_eq!(decode_all(b"\x1b\x1b[A"), vec![Key::Up]);
        assert_eq!(decode_all(b"\x1b[1\x1b[Bk"), vec![Key::Down, Key::Char('k')]);
    }

    #[test]
    fn ignores_non_ascii_and_stray_control_bytes() {
        assert_eq!(decode_all(&[0xc3, 0xa9, 0x01, b'\t', b'k']), vec![Key::Char('k')]);
    }
}
