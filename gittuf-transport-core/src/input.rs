//! Splitting the controller's command stream into helper tokens.
//!
//! The parent Git process starts out speaking newline-terminated text
//! commands. Once a stateless-connect session begins, the stream switches to
//! pkt-line framing for the rest of the invocation; the switch is one-way.

use std::io::BufRead;

use crate::pktline;

/// Framing mode of the controller stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Newline-terminated helper commands.
    Text,
    /// Whole pkt-line frames.
    Packet,
}

/// Splits the controller's input into tokens: text lines (trailing newline
/// included, a bare `\n` standing alone) or whole pkt-line frames.
///
/// A one-token pushback buffer lets a caller re-dispatch the token it just
/// read, which multi-round fetch negotiation relies on.
pub struct CommandReader<R> {
    inner: R,
    mode: Mode,
    pushback: Option<Vec<u8>>,
}

impl<R: BufRead> CommandReader<R> {
    /// Create a reader in text mode over `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            mode: Mode::Text,
            pushback: None,
        }
    }

    /// The current framing mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch to pkt-line framing. There is no way back within an invocation.
    pub fn enter_packet_mode(&mut self) {
        self.mode = Mode::Packet;
    }

    /// Push `token` back so the next [`next_token`](Self::next_token) call
    /// returns it again. Holds at most one token.
    pub fn unread(&mut self, token: Vec<u8>) {
        debug_assert!(self.pushback.is_none(), "pushback buffer already occupied");
        self.pushback = Some(token);
    }

    /// Read the next token, or `None` at a clean end of stream.
    pub fn next_token(&mut self) -> Result<Option<Vec<u8>>, pktline::Error> {
        if let Some(token) = self.pushback.take() {
            return Ok(Some(token));
        }
        match self.mode {
            Mode::Text => {
                let mut line = Vec::new();
                let read = self.inner.read_until(b'\n', &mut line)?;
                if read == 0 {
                    Ok(None)
                } else {
                    Ok(Some(line))
                }
            }
            Mode::Packet => pktline::read_frame(&mut self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_keeps_trailing_newline() {
        let mut reader = CommandReader::new(&b"capabilities\nlist\n"[..]);
        assert_eq!(reader.next_token().unwrap().unwrap(), b"capabilities\n");
        assert_eq!(reader.next_token().unwrap().unwrap(), b"list\n");
        assert_eq!(reader.next_token().unwrap(), None);
    }

    #[test]
    fn blank_line_is_its_own_token() {
        let mut reader = CommandReader::new(&b"push a:b\n\n"[..]);
        assert_eq!(reader.next_token().unwrap().unwrap(), b"push a:b\n");
        assert_eq!(reader.next_token().unwrap().unwrap(), b"\n");
    }

    #[test]
    fn packet_mode_yields_whole_frames() {
        let mut reader = CommandReader::new(&b"0014command=ls-refs\n0000"[..]);
        reader.enter_packet_mode();
        assert_eq!(reader.next_token().unwrap().unwrap(), b"0014command=ls-refs\n");
        assert_eq!(reader.next_token().unwrap().unwrap(), pktline::FLUSH_PKT);
        assert_eq!(reader.next_token().unwrap(), None);
    }

    #[test]
    fn pushback_is_returned_first() {
        let mut reader = CommandReader::new(&b"list\n"[..]);
        reader.unread(b"0000".to_vec());
        assert_eq!(reader.next_token().unwrap().unwrap(), b"0000");
        assert_eq!(reader.next_token().unwrap().unwrap(), b"list\n");
    }
}
