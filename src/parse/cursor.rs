use crate::position::Position;
use crate::source::{SourceFile, SourceId};

fn is_continuation_byte(c: u8) -> bool {
    c & 0b1100_0000 == 0b1000_0000
}

/// A byte iterator over a source file that keeps track of the current position.
///
/// Columns are counted in characters: UTF-8 continuation bytes do not advance the column.
#[derive(Debug, Clone)]
pub struct Cursor<'buf> {
    buf: &'buf [u8],
    source_id: SourceId,
    pos: Position,
    prev_pos: Option<Position>,
}

impl<'buf> Cursor<'buf> {
    pub fn new(src_file: &SourceFile<'buf>) -> Self {
        Self {
            buf: src_file.buf(),
            source_id: src_file.id(),
            pos: Position::with_source_file(src_file),
            prev_pos: None,
        }
    }

    /// Returns the position of the immediately following character.
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Returns the position of the previously returned character.
    pub fn prev_pos(&self) -> Position {
        self.prev_pos.unwrap_or_else(|| Position::with_source_id(self.source_id))
    }

    pub fn peek(&self) -> Option<u8> {
        self.remaining().first().copied()
    }

    pub fn remaining(&self) -> &'buf [u8] {
        &self.buf[self.pos.byte..]
    }

    pub fn starts_with(&self, value: &[u8]) -> bool {
        self.remaining().starts_with(value)
    }

    pub fn consume_expecting(&mut self, expected: &[u8]) -> Option<&'buf [u8]> {
        if self.starts_with(expected) {
            Some(self.consume_n(expected.len()))
        } else {
            None
        }
    }

    /// Advances by up to `n` bytes and returns the bytes skipped over.
    pub fn consume_n(&mut self, n: usize) -> &'buf [u8] {
        let start = self.pos.byte;
        self.by_ref().take(n).for_each(drop);

        &self.buf[start..self.pos.byte]
    }

    pub fn consume_while(&mut self, mut predicate: impl FnMut(&u8) -> bool) -> &'buf [u8] {
        let n = self
            .remaining()
            .iter()
            .take_while(|&c| predicate(c))
            .count();

        self.consume_n(n)
    }
}

impl<'buf> Iterator for Cursor<'buf> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let c = self.peek()?;

        self.prev_pos = Some(self.pos);
        self.pos.byte += 1;

        match c {
            // \r\n is a single line break: let the \n do the work
            b'\r' if self.peek() == Some(b'\n') => {}

            b'\n' | b'\r' => {
                self.pos.line += 1;
                self.pos.col = 1;
            }

            _ if is_continuation_byte(c) => {}
            _ => self.pos.col += 1,
        }

        Some(c)
    }
}
