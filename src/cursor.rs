/// Pull-based character source consumed by the scanners.
///
/// There is no lookahead, seeking or pushback. Once the source is exhausted,
/// [`CharCursor::next`] keeps returning `None` and [`CharCursor::more`] keeps
/// returning `false`.
pub trait CharCursor {
    /// Whether another character is available.
    fn more(&self) -> bool;

    /// Consume the next character, or `None` at end of input.
    fn next(&mut self) -> Option<char>;
}

/// Cursor over fully buffered UTF-8 text.
#[derive(Debug, Clone)]
pub struct StrCursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> StrCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Byte offset of the next character.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl CharCursor for StrCursor<'_> {
    #[inline]
    fn more(&self) -> bool {
        self.pos < self.source.len()
    }

    #[inline]
    fn next(&mut self) -> Option<char> {
        let ch = self.source[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}

/// Discard everything up to and including the next `\n`.
pub(crate) fn sweep_line<C: CharCursor + ?Sized>(cursor: &mut C) {
    while let Some(ch) = cursor.next() {
        if ch == '\n' {
            break;
        }
    }
}
