use crate::buffer::ScratchBuffer;
use crate::cursor::{CharCursor, sweep_line};
use crate::model::ReadResult;

/// Scan one key from the start of a line up to `=`.
///
/// Every `\r` and the spaces before the first key character are skipped.
/// Internal spaces are kept (`abc dc=ef` has the key `abc dc`); trailing
/// spaces stay in `buf` until [`finish_key`].
pub(crate) fn read_key<C: CharCursor + ?Sized>(
    cursor: &mut C,
    buf: &mut ScratchBuffer,
) -> ReadResult {
    if !cursor.more() {
        return ReadResult::EndOfStreamKey;
    }

    while let Some(ch) = cursor.next() {
        match ch {
            '#' => {
                sweep_line(cursor);
                return ReadResult::CommentEncountered;
            }
            '=' if cursor.more() => return ReadResult::Success,
            '=' => return ReadResult::EndOfStreamValue,
            '\n' => return ReadResult::Fail,
            '\r' => {}
            ' ' if buf.is_empty() => {}
            _ => buf.push(ch),
        }
    }

    ReadResult::EndOfStreamKey
}

/// Materialize the scanned key without the spaces that preceded `=`.
pub(crate) fn finish_key(buf: &mut ScratchBuffer) -> String {
    buf.trim_end_spaces();
    buf.to_owned_string()
}
