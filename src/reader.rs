use std::io::Read;

use indexmap::IndexMap;
use tracing::trace;

use crate::buffer::ScratchBuffer;
use crate::cursor::{CharCursor, StrCursor};
use crate::error::Error;
use crate::key::{finish_key, read_key};
use crate::model::{Pair, QuoteMode, ReadResult, Value};
use crate::value::read_value;

/// Pairs keyed by name, in input order. The first occurrence of a key wins.
pub type PairMap = IndexMap<String, Pair>;

/// Parse dotenv pairs from UTF-8 text. References are left unresolved.
pub fn parse_str(input: &str) -> Vec<Pair> {
    read_pairs(StrCursor::new(input))
}

/// Parse dotenv pairs from UTF-8 bytes, skipping a leading byte-order mark.
pub fn parse_bytes(input: &[u8]) -> Result<Vec<Pair>, Error> {
    let text = std::str::from_utf8(input)?;
    Ok(parse_str(strip_bom(text)))
}

/// Parse dotenv pairs from a reader.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Vec<Pair>, Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes(&buf)
}

/// Collect every pair the cursor yields, duplicates included.
pub fn read_pairs<C: CharCursor>(cursor: C) -> Vec<Pair> {
    PairReader::new(cursor).collect()
}

/// Collect pairs keyed by name. Later duplicates are still scanned, then dropped.
pub fn read_pair_map<C: CharCursor>(cursor: C) -> PairMap {
    let mut map = PairMap::new();
    for pair in PairReader::new(cursor) {
        if map.contains_key(pair.key()) {
            trace!(key = pair.key(), "dropping duplicate key");
            continue;
        }
        map.insert(pair.key.clone(), pair);
    }
    map
}

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Drives the key and value scanners over a cursor, one pair at a time.
///
/// A single scratch buffer is reused for every scan; only kept pairs copy
/// their text out of it. As an iterator it yields the kept pairs and stops at
/// end of input.
#[derive(Debug)]
pub struct PairReader<C> {
    cursor: C,
    scratch: ScratchBuffer,
    finished: bool,
}

impl<C: CharCursor> PairReader<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            scratch: ScratchBuffer::new(),
            finished: false,
        }
    }

    pub fn into_inner(self) -> C {
        self.cursor
    }

    /// Scan one key and its value.
    ///
    /// The pair is returned only for [`ReadResult::Success`] and
    /// [`ReadResult::EndOfStreamValue`]; every other outcome discards it.
    pub fn read_pair(&mut self) -> (ReadResult, Option<Pair>) {
        self.scratch.clear();
        let key_result = read_key(&mut self.cursor, &mut self.scratch);
        match key_result {
            ReadResult::Success | ReadResult::EndOfStreamValue => {}
            ReadResult::Empty => return (ReadResult::Fail, None),
            other => return (other, None),
        }

        let key = finish_key(&mut self.scratch);
        self.scratch.clear();

        let (result, value) = if key_result == ReadResult::EndOfStreamValue {
            let value = Value::new(String::new(), QuoteMode::Unquoted, Vec::new());
            (ReadResult::EndOfStreamValue, value)
        } else {
            let scanned = read_value(&mut self.cursor, &mut self.scratch);
            let result = match scanned.result {
                ReadResult::Success | ReadResult::CommentEncountered => ReadResult::Success,
                ReadResult::EndOfStreamValue => ReadResult::EndOfStreamValue,
                other => return (other, None),
            };
            let text = self.scratch.to_owned_string();
            (result, Value::new(text, scanned.quote, scanned.references))
        };

        if key.is_empty() {
            trace!("dropping pair with an empty key");
            return (ReadResult::Fail, None);
        }

        (result, Some(Pair { key, value }))
    }
}

impl<C: CharCursor> Iterator for PairReader<C> {
    type Item = Pair;

    fn next(&mut self) -> Option<Pair> {
        while !self.finished {
            let (result, pair) = self.read_pair();
            trace!(?result, key = pair.as_ref().map(Pair::key), "scanned pair");
            if matches!(
                result,
                ReadResult::EndOfStreamValue | ReadResult::EndOfStreamKey
            ) {
                self.finished = true;
            }
            if pair.is_some() {
                return pair;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn key_values(pairs: &[Pair]) -> Vec<(&str, &str)> {
        pairs.iter().map(|pair| (pair.key(), pair.value())).collect()
    }

    #[test]
    fn parses_basic_pairs_in_order() {
        let pairs = parse_str("a=bc\nb=cdd\nl=asff\nd=e");
        assert_eq!(
            key_values(&pairs),
            [("a", "bc"), ("b", "cdd"), ("l", "asff"), ("d", "e")]
        );
    }

    #[test]
    fn skips_comments_blank_and_malformed_lines() {
        let input = "# header\n\nA=1\nBAD LINE\n  # indented = comment\nB = 2 # trailing\n";
        let pairs = parse_str(input);
        assert_eq!(key_values(&pairs), [("A", "1"), ("B", "2")]);
    }

    #[test]
    fn empty_values_are_kept() {
        let pairs = parse_str("A=\nB=#comment\nC=");
        assert_eq!(key_values(&pairs), [("A", ""), ("B", ""), ("C", "")]);
    }

    #[test]
    fn keys_may_contain_spaces() {
        let pairs = parse_str("  abc dc  = ef\n");
        assert_eq!(key_values(&pairs), [("abc dc", "ef")]);
    }

    #[test]
    fn empty_keys_are_dropped() {
        let pairs = parse_str("=orphan\n  = also\nA=1\n");
        assert_eq!(key_values(&pairs), [("A", "1")]);
    }

    #[test]
    fn trailing_fragment_without_equals_is_dropped() {
        let pairs = parse_str("A=1\nDANGLING");
        assert_eq!(key_values(&pairs), [("A", "1")]);
    }

    #[test]
    fn sequence_keeps_duplicates() {
        let pairs = parse_str("A=1\nA=2\n");
        assert_eq!(key_values(&pairs), [("A", "1"), ("A", "2")]);
    }

    #[test]
    fn map_keeps_first_occurrence() {
        let map = read_pair_map(StrCursor::new("A=1\nB='''\nx\n'''\nA=2\nC=3\n"));
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["A", "B", "C"]);
        assert_eq!(map["A"].value(), "1");
        assert_eq!(map["B"].value(), "\nx\n");
        assert_eq!(map["C"].value(), "3");
    }

    #[test]
    fn duplicate_heredoc_is_consumed_before_being_dropped() {
        let map = read_pair_map(StrCursor::new("A=1\nA=\"\"\"\nB=inside\n\"\"\"\nC=3\n"));
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["A", "C"]);
    }

    #[test]
    fn multiline_values_do_not_leak_into_following_pairs() {
        let input = "MULTI=\"THIS\nIS\nA\nMULTILINE\"\nAFTER=after\n";
        let pairs = parse_str(input);
        assert_eq!(
            key_values(&pairs),
            [("MULTI", "THIS\nIS\nA\nMULTILINE"), ("AFTER", "after")]
        );
    }

    #[test]
    fn crlf_input_parses_like_lf() {
        let pairs = parse_str("A=1\r\nB = two \r\n");
        assert_eq!(key_values(&pairs), [("A", "1"), ("B", "two")]);
    }

    #[test]
    fn read_pair_reports_each_outcome() {
        let mut reader = PairReader::new(StrCursor::new("# c\nBAD\nA=1\nB="));
        assert_eq!(reader.read_pair().0, ReadResult::CommentEncountered);
        assert_eq!(reader.read_pair().0, ReadResult::Fail);

        let (result, pair) = reader.read_pair();
        assert_eq!(result, ReadResult::Success);
        assert_eq!(pair.map(|pair| pair.into_key_value()), Some(("A".to_owned(), "1".to_owned())));

        let (result, pair) = reader.read_pair();
        assert_eq!(result, ReadResult::EndOfStreamValue);
        assert_eq!(pair.as_ref().map(Pair::value), Some(""));

        assert_eq!(reader.read_pair().0, ReadResult::EndOfStreamKey);
    }

    #[test]
    fn parse_bytes_strips_bom() {
        let pairs = parse_bytes("\u{feff}A=1\n".as_bytes()).expect("parse should succeed");
        assert_eq!(key_values(&pairs), [("A", "1")]);
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let err = parse_bytes(&[b'A', b'=', 0xff]).expect_err("expected encoding error");
        assert!(matches!(err, Error::InvalidEncoding(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn parse_reader_reads_to_end() {
        let reader = std::io::Cursor::new("KEY=value\n");
        let pairs = parse_reader(reader).expect("parse should succeed");
        assert_eq!(key_values(&pairs), [("KEY", "value")]);
    }
}
