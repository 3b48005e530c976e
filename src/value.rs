use crate::buffer::ScratchBuffer;
use crate::cursor::{CharCursor, sweep_line};
use crate::model::{QuoteMode, ReadResult, VariableReference};

/// Result of scanning one value. The decoded text stays in the scratch buffer.
#[derive(Debug)]
pub(crate) struct ScannedValue {
    pub(crate) result: ReadResult,
    pub(crate) quote: QuoteMode,
    pub(crate) references: Vec<VariableReference>,
}

/// Scan a value from just after `=` to the end of its line (or heredoc).
pub(crate) fn read_value<C: CharCursor + ?Sized>(
    cursor: &mut C,
    buf: &mut ScratchBuffer,
) -> ScannedValue {
    let mut scanner = ValueScanner::new(buf);
    let mut stop = None;
    let mut last = None;

    while let Some(ch) = cursor.next() {
        last = Some(ch);
        if let Step::Stop(reason) = scanner.step(ch) {
            stop = Some(reason);
            break;
        }
    }

    let (quote, references) = scanner.finish();

    let sweep = match stop {
        Some(Stop::Comment) => true,
        Some(Stop::Closed) => last != Some('\n'),
        Some(Stop::LineEnd) | None => false,
    };
    if sweep {
        sweep_line(cursor);
    }

    let result = if cursor.more() {
        ReadResult::Success
    } else {
        ReadResult::EndOfStreamValue
    };

    ScannedValue {
        result,
        quote,
        references,
    }
}

enum Step {
    Continue,
    Stop(Stop),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Unquoted newline, already consumed.
    LineEnd,
    /// Unquoted `#`; the rest of the line is garbage.
    Comment,
    /// Closing quote seen; the character that revealed it was consumed.
    Closed,
}

/// `${` seen, `}` not yet.
#[derive(Debug, Clone, Copy)]
struct OpenReference {
    dollar: usize,
    open_brace: usize,
}

struct ValueScanner<'b> {
    buf: &'b mut ScratchBuffer,
    /// `None` until the leading characters decide the quoting.
    mode: Option<QuoteMode>,
    backslashes: usize,
    single_quotes: usize,
    double_quotes: usize,
    escaped_dollar: Option<usize>,
    open: Option<OpenReference>,
    references: Vec<VariableReference>,
}

impl<'b> ValueScanner<'b> {
    fn new(buf: &'b mut ScratchBuffer) -> Self {
        Self {
            buf,
            mode: None,
            backslashes: 0,
            single_quotes: 0,
            double_quotes: 0,
            escaped_dollar: None,
            open: None,
            references: Vec::new(),
        }
    }

    fn is_literal(&self) -> bool {
        self.mode.is_some_and(QuoteMode::is_literal)
    }

    fn counts_single_quotes(&self) -> bool {
        matches!(
            self.mode,
            None | Some(QuoteMode::Single | QuoteMode::HeredocSingle)
        )
    }

    fn counts_double_quotes(&self) -> bool {
        matches!(
            self.mode,
            None | Some(QuoteMode::Double | QuoteMode::HeredocDouble)
        )
    }

    fn step(&mut self, ch: char) -> Step {
        let mut escaped = false;
        if self.backslashes > 0 && ch != '\\' {
            self.flush_backslash_pairs();
            if self.backslashes == 1 {
                self.backslashes = 0;
                if let Some(decoded) = control_character(ch) {
                    self.buf.push(decoded);
                    return Step::Continue;
                }
                self.buf.push('\\');
                escaped = true;
            }
        }

        if self.single_quotes > 0 && ch != '\'' && self.walk_single_quotes() {
            return Step::Stop(Stop::Closed);
        }
        if self.double_quotes > 0 && ch != '"' && self.walk_double_quotes() {
            return Step::Stop(Stop::Closed);
        }

        if self.buf.is_empty() {
            match (ch, self.mode) {
                (' ', None | Some(QuoteMode::Unquoted)) => return Step::Continue,
                ('`', Some(QuoteMode::Backtick)) => return Step::Stop(Stop::Closed),
                ('`', None) => {
                    self.mode = Some(QuoteMode::Backtick);
                    return Step::Continue;
                }
                ('#', None) => return Step::Stop(Stop::Comment),
                ('"' | '\'', _) => {}
                (_, None) => self.mode = Some(QuoteMode::Unquoted),
                _ => {}
            }
        }

        match ch {
            '`' if !escaped && self.mode == Some(QuoteMode::Backtick) => {
                return Step::Stop(Stop::Closed);
            }
            '#' if !escaped && self.mode == Some(QuoteMode::Unquoted) => {
                return Step::Stop(Stop::Comment);
            }
            '\n' if !self.mode.is_some_and(QuoteMode::spans_lines) => {
                if self.buf.ends_with('\r') {
                    self.buf.pop();
                }
                return Step::Stop(Stop::LineEnd);
            }
            '\\' if !self.is_literal() => self.backslashes += 1,
            '{' => {
                self.buf.push(ch);
                if !escaped && !self.is_literal() && self.open.is_none() {
                    self.open_variable();
                }
            }
            '}' => {
                self.buf.push(ch);
                if !escaped {
                    self.close_variable();
                }
            }
            '\'' if self.counts_single_quotes() => self.single_quotes += 1,
            '"' if self.counts_double_quotes() => self.double_quotes += 1,
            '$' => {
                if escaped {
                    self.escaped_dollar = Some(self.buf.len());
                }
                self.buf.push(ch);
            }
            _ => self.buf.push(ch),
        }
        Step::Continue
    }

    fn flush_backslash_pairs(&mut self) {
        let pairs = self.backslashes / 2;
        self.buf.push_repeated('\\', pairs);
        self.backslashes -= pairs * 2;
    }

    fn walk_single_quotes(&mut self) -> bool {
        let run = std::mem::take(&mut self.single_quotes);
        self.walk_quote_run('\'', run, QuoteMode::Single, QuoteMode::HeredocSingle)
    }

    fn walk_double_quotes(&mut self) -> bool {
        let run = std::mem::take(&mut self.double_quotes);
        self.walk_quote_run('"', run, QuoteMode::Double, QuoteMode::HeredocDouble)
    }

    /// Apply a finished run of `run` identical quotes. Returns `true` when the
    /// run closes the value.
    fn walk_quote_run(
        &mut self,
        quote: char,
        run: usize,
        simple: QuoteMode,
        heredoc: QuoteMode,
    ) -> bool {
        if self.mode.is_none() && self.buf.is_empty() {
            return match run {
                1 => {
                    self.mode = Some(simple);
                    false
                }
                2 => {
                    self.mode = Some(simple);
                    true
                }
                3 => {
                    self.mode = Some(heredoc);
                    false
                }
                4 | 5 => {
                    self.mode = Some(heredoc);
                    self.buf.push_repeated(quote, run - 3);
                    false
                }
                _ => {
                    // An empty heredoc followed by stray quotes.
                    self.mode = Some(heredoc);
                    true
                }
            };
        }

        if self.mode == Some(simple) {
            return true;
        }
        if self.mode == Some(heredoc) && run >= 3 {
            return true;
        }

        self.buf.push_repeated(quote, run);
        false
    }

    fn open_variable(&mut self) {
        let open_brace = self.buf.len() - 1;
        if let Some(dollar) = self.dollar_before(open_brace) {
            self.open = Some(OpenReference { dollar, open_brace });
        }
    }

    /// Position of the unescaped `$` right before `idx`, spaces skipped.
    fn dollar_before(&self, idx: usize) -> Option<usize> {
        let mut idx = idx;
        while idx > 0 {
            idx -= 1;
            match self.buf.byte_at(idx)? {
                b' ' => continue,
                b'$' if self.escaped_dollar != Some(idx) => return Some(idx),
                _ => return None,
            }
        }
        None
    }

    fn close_variable(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        let close_brace = self.buf.len() - 1;
        let name_start = open.open_brace + 1;
        let name = self.buf.as_str()[name_start..close_brace]
            .trim_matches(' ')
            .to_owned();
        self.references.push(VariableReference {
            dollar: open.dollar,
            open_brace: open.open_brace,
            name_start,
            name_end: close_brace,
            close_brace,
            name,
        });
    }

    /// Settle pending streaks once input stops. An unclosed `${` is dropped
    /// and its text stays literal.
    fn finish(mut self) -> (QuoteMode, Vec<VariableReference>) {
        if self.backslashes > 0 {
            self.flush_backslash_pairs();
            if self.backslashes == 1 {
                self.buf.push('\\');
                self.backslashes = 0;
            }
        }
        if self.single_quotes > 0 {
            self.walk_single_quotes();
        }
        if self.double_quotes > 0 {
            self.walk_double_quotes();
        }

        let quote = self.mode.unwrap_or_default();
        if quote == QuoteMode::Unquoted {
            self.buf.trim_end_spaces();
        }
        (quote, self.references)
    }
}

fn control_character(ch: char) -> Option<char> {
    let decoded = match ch {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        '"' => '"',
        '\'' => '\'',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        'a' => '\u{7}',
        _ => return None,
    };
    Some(decoded)
}
