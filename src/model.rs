use std::ops::Range;
use std::path::PathBuf;

/// Outcome of scanning a key, a value, or a whole pair.
///
/// None of these are fatal: the collector discards or keeps the pair and
/// decides whether to keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// Scanned up to a terminator and more input follows.
    Success,
    /// A helper found nothing to work with.
    Empty,
    /// Structurally invalid line, e.g. a newline inside a key.
    Fail,
    /// An unquoted `#` started a comment; the rest of the line was discarded.
    CommentEncountered,
    /// Input ended before a key was complete.
    EndOfStreamKey,
    /// Input ended while (or right before) scanning a value.
    EndOfStreamValue,
}

/// Outcome of resolving one pair's `${...}` references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalize {
    /// At least one reference was walked.
    Interpolated,
    /// Nothing to do: no references, or already resolved.
    Copied,
    /// A reference cycle was found.
    Circular,
}

/// How a value was quoted in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// No leading quote. Decoded like `"..."` with both ends space-trimmed
    /// and `#` starting a comment.
    #[default]
    Unquoted,
    /// `'...'`, literal.
    Single,
    /// `"..."`
    Double,
    /// `` `...` ``
    Backtick,
    /// `'''...'''`, literal, may span lines.
    HeredocSingle,
    /// `"""..."""`, may span lines.
    HeredocDouble,
}

impl QuoteMode {
    /// Single-quoted content skips escape decoding and interpolation.
    pub fn is_literal(self) -> bool {
        matches!(self, Self::Single | Self::HeredocSingle)
    }

    pub fn is_heredoc(self) -> bool {
        matches!(self, Self::HeredocSingle | Self::HeredocDouble)
    }

    /// Modes that carry a raw newline as content instead of ending the value.
    pub(crate) fn spans_lines(self) -> bool {
        matches!(
            self,
            Self::Double | Self::Backtick | Self::HeredocSingle | Self::HeredocDouble
        )
    }
}

/// A closed `${name}` occurrence inside a scanned value.
///
/// Offsets are byte positions in the value text as scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    pub(crate) dollar: usize,
    pub(crate) open_brace: usize,
    pub(crate) name_start: usize,
    pub(crate) name_end: usize,
    pub(crate) close_brace: usize,
    pub(crate) name: String,
}

impl VariableReference {
    /// Variable name with surrounding spaces trimmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte range from `$` through the closing `}`.
    pub fn span(&self) -> Range<usize> {
        self.dollar..self.close_brace + 1
    }

    pub fn open_brace(&self) -> usize {
        self.open_brace
    }

    /// Byte range between the braces, before trimming.
    pub fn raw_name(&self) -> Range<usize> {
        self.name_start..self.name_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ResolveState {
    #[default]
    Pending,
    Resolved,
    Circular,
}

/// Decoded value plus the references found while scanning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub(crate) text: String,
    pub(crate) quote: QuoteMode,
    pub(crate) references: Vec<VariableReference>,
    pub(crate) state: ResolveState,
}

impl Value {
    pub(crate) fn new(text: String, quote: QuoteMode, references: Vec<VariableReference>) -> Self {
        Self {
            text,
            quote,
            references,
            state: ResolveState::Pending,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn quote_mode(&self) -> QuoteMode {
        self.quote
    }

    /// Closed references in order of appearance.
    pub fn references(&self) -> &[VariableReference] {
        &self.references
    }

    pub fn is_resolved(&self) -> bool {
        self.state == ResolveState::Resolved
    }

    pub fn is_circular(&self) -> bool {
        self.state == ResolveState::Circular
    }
}

/// One `KEY=VALUE` entry as scanned from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub(crate) key: String,
    pub(crate) value: Value,
}

impl Pair {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    pub fn raw_value(&self) -> &Value {
        &self.value
    }

    pub fn into_key_value(self) -> (String, String) {
        (self.key, self.value.text)
    }
}

/// A resolved `KEY=VALUE` entry, tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub source: Option<PathBuf>,
}

/// Summary of the load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_existing: usize,
    /// Entries dropped because an earlier entry of this load had the same key.
    pub duplicates: usize,
    /// Entries whose references formed a cycle.
    pub circular: usize,
    pub files_read: usize,
}

/// Variable expansion behavior for loader values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionMode {
    /// Keep values as scanned, `${...}` included.
    Disabled,
    /// Resolve `${VAR}` references against pairs of the same file.
    #[default]
    Expand,
}

/// What the loader does when a reference cycle is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircularPolicy {
    /// Log a warning and keep the partially substituted value.
    #[default]
    KeepPartial,
    /// Abort the load with [`crate::Error::CircularReference`].
    Error,
}
