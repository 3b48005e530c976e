//! Scan, resolve, and load `.env` files.
//!
//! Input is read one character at a time by a key scanner and a value
//! scanner that together understand comments, `'...'`, `"..."`,
//! `` `...` ``, `'''` and `"""` heredocs, backslash escapes, and `${NAME}`
//! references. [`parse_str`] returns the pairs as scanned; [`finalize`] and
//! [`finalize_all`] then substitute references against the other pairs of the
//! same input, reporting cycles as [`Finalize::Circular`] instead of failing.
//!
//! [`EnvLoader::load`] is the safe default and writes into an in-memory map.
//! Convenience loaders (`dotenv`, `from_path`, `from_paths`, `from_filename`)
//! mutate the process environment and are `unsafe`, because callers must
//! guarantee no concurrent process-environment access.

mod buffer;
mod cursor;
mod env;
mod error;
mod key;
mod loader;
mod model;
mod reader;
mod resolver;
mod value;

pub use cursor::{CharCursor, StrCursor};
pub use env::TargetEnv;
pub use error::Error;
pub use loader::{EnvLoader, dotenv, from_filename, from_path, from_paths};
pub use model::{
    CircularPolicy, Entry, Finalize, LoadReport, Pair, QuoteMode, ReadResult, SubstitutionMode,
    Value, VariableReference,
};
pub use reader::{
    PairMap, PairReader, parse_bytes, parse_reader, parse_str, read_pair_map, read_pairs,
};
pub use resolver::{FinalizeReport, PairTable, finalize, finalize_all, parse_str_resolved};
