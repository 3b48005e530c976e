use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
    #[error("circular variable reference in `{key}` ({})", .path.display())]
    CircularReference { key: String, path: PathBuf },
}
