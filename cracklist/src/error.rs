use std::path::PathBuf;

use hashlist::Algorithm;

pub use hashlist::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no hash file specified")]
    MissingHashFile,

    #[error("binary hash list with no algorithm; pass --algorithm")]
    MissingAlgorithm,

    #[error("{name} must be greater than zero")]
    ZeroSize { name: &'static str },

    #[error("{algorithm} digests are {expected} bytes but hash list records are {found}")]
    AlgorithmMismatch { algorithm: Algorithm, expected: usize, found: usize },

    #[error("wordlist file '{path}' does not exist")]
    WordlistNotFound { path: PathBuf },

    #[error("wordlist '{path}' is not a regular file")]
    WordlistNotAFile { path: PathBuf },

    #[error("unable to open {what} '{path}': {source}")]
    Open {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    HashList(#[from] hashlist::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal error class, as reported before the pipeline starts.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingHashFile
            | Error::MissingAlgorithm
            | Error::ZeroSize { .. }
            | Error::AlgorithmMismatch { .. } => ErrorKind::Configuration,
            Error::WordlistNotFound { .. }
            | Error::WordlistNotAFile { .. }
            | Error::Open { .. }
            | Error::Io(_) => ErrorKind::Io,
            Error::HashList(e) => e.kind(),
        }
    }
}
