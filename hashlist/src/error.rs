use std::path::PathBuf;

/// Broad class of a failure, used by callers to decide how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something that cannot work (bad algorithm name).
    Configuration,
    /// The hash list could not be opened, read or mapped.
    Io,
    /// The hash list's contents do not fit the expected record layout.
    Format,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to open hash file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to map hash file '{path}': {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("length of hash file ({size} bytes) is not a multiple of the {digest_len}-byte digest")]
    SizeMismatch { size: u64, digest_len: usize },

    #[error("line {line}: invalid hex digest: {source}")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("line {line}: expected a {expected}-byte digest, found {found} bytes")]
    InconsistentLength { line: usize, expected: usize, found: usize },

    #[error("line {line}: no supported algorithm produces {len}-byte digests")]
    UndetectableAlgorithm { line: usize, len: usize },

    #[error("unsupported hash algorithm '{name}' (expected md5, sha1, sha256, sha384 or sha512)")]
    UnsupportedAlgorithm { name: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Open { .. } | Error::Map { .. } | Error::Io(_) => ErrorKind::Io,
            Error::SizeMismatch { .. }
            | Error::InvalidHex { .. }
            | Error::InconsistentLength { .. }
            | Error::UndetectableAlgorithm { .. } => ErrorKind::Format,
            Error::UnsupportedAlgorithm { .. } => ErrorKind::Configuration,
        }
    }
}
