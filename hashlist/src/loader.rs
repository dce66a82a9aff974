//! Loading hash lists from disk.
//!
//! Binary lists are mapped read-only and indexed in place. Text lists (one
//! hex digest per line) are parsed into memory, sorted, and then indexed.

use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use memmap2::Mmap;
use tracing::{info, warn};

use crate::algorithm::Algorithm;
use crate::error::Error;
use crate::index::{DigestIndex, IndexOptions, Records};

impl DigestIndex {
    /// Maps a sorted binary hash list of `algorithm` digests and indexes it.
    pub fn open(
        path: impl AsRef<Path>,
        algorithm: Algorithm,
        options: IndexOptions,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let digest_len = algorithm.digest_len();

        let file =
            File::open(path).map_err(|source| Error::Open { path: path.to_path_buf(), source })?;
        let size = file
            .metadata()
            .map_err(|source| Error::Open { path: path.to_path_buf(), source })?
            .len();

        if size % digest_len as u64 != 0 {
            return Err(Error::SizeMismatch { size, digest_len });
        }

        // Zero-length mappings are rejected on some platforms.
        if size == 0 {
            return Self::new(Records::Owned(Vec::new()), digest_len, options);
        }

        // SAFETY: the mapping is read-only and lives as long as the index. The
        // file must not be truncated or rewritten while the index is in use.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|source| Error::Map { path: path.to_path_buf(), source })?;
        advise(&map);

        info!(
            path = %path.display(),
            %algorithm,
            records = size / digest_len as u64,
            "mapped hash file"
        );

        Self::new(Records::Mapped(map), digest_len, options)
    }

    /// Parses a text hash list, one hex digest per line.
    ///
    /// Blank lines are skipped and surrounding whitespace is ignored. Without
    /// an explicit `algorithm` it is detected from the length of the first
    /// digest. Returns the index together with the algorithm it was built
    /// for.
    pub fn from_hex_lines<R: BufRead>(
        reader: R,
        algorithm: Option<Algorithm>,
        options: IndexOptions,
    ) -> Result<(Self, Algorithm), Error> {
        let mut algorithm = algorithm;
        let mut records = Vec::new();

        // Lines are taken as bytes so a stray non-UTF-8 line reports as bad hex.
        for (i, line) in reader.split(b'\n').enumerate() {
            let line_no = i + 1;
            let line = line?;
            let text = line.trim_ascii();
            if text.is_empty() {
                continue;
            }

            let digest =
                hex::decode(text).map_err(|source| Error::InvalidHex { line: line_no, source })?;

            let expected = match algorithm {
                Some(a) => a.digest_len(),
                None => {
                    let detected = Algorithm::from_digest_len(digest.len()).ok_or_else(|| {
                        Error::UndetectableAlgorithm { line: line_no, len: digest.len() }
                    })?;
                    info!(algorithm = %detected, "detected hash algorithm");
                    algorithm = Some(detected);
                    detected.digest_len()
                }
            };

            if digest.len() != expected {
                return Err(Error::InconsistentLength {
                    line: line_no,
                    expected,
                    found: digest.len(),
                });
            }
            records.extend_from_slice(&digest);
        }

        // An empty list carries no length to detect from; callers that care
        // pass the algorithm explicitly.
        let algorithm = algorithm.unwrap_or(Algorithm::Sha1);
        let index = Self::from_unsorted(records, algorithm.digest_len(), options)?;
        info!(records = index.len(), %algorithm, "loaded text hash list");
        Ok((index, algorithm))
    }

    /// Opens `path` and parses it with [`DigestIndex::from_hex_lines`].
    pub fn open_hex(
        path: impl AsRef<Path>,
        algorithm: Option<Algorithm>,
        options: IndexOptions,
    ) -> Result<(Self, Algorithm), Error> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|source| Error::Open { path: path.to_path_buf(), source })?;
        Self::from_hex_lines(std::io::BufReader::new(file), algorithm, options)
    }
}

/// Lookups jump around the whole file, so readahead is wasted; asking for the
/// pages up front is not.
#[cfg(unix)]
fn advise(map: &Mmap) {
    use memmap2::Advice;

    for advice in [Advice::Random, Advice::WillNeed] {
        if let Err(e) = map.advise(advice) {
            warn!(error = %e, "madvise failed");
        }
    }
}

#[cfg(not(unix))]
fn advise(_map: &Mmap) {}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use hex_literal::hex;

    use super::*;
    use crate::LookupTier;
    use crate::error::ErrorKind;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_binary_list() {
        let mut records = vec![
            Algorithm::Md5.hash(b"password"),
            Algorithm::Md5.hash(b"letmein"),
            Algorithm::Md5.hash(b"hunter2"),
        ];
        records.sort();
        let file = write_temp(&records.concat());

        let index =
            DigestIndex::open(file.path(), Algorithm::Md5, IndexOptions::default()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.tier(), LookupTier::Linear);
        assert!(index.contains(&hex!("5f4dcc3b5aa765d61d8327deb882cf99")));
        assert!(!index.contains(&Algorithm::Md5.hash(b"trustno1")));
    }

    #[test]
    fn test_open_size_mismatch() {
        let file = write_temp(&[0u8; 30]);
        let err = DigestIndex::open(file.path(), Algorithm::Sha1, IndexOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::SizeMismatch { size: 30, digest_len: 20 }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DigestIndex::open(
            dir.path().join("absent.bin"),
            Algorithm::Sha1,
            IndexOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Open { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_open_empty_file() {
        let file = write_temp(&[]);
        let index =
            DigestIndex::open(file.path(), Algorithm::Sha256, IndexOptions::default()).unwrap();
        assert!(index.is_empty());
        assert!(!index.contains(&[0u8; 32]));
    }

    #[test]
    fn test_hex_lines_detects_algorithm_and_sorts() {
        let text = "\
5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8
  CBFDAC6008F9CAB4083784CBD1874F76618D2A97

5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8
";
        let (index, algorithm) =
            DigestIndex::from_hex_lines(Cursor::new(text), None, IndexOptions::default()).unwrap();
        assert_eq!(algorithm, Algorithm::Sha1);
        assert_eq!(index.len(), 2);
        assert!(index.contains(&Algorithm::Sha1.hash(b"password")));
        assert!(index.contains(&Algorithm::Sha1.hash(b"password123")));
        assert!(index.get(0).unwrap() < index.get(1).unwrap());
    }

    #[test]
    fn test_hex_lines_inconsistent_length() {
        let text = "5f4dcc3b5aa765d61d8327deb882cf99\n5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8\n";
        let err = DigestIndex::from_hex_lines(Cursor::new(text), None, IndexOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::InconsistentLength { line: 2, expected: 16, found: 20 }));
    }

    #[test]
    fn test_hex_lines_respects_explicit_algorithm() {
        let text = "5f4dcc3b5aa765d61d8327deb882cf99\n";
        let err = DigestIndex::from_hex_lines(
            Cursor::new(text),
            Some(Algorithm::Sha256),
            IndexOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::InconsistentLength { line: 1, expected: 32, found: 16 }));
    }

    #[test]
    fn test_hex_lines_invalid() {
        let err = DigestIndex::from_hex_lines(
            Cursor::new("not a digest\n"),
            None,
            IndexOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidHex { line: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Format);

        let err =
            DigestIndex::from_hex_lines(Cursor::new("abcdef\n"), None, IndexOptions::default())
                .err()
                .unwrap();
        assert!(matches!(err, Error::UndetectableAlgorithm { line: 1, len: 3 }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_hex_lines_non_utf8_is_format_error() {
        let mut text = b"5f4dcc3b5aa765d61d8327deb882cf99\r\n".to_vec();
        text.extend_from_slice(&[0xFF, 0xFE, b'a', b'b', b'\n']);
        let err = DigestIndex::from_hex_lines(Cursor::new(text), None, IndexOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidHex { line: 2, .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
