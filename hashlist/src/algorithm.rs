use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::Error;

/// Largest digest length of any supported algorithm (SHA-512).
pub const MAX_DIGEST_LEN: usize = 64;

/// Hash algorithms a hash list can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
    ];

    /// Length in bytes of one digest, and therefore of one hash list record.
    #[inline]
    pub const fn digest_len(self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Guesses the algorithm from a digest length. Every supported algorithm
    /// has a distinct length, so the guess is unambiguous.
    pub fn from_digest_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.digest_len() == len)
    }

    /// Hashes `data` and writes the digest into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len()` is not [`Algorithm::digest_len`].
    #[inline]
    pub fn hash_into(self, data: &[u8], out: &mut [u8]) {
        match self {
            Algorithm::Md5 => out.copy_from_slice(&Md5::digest(data)),
            Algorithm::Sha1 => out.copy_from_slice(&Sha1::digest(data)),
            Algorithm::Sha256 => out.copy_from_slice(&Sha256::digest(data)),
            Algorithm::Sha384 => out.copy_from_slice(&Sha384::digest(data)),
            Algorithm::Sha512 => out.copy_from_slice(&Sha512::digest(data)),
        }
    }

    /// Convenience wrapper around [`Algorithm::hash_into`] that allocates.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; self.digest_len()];
        self.hash_into(data, &mut out);
        out
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" | "sha-1" => Ok(Algorithm::Sha1),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            "sha384" | "sha-384" => Ok(Algorithm::Sha384),
            "sha512" | "sha-512" => Ok(Algorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(Algorithm::Md5.hash(b"password"), hex!("5f4dcc3b5aa765d61d8327deb882cf99"));
        assert_eq!(
            Algorithm::Sha1.hash(b"password"),
            hex!("5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8")
        );
        assert_eq!(
            Algorithm::Sha1.hash(b"password123"),
            hex!("CBFDAC6008F9CAB4083784CBD1874F76618D2A97")
        );
        assert_eq!(
            Algorithm::Sha256.hash(b"hello world"),
            hex!("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
        assert_eq!(
            Algorithm::Sha384.hash(b""),
            hex!(
                "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da"
                "274edebfe76f65fbd51ad2f14898b95b"
            )
        );
        assert_eq!(
            Algorithm::Sha512.hash(b""),
            hex!(
                "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce"
                "47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
            )
        );
    }

    #[test]
    fn test_digest_len_matches_output() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.hash(b"abc").len(), algorithm.digest_len());
            assert!(algorithm.digest_len() <= MAX_DIGEST_LEN);
        }
    }

    #[test]
    fn test_from_digest_len() {
        assert_eq!(Algorithm::from_digest_len(16), Some(Algorithm::Md5));
        assert_eq!(Algorithm::from_digest_len(20), Some(Algorithm::Sha1));
        assert_eq!(Algorithm::from_digest_len(32), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_digest_len(48), Some(Algorithm::Sha384));
        assert_eq!(Algorithm::from_digest_len(64), Some(Algorithm::Sha512));
        assert_eq!(Algorithm::from_digest_len(28), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("MD5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
        assert_eq!("sha-256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert!(matches!(
            "whirlpool".parse::<Algorithm>(),
            Err(Error::UnsupportedAlgorithm { .. })
        ));
    }
}
