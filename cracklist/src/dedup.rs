use hashlist::search_records;
use parking_lot::RwLock;

/// A growable, always-sorted run of digests.
#[derive(Debug)]
pub struct SortedDigests {
    digest_len: usize,
    buf: Vec<u8>,
}

impl SortedDigests {
    pub fn new(digest_len: usize) -> Self {
        Self { digest_len, buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len() / self.digest_len
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn contains(&self, digest: &[u8]) -> bool {
        digest.len() == self.digest_len
            && search_records(&self.buf, self.digest_len, digest).is_ok()
    }

    /// Inserts `digest` at its sorted position. Returns false if it was
    /// already present.
    pub fn insert(&mut self, digest: &[u8]) -> bool {
        debug_assert_eq!(digest.len(), self.digest_len);
        match search_records(&self.buf, self.digest_len, digest) {
            Ok(_) => false,
            Err(index) => {
                let at = index * self.digest_len;
                self.buf.splice(at..at, digest.iter().copied());
                true
            }
        }
    }
}

/// Digests already reported, shared between workers.
///
/// Lookups take the shared lock; only a digest that looks new takes the
/// exclusive lock, where it is checked again before insertion.
#[derive(Debug)]
pub struct DedupSet {
    inner: RwLock<SortedDigests>,
}

impl DedupSet {
    pub fn new(digest_len: usize) -> Self {
        Self { inner: RwLock::new(SortedDigests::new(digest_len)) }
    }

    pub fn contains(&self, digest: &[u8]) -> bool {
        self.inner.read().contains(digest)
    }

    /// Returns true if `digest` was not yet reported and is now recorded.
    pub fn check_and_add(&self, digest: &[u8]) -> bool {
        if self.inner.read().contains(digest) {
            return false;
        }
        self.inner.write().insert(digest)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
