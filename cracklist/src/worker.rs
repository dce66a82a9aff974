use std::sync::Arc;
use std::time::{Duration, Instant};

use hashlist::{Algorithm, DigestIndex, MAX_DIGEST_LEN};
use tracing::debug;

use crate::cache::Dequeue;
use crate::output::Match;
use crate::pipeline::{Event, Shared};
use crate::progress::Pulse;
use crate::reader::WorkBlock;

/// How long a worker waits on an empty cache before yielding its dispatcher.
pub const BACKOFF: Duration = Duration::from_millis(1);

/// Per-thread hashing state.
#[derive(Debug)]
pub struct CrackWorker {
    id: usize,
    digest: [u8; MAX_DIGEST_LEN],
    len: usize,
}

impl CrackWorker {
    pub fn new(id: usize, algorithm: Algorithm) -> Self {
        Self { id, digest: [0; MAX_DIGEST_LEN], len: algorithm.digest_len() }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Hashes every candidate in `block` and collects those found in `index`,
    /// in block order. `is_new` is asked once per hit and can veto digests
    /// that were already reported.
    pub fn crack_block(
        &mut self,
        block: &WorkBlock,
        algorithm: Algorithm,
        index: &DigestIndex,
        mut is_new: impl FnMut(&[u8]) -> bool,
    ) -> Vec<Match> {
        debug_assert_eq!(algorithm.digest_len(), self.len);
        let digest = &mut self.digest[..self.len];
        let mut matches = Vec::new();
        for candidate in block.iter() {
            algorithm.hash_into(candidate, digest);
            if index.contains(digest) && is_new(digest) {
                matches.push(Match { digest: digest.to_vec(), candidate: candidate.to_vec() });
            }
        }
        matches
    }
}

/// One iteration of a pooled worker: crack at most one block, report to the
/// coordinator, then post the next iteration to the same dispatcher.
pub(crate) fn step(shared: Arc<Shared>, mut worker: CrackWorker) {
    let block = match shared.cache.dequeue(BACKOFF) {
        Dequeue::Block(block) => block,
        Dequeue::Empty => return repost(shared, worker),
        Dequeue::Exhausted => {
            debug!(worker = worker.id, "input drained, worker finished");
            let _ = shared.events.send(Event::WorkerFinished(worker.id));
            return;
        }
    };

    let started = Instant::now();
    let matches = worker.crack_block(&block, shared.algorithm, &shared.index, |digest| {
        shared.dedup.as_ref().is_none_or(|set| set.check_and_add(digest))
    });
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if !matches.is_empty() {
        let _ = shared.events.send(Event::Matches(matches));
    }
    let _ = shared.events.send(Event::Pulse(Pulse {
        worker: worker.id,
        elapsed_ms,
        attempted: block.len() as u64,
        last_attempted: block.last().unwrap_or_default().to_vec(),
    }));

    shared.cache.recycle(block);
    repost(shared, worker);
}

fn repost(shared: Arc<Shared>, worker: CrackWorker) {
    let next = Arc::clone(&shared);
    shared.pool.get(worker.id).post(move || step(next, worker));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::SortedDigests;
    use hashlist::IndexOptions;

    fn index_of(words: &[&str]) -> DigestIndex {
        index_with(Algorithm::Md5, words)
    }

    fn index_with(algorithm: Algorithm, words: &[&str]) -> DigestIndex {
        let bytes: Vec<u8> = words.iter().flat_map(|w| algorithm.hash(w.as_bytes())).collect();
        DigestIndex::from_unsorted(bytes, algorithm.digest_len(), IndexOptions::default()).unwrap()
    }

    fn block_of(words: &[&str]) -> WorkBlock {
        let mut block = WorkBlock::default();
        for word in words {
            block.push(word.as_bytes());
        }
        block
    }

    #[test]
    fn test_crack_block_keeps_block_order() {
        let index = index_of(&["zebra", "apple", "mango"]);
        let block = block_of(&["mango", "kiwi", "apple", "zebra"]);
        let mut worker = CrackWorker::new(0, Algorithm::Md5);

        let matches = worker.crack_block(&block, Algorithm::Md5, &index, |_| true);
        let found: Vec<&[u8]> = matches.iter().map(|m| m.candidate.as_slice()).collect();
        assert_eq!(found, [&b"mango"[..], b"apple", b"zebra"]);
        assert_eq!(matches[0].digest, Algorithm::Md5.hash(b"mango"));
    }

    #[test]
    fn test_crack_block_dedup_veto() {
        let index = index_of(&["apple"]);
        // Non-adjacent repeats survive the reader, so dedup has to catch them.
        let block = block_of(&["apple", "pear", "apple"]);
        let mut worker = CrackWorker::new(3, Algorithm::Md5);
        assert_eq!(worker.id(), 3);

        let mut seen = SortedDigests::new(16);
        let matches = worker.crack_block(&block, Algorithm::Md5, &index, |d| seen.insert(d));
        assert_eq!(matches.len(), 1);

        let again = worker.crack_block(&block, Algorithm::Md5, &index, |_| true);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn test_digest_buffer_fits_every_algorithm() {
        let block = block_of(&["kiwi", "letmein"]);
        for algorithm in [Algorithm::Sha512, Algorithm::Md5, Algorithm::Sha384] {
            let index = index_with(algorithm, &["letmein"]);
            let mut worker = CrackWorker::new(1, algorithm);

            let matches = worker.crack_block(&block, algorithm, &index, |_| true);
            assert_eq!(matches.len(), 1, "{algorithm}");
            assert_eq!(matches[0].candidate, b"letmein");
            assert_eq!(matches[0].digest, algorithm.hash(b"letmein"));
            assert_eq!(matches[0].digest.len(), algorithm.digest_len());
        }
    }

    #[test]
    fn test_empty_block() {
        let index = index_of(&["apple"]);
        let mut worker = CrackWorker::new(0, Algorithm::Md5);
        let matches = worker.crack_block(&WorkBlock::default(), Algorithm::Md5, &index, |_| true);
        assert!(matches.is_empty());
    }
}
