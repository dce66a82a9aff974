use std::ops::Deref;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::error::Error;
use crate::{BUCKET_COUNT, binary_search_records, linear_search_records, prefix16};

/// Lists with at most this many records are scanned linearly.
pub const LINEAR_THRESHOLD: usize = 512;

/// Lists with at least this many records get a bucket table.
pub const FAST_THRESHOLD: usize = 65536 * 4;

/// Distance in records between two samples of the sparse indexing pass.
pub const SAMPLE_STRIDE: usize = 256;

/// Read-only backing store of a hash list.
pub enum Records {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Records {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        match self {
            Records::Mapped(map) => &map[..],
            Records::Owned(buf) => buf.as_slice(),
        }
    }
}

/// How lookups are answered for a list of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTier {
    Linear,
    Binary,
    Bucketed,
}

/// Size thresholds selecting the lookup tier, and the sampling stride used
/// when building the bucket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub linear_threshold: usize,
    pub fast_threshold: usize,
    pub sample_stride: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            linear_threshold: LINEAR_THRESHOLD,
            fast_threshold: FAST_THRESHOLD,
            sample_stride: SAMPLE_STRIDE,
        }
    }
}

impl IndexOptions {
    pub fn tier_for(&self, count: usize) -> LookupTier {
        if count >= self.fast_threshold {
            LookupTier::Bucketed
        } else if count <= self.linear_threshold {
            LookupTier::Linear
        } else {
            LookupTier::Binary
        }
    }
}

/// Contiguous run of records sharing one 16-bit prefix, in record units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: usize,
    pub len: usize,
}

impl Bucket {
    #[inline(always)]
    fn byte_range(self, stride: usize) -> std::ops::Range<usize> {
        self.start * stride..(self.start + self.len) * stride
    }
}

/// Maps every 16-bit prefix to the run of records that start with it.
pub struct BucketTable {
    slots: Box<[Option<Bucket>]>,
}

impl BucketTable {
    /// Builds the table over `data`, a sorted run of `stride`-byte records.
    ///
    /// Rather than reading every record, the list is sampled every
    /// `sample_stride` records; each sampled prefix change gives a
    /// provisional bucket start. Refinement sweeps then walk each known start
    /// backwards to the true boundary, and the record just before it reveals
    /// the preceding bucket, which may have fallen between two samples.
    /// Sweeps repeat until one discovers nothing new. Lengths follow from the
    /// distance between consecutive starts.
    pub fn build(data: &[u8], stride: usize, sample_stride: usize) -> Self {
        let count = data.len() / stride;
        let mut starts: Vec<Option<usize>> = vec![None; BUCKET_COUNT];

        if count == 0 {
            return Self::from_starts(&starts, 0);
        }

        let prefix_at = |record: usize| prefix16(&data[record * stride..]) as usize;

        // Pass 1: sparse sampling. The last record is always sampled so that
        // buckets after the final sample point are reached by the walk below.
        let mut last = None;
        let mut sampled = 0usize;
        let samples = (0..count).step_by(sample_stride.max(1)).chain(std::iter::once(count - 1));
        for record in samples {
            let prefix = prefix_at(record);
            if last != Some(prefix) && starts[prefix].is_none() {
                starts[prefix] = Some(record);
                sampled += 1;
            }
            last = Some(prefix);
        }
        debug!(pass = 1, buckets = sampled, "sampled bucket starts");

        // Pass 2..n: backward refinement until a fixed point. Walking slots
        // high to low lets a predecessor discovered in this sweep be refined
        // in the same sweep.
        let mut pass = 2;
        loop {
            let mut discovered = 0usize;
            for prefix in (0..BUCKET_COUNT).rev() {
                let Some(mut start) = starts[prefix] else {
                    continue;
                };
                while start > 0 && prefix_at(start - 1) == prefix {
                    start -= 1;
                }
                starts[prefix] = Some(start);

                if start > 0 {
                    let previous = prefix_at(start - 1);
                    if starts[previous].is_none() {
                        starts[previous] = Some(start - 1);
                        discovered += 1;
                    }
                }
            }
            debug!(pass, discovered, "refined bucket starts");
            if discovered == 0 {
                break;
            }
            pass += 1;
        }

        Self::from_starts(&starts, count)
    }

    /// Length pass: each bucket extends to the next start in address order,
    /// the highest one to the end of the list.
    fn from_starts(starts: &[Option<usize>], count: usize) -> Self {
        let mut ordered: Vec<(usize, usize)> = starts
            .iter()
            .enumerate()
            .filter_map(|(prefix, start)| start.map(|s| (s, prefix)))
            .collect();
        ordered.sort_unstable();

        let mut slots = vec![None; BUCKET_COUNT].into_boxed_slice();
        for (i, &(start, prefix)) in ordered.iter().enumerate() {
            let end = ordered.get(i + 1).map_or(count, |&(next, _)| next);
            slots[prefix] = Some(Bucket { start, len: end - start });
        }

        Self { slots }
    }

    #[inline(always)]
    pub fn get(&self, prefix: u16) -> Option<Bucket> {
        self.slots[prefix as usize]
    }

    /// Number of non-empty buckets.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// A sorted, immutable list of digests with the lookup structure suited to
/// its size.
pub struct DigestIndex {
    records: Records,
    digest_len: usize,
    count: usize,
    tier: LookupTier,
    buckets: Option<BucketTable>,
}

impl DigestIndex {
    /// Indexes `records`, which must already be sorted ascending.
    pub fn new(records: Records, digest_len: usize, options: IndexOptions) -> Result<Self, Error> {
        if digest_len < 2 || records.len() % digest_len != 0 {
            return Err(Error::SizeMismatch { size: records.len() as u64, digest_len });
        }

        let count = records.len() / digest_len;
        let tier = options.tier_for(count);
        let buckets = match tier {
            LookupTier::Bucketed => {
                info!(records = count, "indexing hash table");
                let table = BucketTable::build(&records, digest_len, options.sample_stride);
                info!(buckets = table.occupied(), "hash table indexed");
                Some(table)
            }
            LookupTier::Linear | LookupTier::Binary => {
                debug!(records = count, ?tier, "hash list below indexing threshold");
                None
            }
        };

        Ok(Self { records, digest_len, count, tier, buckets })
    }

    /// Indexes an in-memory buffer that is already sorted.
    pub fn from_sorted(
        records: Vec<u8>,
        digest_len: usize,
        options: IndexOptions,
    ) -> Result<Self, Error> {
        Self::new(Records::Owned(records), digest_len, options)
    }

    /// Sorts an in-memory buffer, drops exact duplicates, and indexes it.
    pub fn from_unsorted(
        records: Vec<u8>,
        digest_len: usize,
        options: IndexOptions,
    ) -> Result<Self, Error> {
        if digest_len < 2 || records.len() % digest_len != 0 {
            return Err(Error::SizeMismatch { size: records.len() as u64, digest_len });
        }

        let mut rows: Vec<&[u8]> = records.chunks_exact(digest_len).collect();
        rows.sort_unstable();
        rows.dedup();
        let sorted = rows.concat();

        Self::from_sorted(sorted, digest_len, options)
    }

    /// Returns true if `digest` is in the list.
    #[inline]
    pub fn contains(&self, digest: &[u8]) -> bool {
        if digest.len() != self.digest_len {
            return false;
        }

        match (&self.tier, &self.buckets) {
            (LookupTier::Bucketed, Some(table)) => match table.get(prefix16(digest)) {
                Some(bucket) => binary_search_records(
                    &self.records[bucket.byte_range(self.digest_len)],
                    self.digest_len,
                    digest,
                ),
                None => false,
            },
            (LookupTier::Linear, _) => {
                linear_search_records(&self.records, self.digest_len, digest)
            }
            _ => binary_search_records(&self.records, self.digest_len, digest),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn digest_len(&self) -> usize {
        self.digest_len
    }

    pub fn tier(&self) -> LookupTier {
        self.tier
    }

    /// The bucket for a prefix, if a bucket table was built.
    pub fn bucket(&self, prefix: u16) -> Option<Bucket> {
        self.buckets.as_ref().and_then(|table| table.get(prefix))
    }

    pub fn bucket_table(&self) -> Option<&BucketTable> {
        self.buckets.as_ref()
    }

    /// The raw sorted records.
    pub fn records(&self) -> &[u8] {
        &self.records
    }

    /// Digest of the record at `index`.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        (index < self.count)
            .then(|| &self.records[index * self.digest_len..(index + 1) * self.digest_len])
    }
}
