//! Membership lookups against very large sorted lists of hash digests.
//!
//! A hash list is a flat file of fixed-width binary digests (16 bytes for MD5,
//! 20 for SHA-1, 32/48/64 for the SHA-2 family) sorted ascending by byte
//! order. The file is memory-mapped and never copied; lookups are answered by
//! one of three strategies depending on how many records the list holds:
//!
//! - up to [`LINEAR_THRESHOLD`] records: a linear scan, since bisection buys
//!   nothing on a handful of cache lines;
//! - up to [`FAST_THRESHOLD`] records: a binary search over the whole list;
//! - beyond that: a binary search restricted to the records sharing the
//!   digest's leading 16 bits, located through a 65,536-slot bucket table.
//!
//! All three strategies answer identically for the same data. The bucket
//! table is built once at load time with a sparse sampling pass followed by
//! backward-walk refinement, so a list of hundreds of millions of records is
//! indexed without touching every record.
//!
//! ```no_run
//! use hashlist::{Algorithm, DigestIndex, IndexOptions};
//!
//! let index = DigestIndex::open("hashes.bin", Algorithm::Sha1, IndexOptions::default())?;
//! let mut digest = [0u8; 20];
//! Algorithm::Sha1.hash_into(b"password", &mut digest);
//! assert!(index.contains(&digest));
//! # Ok::<(), hashlist::Error>(())
//! ```

use std::cmp::Ordering;

pub mod algorithm;
pub mod error;
pub mod index;
pub mod loader;

pub use algorithm::{Algorithm, MAX_DIGEST_LEN};
pub use error::{Error, ErrorKind};
pub use index::{
    Bucket, BucketTable, DigestIndex, FAST_THRESHOLD, IndexOptions, LINEAR_THRESHOLD, LookupTier,
    Records, SAMPLE_STRIDE,
};

/// Number of bucket slots: one per possible 16-bit digest prefix.
pub const BUCKET_COUNT: usize = 1 << 16;

/// Returns the bucket key of a digest: its first two bytes read big-endian,
/// so that slot order matches the sort order of the list.
#[inline(always)]
pub fn prefix16(digest: &[u8]) -> u16 {
    u16::from_be_bytes([digest[0], digest[1]])
}

/// Binary searches `data`, a run of sorted fixed-size records, for `key`.
///
/// Returns `Ok(index)` of a matching record, or `Err(index)` of the position
/// where `key` would have to be inserted to keep the run sorted. Both are in
/// record units.
#[inline(always)]
pub fn search_records(data: &[u8], stride: usize, key: &[u8]) -> Result<usize, usize> {
    let record_count = data.len() / stride;
    let mut low = 0usize;
    let mut high = record_count;

    while low < high {
        let mid = low + (high - low) / 2;
        let offset = mid * stride;

        let record = &data[offset..offset + stride];

        match record.cmp(key) {
            Ordering::Equal => return Ok(mid),
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
        }
    }

    Err(low)
}

/// Binary searches for `key` in a run of sorted fixed-size records.
#[inline(always)]
pub fn binary_search_records(data: &[u8], stride: usize, key: &[u8]) -> bool {
    if data.is_empty() || key.len() != stride {
        return false;
    }
    search_records(data, stride, key).is_ok()
}

/// Scans every record in turn. Only sensible for short runs.
#[inline]
pub fn linear_search_records(data: &[u8], stride: usize, key: &[u8]) -> bool {
    if key.len() != stride {
        return false;
    }
    data.chunks_exact(stride).any(|record| record == key)
}
