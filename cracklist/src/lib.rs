//! Runs a wordlist against a sorted hash list and reports which candidates
//! hash to a listed digest.
//!
//! One reader thread fills a bounded cache with blocks of candidates, a pool
//! of workers hashes them and looks each digest up in a
//! [`hashlist::DigestIndex`], and the calling thread writes matches and keeps
//! the status line. See [`pipeline`] for how the pieces are wired.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod worker;

pub use cache::{Dequeue, InputCache};
pub use config::CrackConfig;
pub use dedup::{DedupSet, SortedDigests};
pub use dispatch::{Dispatcher, DispatcherPool};
pub use error::{Error, ErrorKind};
pub use output::{Match, ResultSink, hexlify};
pub use pipeline::{CrackSummary, Cracker, Event, PipelineState};
pub use progress::{ProgressTracker, Pulse, StatusLine};
pub use reader::{CandidateReader, WorkBlock};
pub use worker::CrackWorker;
