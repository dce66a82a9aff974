//! The cracking pipeline.
//!
//! ```text
//!  io dispatcher           worker pool              calling thread
//!
//!  CandidateReader ──▶ InputCache ──▶ N workers ──Event──▶ ResultSink
//!        ▲                              │                  ProgressTracker
//!        └────────── freelist ◀─────────┘
//! ```
//!
//! Every reader and worker iteration is a task that re-posts itself. The
//! calling thread coordinates: it owns the output and the statistics, and it
//! tears the pools down once every worker has seen the input run dry.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use crossbeam_channel::{Sender, unbounded};
use hashlist::{Algorithm, DigestIndex};
use tracing::{debug, info};

use crate::cache::InputCache;
use crate::config::CrackConfig;
use crate::dedup::{DedupSet, SortedDigests};
use crate::dispatch::{Dispatcher, DispatcherPool};
use crate::error::Error;
use crate::output::{Match, ResultSink};
use crate::progress::{ProgressTracker, Pulse, StatusLine};
use crate::reader::{CandidateReader, WorkBlock};
use crate::worker::{self, BACKOFF, CrackWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Idle,
    Running,
    /// Input has ended; workers are emptying the cache.
    Draining,
    Stopped,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineState::Idle,
            1 => PipelineState::Running,
            2 => PipelineState::Draining,
            _ => PipelineState::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(PipelineState::Idle as u8))
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: PipelineState) {
        let previous = PipelineState::from_u8(self.0.swap(state as u8, Ordering::AcqRel));
        debug!(from = ?previous, to = ?state, "pipeline state");
    }

    /// Moves to `to` only from `from`. Returns whether it did.
    pub fn advance(&self, from: PipelineState, to: PipelineState) -> bool {
        let moved = self
            .0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            debug!(?from, ?to, "pipeline state");
        }
        moved
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages from the workers to the coordinating thread.
#[derive(Debug)]
pub enum Event {
    Matches(Vec<Match>),
    Pulse(Pulse),
    WorkerFinished(usize),
}

/// Everything the reader and worker tasks share for one run.
pub(crate) struct Shared {
    pub(crate) index: Arc<DigestIndex>,
    pub(crate) algorithm: Algorithm,
    pub(crate) block_size: usize,
    pub(crate) dedup: Option<DedupSet>,
    pub(crate) cache: InputCache,
    pub(crate) events: Sender<Event>,
    pub(crate) state: StateCell,
    pub(crate) pool: DispatcherPool,
    pub(crate) io: Dispatcher,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrackSummary {
    /// Candidates hashed.
    pub processed: u64,
    /// Match lines emitted.
    pub cracked: u64,
    /// Digests in the hash list.
    pub total: usize,
    pub threads: usize,
    pub state: PipelineState,
}

/// Output and statistics, owned by whichever thread coordinates the run.
struct Coordinator<W: Write> {
    sink: ResultSink<W>,
    progress: ProgressTracker,
    status: StatusLine,
}

impl<W: Write> Coordinator<W> {
    fn new(config: &CrackConfig, output: W, threads: usize, total: usize) -> Self {
        let status = if config.show_status { StatusLine::stderr() } else { StatusLine::hidden() };
        Self {
            sink: ResultSink::new(output, &config.separator, config.autohex),
            progress: ProgressTracker::new(config.block_size, threads, total, config.status_width),
            status,
        }
    }

    fn matches(&mut self, matches: Vec<Match>) {
        for m in &matches {
            self.sink.write(m);
            self.progress.record_crack(&m.candidate);
        }
    }

    fn pulse(&mut self, pulse: Pulse) {
        self.progress.pulse(pulse);
        self.status.update(self.progress.render());
    }

    fn finish(self, threads: usize, total: usize, state: PipelineState) -> (CrackSummary, W) {
        self.status.finish();
        let summary = CrackSummary {
            processed: self.progress.processed(),
            cracked: self.progress.cracked(),
            total,
            threads,
            state,
        };
        (summary, self.sink.into_inner())
    }
}

/// A loaded hash list plus the settings to run wordlists against it.
pub struct Cracker {
    config: CrackConfig,
    index: Arc<DigestIndex>,
    algorithm: Algorithm,
}

impl Cracker {
    /// Validates `config` and loads its hash list. Every fatal error is
    /// reported here, before any thread is started.
    pub fn new(config: CrackConfig) -> Result<Self, Error> {
        config.validate()?;

        if let Some(path) = config.wordlist_path() {
            if !path.exists() {
                return Err(Error::WordlistNotFound { path: path.to_path_buf() });
            }
            if !path.is_file() {
                return Err(Error::WordlistNotAFile { path: path.to_path_buf() });
            }
        }

        let hash_file = config.hash_file.as_deref().ok_or(Error::MissingHashFile)?;
        let (index, algorithm) = if config.binary_hash_file {
            let algorithm = config.algorithm.ok_or(Error::MissingAlgorithm)?;
            (DigestIndex::open(hash_file, algorithm, config.index)?, algorithm)
        } else {
            DigestIndex::open_hex(hash_file, config.algorithm, config.index)?
        };

        Self::with_index(config, Arc::new(index), algorithm)
    }

    /// Uses an index that is already loaded. `config`'s hash file settings
    /// are ignored, but its sizes are checked, and `algorithm` must produce
    /// digests as long as the index's records.
    pub fn with_index(
        config: CrackConfig,
        index: Arc<DigestIndex>,
        algorithm: Algorithm,
    ) -> Result<Self, Error> {
        config.validate_sizes()?;

        if algorithm.digest_len() != index.digest_len() {
            return Err(Error::AlgorithmMismatch {
                algorithm,
                expected: algorithm.digest_len(),
                found: index.digest_len(),
            });
        }

        Ok(Self { config, index, algorithm })
    }

    pub fn config(&self) -> &CrackConfig {
        &self.config
    }

    pub fn index(&self) -> &DigestIndex {
        &self.index
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Opens the configured wordlist and output (standard streams when
    /// unset) and cracks.
    pub fn run(&self) -> Result<CrackSummary, Error> {
        let input: Box<dyn BufRead + Send> = match self.config.wordlist_path() {
            Some(path) => {
                let file = File::open(path).map_err(|source| Error::Open {
                    what: "wordlist",
                    path: path.to_path_buf(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(BufReader::new(io::stdin())),
        };

        let output: Box<dyn Write> = match self.config.output_path() {
            Some(path) => {
                let file = File::create(path).map_err(|source| Error::Open {
                    what: "output file",
                    path: path.to_path_buf(),
                    source,
                })?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout())),
        };

        let (summary, _) = self.crack(input, output)?;
        Ok(summary)
    }

    /// Cracks every candidate in `input`, writing matches to `output`, and
    /// hands the writer back once the run has stopped.
    pub fn crack<R, W>(&self, input: R, output: W) -> Result<(CrackSummary, W), Error>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let threads = self.config.resolved_threads();
        info!(
            threads,
            algorithm = %self.algorithm,
            hashes = self.index.len(),
            dedup = self.config.deduplicate,
            "beginning cracking"
        );

        if threads == 1 {
            Ok(self.crack_single(input, output))
        } else {
            self.crack_threaded(input, output, threads)
        }
    }

    /// Same work as the pooled path, inline on the calling thread.
    fn crack_single<R: BufRead, W: Write>(&self, input: R, output: W) -> (CrackSummary, W) {
        let block_size = self.config.block_size;
        let total = self.index.len();
        let state = StateCell::new();
        let mut coordinator = Coordinator::new(&self.config, output, 1, total);
        let mut reader = CandidateReader::new(input);
        let mut block = WorkBlock::with_capacity(block_size);
        let mut worker = CrackWorker::new(0, self.algorithm);
        let mut dedup =
            self.config.deduplicate.then(|| SortedDigests::new(self.index.digest_len()));

        state.set(PipelineState::Running);
        loop {
            let exhausted = reader.read_block(&mut block, block_size);
            if exhausted {
                state.set(PipelineState::Draining);
            }

            if !block.is_empty() {
                let started = Instant::now();
                let matches = worker.crack_block(&block, self.algorithm, &self.index, |digest| {
                    dedup.as_mut().is_none_or(|set| set.insert(digest))
                });
                let elapsed_ms = started.elapsed().as_millis() as u64;

                coordinator.matches(matches);
                coordinator.pulse(Pulse {
                    worker: 0,
                    elapsed_ms,
                    attempted: block.len() as u64,
                    last_attempted: block.last().unwrap_or_default().to_vec(),
                });
            }

            if exhausted {
                break;
            }
        }
        state.set(PipelineState::Stopped);

        coordinator.finish(1, total, state.get())
    }

    fn crack_threaded<R, W>(
        &self,
        input: R,
        output: W,
        threads: usize,
    ) -> Result<(CrackSummary, W), Error>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let total = self.index.len();
        let (events, inbox) = unbounded();
        let shared = Arc::new(Shared {
            index: Arc::clone(&self.index),
            algorithm: self.algorithm,
            block_size: self.config.block_size,
            dedup: self.config.deduplicate.then(|| DedupSet::new(self.index.digest_len())),
            cache: InputCache::new(self.config.cache_blocks),
            events,
            state: StateCell::new(),
            pool: DispatcherPool::spawn("crack-worker", threads)?,
            io: Dispatcher::spawn("crack-io")?,
        });
        let mut coordinator = Coordinator::new(&self.config, output, threads, total);

        shared.state.set(PipelineState::Running);
        let reader = CandidateReader::new(input);
        {
            let s = Arc::clone(&shared);
            shared.io.post(move || refill(s, reader));
        }
        for id in 0..threads {
            let s = Arc::clone(&shared);
            let w = CrackWorker::new(id, self.algorithm);
            shared.pool.get(id).post(move || worker::step(s, w));
        }

        let mut active = threads;
        while active > 0 {
            match inbox.recv() {
                Ok(Event::Matches(matches)) => coordinator.matches(matches),
                Ok(Event::Pulse(pulse)) => coordinator.pulse(pulse),
                Ok(Event::WorkerFinished(id)) => {
                    active -= 1;
                    debug!(worker = id, remaining = active, "worker finished");
                }
                Err(_) => break,
            }
        }

        shared.pool.stop();
        shared.pool.wait();
        shared.io.stop();
        shared.io.wait();
        shared.state.set(PipelineState::Stopped);

        Ok(coordinator.finish(threads, total, shared.state.get()))
    }
}

/// One reader iteration: queue one more block if the cache has room, then
/// post the next iteration. Stops once the input has ended.
fn refill<R: BufRead + Send + 'static>(shared: Arc<Shared>, mut reader: CandidateReader<R>) {
    if shared.cache.is_exhausted() {
        debug!("reader finished");
        return;
    }

    if shared.cache.wait_for_space(BACKOFF) {
        let mut block =
            shared.cache.take_free().unwrap_or_else(|| WorkBlock::with_capacity(shared.block_size));
        let exhausted = reader.read_block(&mut block, shared.block_size);
        if exhausted {
            shared.state.advance(PipelineState::Running, PipelineState::Draining);
        }
        shared.cache.publish(block, exhausted);
    }

    let next = Arc::clone(&shared);
    shared.io.post(move || refill(next, reader));
}
