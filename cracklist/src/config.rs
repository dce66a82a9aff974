use std::path::{Path, PathBuf};

use hashlist::{Algorithm, IndexOptions};

use crate::error::Error;

/// Candidates per work block.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Blocks the reader may queue ahead of the workers.
pub const DEFAULT_CACHE_BLOCKS: usize = 1024;

/// Columns of the status line.
pub const DEFAULT_STATUS_WIDTH: usize = 100;

pub const DEFAULT_SEPARATOR: &str = ":";

/// Everything a run needs to know, as plain values.
#[derive(Debug, Clone)]
pub struct CrackConfig {
    pub hash_file: Option<PathBuf>,
    /// `None` or `-` reads standard input.
    pub wordlist: Option<PathBuf>,
    /// `None` or `-` writes standard output.
    pub output: Option<PathBuf>,
    pub algorithm: Option<Algorithm>,
    pub binary_hash_file: bool,
    /// Worker threads; 0 picks one per core.
    pub threads: usize,
    pub block_size: usize,
    pub cache_blocks: usize,
    pub deduplicate: bool,
    pub separator: String,
    pub status_width: usize,
    pub autohex: bool,
    pub show_status: bool,
    pub index: IndexOptions,
}

impl Default for CrackConfig {
    fn default() -> Self {
        Self {
            hash_file: None,
            wordlist: None,
            output: None,
            algorithm: None,
            binary_hash_file: true,
            threads: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            cache_blocks: DEFAULT_CACHE_BLOCKS,
            deduplicate: false,
            separator: DEFAULT_SEPARATOR.to_string(),
            status_width: DEFAULT_STATUS_WIDTH,
            autohex: true,
            show_status: true,
            index: IndexOptions::default(),
        }
    }
}

impl CrackConfig {
    pub fn new(hash_file: impl Into<PathBuf>) -> Self {
        Self { hash_file: Some(hash_file.into()), ..Self::default() }
    }

    pub fn with_wordlist(mut self, wordlist: impl Into<PathBuf>) -> Self {
        self.wordlist = Some(wordlist.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Treat the hash file as hex text, one digest per line.
    pub fn with_text_hash_file(mut self) -> Self {
        self.binary_hash_file = false;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_cache_blocks(mut self, cache_blocks: usize) -> Self {
        self.cache_blocks = cache_blocks;
        self
    }

    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_autohex(mut self, autohex: bool) -> Self {
        self.autohex = autohex;
        self
    }

    pub fn with_status(mut self, show_status: bool) -> Self {
        self.show_status = show_status;
        self
    }

    pub fn with_index_options(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }

    /// Checks the settings that make a run impossible, before anything is
    /// opened.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hash_file.as_deref().is_none_or(|p| p.as_os_str().is_empty()) {
            return Err(Error::MissingHashFile);
        }
        if self.binary_hash_file && self.algorithm.is_none() {
            return Err(Error::MissingAlgorithm);
        }
        self.validate_sizes()
    }

    /// Checks the block and cache sizes alone, for runs whose hash list is
    /// supplied already loaded.
    pub fn validate_sizes(&self) -> Result<(), Error> {
        if self.block_size == 0 {
            return Err(Error::ZeroSize { name: "block size" });
        }
        if self.cache_blocks == 0 {
            return Err(Error::ZeroSize { name: "cache size" });
        }
        Ok(())
    }

    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// The wordlist path, unless input comes from standard input.
    pub fn wordlist_path(&self) -> Option<&Path> {
        self.wordlist.as_deref().filter(|p| !is_stdio(p))
    }

    /// The output path, unless output goes to standard output.
    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref().filter(|p| !is_stdio(p))
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.as_os_str() == "-"
}
