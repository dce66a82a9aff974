use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cracklist::config::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_BLOCKS, DEFAULT_SEPARATOR, DEFAULT_STATUS_WIDTH,
};
use cracklist::{CrackConfig, Cracker};
use hashlist::Algorithm;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cracklist")]
#[command(about = "Check a wordlist against a sorted list of hash digests")]
struct Args {
    /// Sorted binary hash list (or hex text with --text)
    hash_file: PathBuf,

    /// Wordlist to read candidates from; '-' or omitted reads stdin
    wordlist: Option<PathBuf>,

    /// Write cracked hashes here instead of stdout
    #[arg(short, long = "out")]
    output: Option<PathBuf>,

    /// Hash algorithm: md5, sha1, sha256, sha384 or sha512
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Hash list is hex text, one digest per line (algorithm detected if omitted)
    #[arg(long)]
    text: bool,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value = "0")]
    threads: usize,

    /// Candidates per work block
    #[arg(short, long = "blocksize", default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Blocks the reader may queue ahead of the workers
    #[arg(long, default_value_t = DEFAULT_CACHE_BLOCKS)]
    cache_blocks: usize,

    /// Report each cracked hash only once
    #[arg(short, long)]
    dedup: bool,

    /// Separator between hash and plaintext in the output
    #[arg(short, long, default_value = DEFAULT_SEPARATOR)]
    separator: String,

    /// Status line width
    #[arg(short, long, default_value_t = DEFAULT_STATUS_WIDTH)]
    width: usize,

    /// Write non-printable plaintexts as-is instead of $HEX[...]
    #[arg(long)]
    no_autohex: bool,

    /// Disable the status line
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> CrackConfig {
        CrackConfig {
            hash_file: Some(self.hash_file),
            wordlist: self.wordlist,
            output: self.output,
            algorithm: self.algorithm,
            binary_hash_file: !self.text,
            threads: self.threads,
            block_size: self.block_size,
            cache_blocks: self.cache_blocks,
            deduplicate: self.dedup,
            separator: self.separator,
            status_width: self.width,
            autohex: !self.no_autohex,
            show_status: !self.quiet,
            ..CrackConfig::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let cracker = match Cracker::new(args.into_config()) {
        Ok(cracker) => cracker,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cracker.run() {
        Ok(summary) => {
            eprintln!("Cracked {} of {} hashes", summary.cracked, summary.total);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
