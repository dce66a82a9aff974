use std::io::{self, BufRead};

use tracing::warn;

/// A batch of candidates processed as one unit of work.
///
/// Word buffers are kept when the block is cleared so a recycled block
/// refills without reallocating.
#[derive(Debug, Default)]
pub struct WorkBlock {
    words: Vec<Vec<u8>>,
    len: usize,
}

impl WorkBlock {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { words: Vec::with_capacity(capacity), len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn push(&mut self, word: &[u8]) {
        if let Some(slot) = self.words.get_mut(self.len) {
            slot.clear();
            slot.extend_from_slice(word);
        } else {
            self.words.push(word.to_vec());
        }
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.words[..self.len].get(index).map(Vec::as_slice)
    }

    pub fn last(&self) -> Option<&[u8]> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.words[..self.len].iter().map(Vec::as_slice)
    }
}

/// Splits a byte stream into candidates.
///
/// Trailing `\r`/`\n` are stripped, and a line equal to the one right before
/// it is dropped (including across block boundaries). Duplicates further
/// apart are left alone.
pub struct CandidateReader<R> {
    input: R,
    line: Vec<u8>,
    previous: Vec<u8>,
    has_previous: bool,
    exhausted: bool,
}

impl<R: BufRead> CandidateReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: Vec::with_capacity(256),
            previous: Vec::with_capacity(256),
            has_previous: false,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Clears `block` and fills it with up to `capacity` candidates. Returns
    /// true once the stream has ended; the block may still hold the final
    /// candidates in that case.
    ///
    /// A read error ends the stream: it is logged and treated as end of input.
    pub fn read_block(&mut self, block: &mut WorkBlock, capacity: usize) -> bool {
        block.clear();

        while !self.exhausted && block.len() < capacity {
            match self.next_line() {
                Ok(true) => {
                    if self.has_previous && self.previous == self.line {
                        continue;
                    }
                    block.push(&self.line);
                    std::mem::swap(&mut self.previous, &mut self.line);
                    self.has_previous = true;
                }
                Ok(false) => self.exhausted = true,
                Err(e) => {
                    warn!(error = %e, "error reading wordlist, treating as end of input");
                    self.exhausted = true;
                }
            }
        }

        self.exhausted
    }

    /// Reads the next line into `self.line` without its terminator. Returns
    /// false at end of stream.
    fn next_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        loop {
            match self.input.read_until(b'\n', &mut self.line) {
                Ok(0) => return Ok(false),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(true)
    }
}
