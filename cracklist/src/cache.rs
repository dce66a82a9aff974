use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::reader::WorkBlock;

/// Outcome of one attempt to take work from the cache.
#[derive(Debug)]
pub enum Dequeue {
    Block(WorkBlock),
    /// Nothing queued yet, but more input is coming.
    Empty,
    /// Nothing queued and the input has ended.
    Exhausted,
}

struct CacheState {
    queue: VecDeque<WorkBlock>,
    freelist: Vec<WorkBlock>,
    exhausted: bool,
}

/// Bounded queue of candidate blocks between the reader and the workers,
/// plus a freelist of spent blocks for the reader to refill.
///
/// One mutex guards the queue, the freelist and the exhausted flag; every
/// critical section moves a single block.
pub struct InputCache {
    state: Mutex<CacheState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl InputCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(CacheState {
                queue: VecDeque::with_capacity(capacity),
                freelist: Vec::new(),
                exhausted: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().queue.len() >= self.capacity
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().exhausted
    }

    /// Queues `block` and, if `exhausted`, marks the input as ended, in one
    /// step: a worker can never see "empty and exhausted" while a final block
    /// is still on its way. Empty blocks go straight to the freelist.
    pub fn publish(&self, block: WorkBlock, exhausted: bool) {
        let mut state = self.state.lock();
        if block.is_empty() {
            if state.freelist.len() < self.capacity {
                state.freelist.push(block);
            }
        } else {
            state.queue.push_back(block);
        }
        state.exhausted |= exhausted;
        drop(state);

        if exhausted {
            self.not_empty.notify_all();
        } else {
            self.not_empty.notify_one();
        }
    }

    /// Takes the oldest block. When nothing is queued and input has not
    /// ended, waits up to `timeout` for the reader before giving up.
    pub fn dequeue(&self, timeout: Duration) -> Dequeue {
        let mut state = self.state.lock();
        if state.queue.is_empty() && !state.exhausted {
            self.not_empty.wait_for(&mut state, timeout);
        }

        match state.queue.pop_front() {
            Some(block) => {
                drop(state);
                self.not_full.notify_one();
                Dequeue::Block(block)
            }
            None if state.exhausted => Dequeue::Exhausted,
            None => Dequeue::Empty,
        }
    }

    /// Waits up to `timeout` for the queue to drop below capacity. Returns
    /// true if there is room.
    pub fn wait_for_space(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.queue.len() >= self.capacity {
            self.not_full.wait_for(&mut state, timeout);
        }
        state.queue.len() < self.capacity
    }

    /// A spent block to refill, if one has been returned.
    pub fn take_free(&self) -> Option<WorkBlock> {
        self.state.lock().freelist.pop()
    }

    /// Returns a processed block for reuse. Dropped if the freelist already
    /// holds as many blocks as the queue can.
    pub fn recycle(&self, mut block: WorkBlock) {
        block.clear();
        let mut state = self.state.lock();
        if state.freelist.len() < self.capacity {
            state.freelist.push(block);
        }
    }

    pub fn free_len(&self) -> usize {
        self.state.lock().freelist.len()
    }
}
