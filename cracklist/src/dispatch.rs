//! Named single-threaded task loops.
//!
//! A [`Dispatcher`] owns one OS thread that runs posted closures in FIFO
//! order. Long-running work is expressed as a task that re-posts itself at the
//! end of each step instead of looping, so a dispatcher never blocks on one
//! job. A [`DispatcherPool`] is a fixed set of dispatchers, one per worker.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{trace, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Stop,
}

pub struct Dispatcher {
    name: String,
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Starts a dispatcher thread called `name`.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || run(receiver))?;
        Ok(Self { name, sender, handle: Mutex::new(Some(handle)) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `task`. Safe to call from any thread, including from a task
    /// running on this or another dispatcher.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(Message::Run(Box::new(task))).is_err() {
            warn!(dispatcher = %self.name, "task posted to a stopped dispatcher was dropped");
        }
    }

    /// Asks the loop to exit once every task posted before this call has run.
    pub fn stop(&self) {
        let _ = self.sender.send(Message::Stop);
    }

    /// Blocks until the loop has exited. Must follow [`Dispatcher::stop`];
    /// calling it from the dispatcher's own thread is a no-op.
    pub fn wait(&self) {
        let mut slot = self.handle.lock();
        let Some(handle) = slot.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            *slot = Some(handle);
            warn!(dispatcher = %self.name, "dispatcher cannot wait on itself");
            return;
        }
        drop(slot);

        if handle.join().is_err() {
            warn!(dispatcher = %self.name, "dispatcher thread panicked");
        }
    }
}

fn run(receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Run(task) => task(),
            Message::Stop => break,
        }
    }
    trace!(thread = ?thread::current().name(), "dispatcher loop exited");
}

/// A fixed set of dispatchers named `{prefix}-{index}`.
pub struct DispatcherPool {
    dispatchers: Vec<Dispatcher>,
}

impl DispatcherPool {
    pub fn spawn(prefix: &str, count: usize) -> std::io::Result<Self> {
        let dispatchers = (0..count)
            .map(|i| Dispatcher::spawn(format!("{prefix}-{i}")))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { dispatchers })
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Dispatcher {
        &self.dispatchers[index]
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }

    pub fn stop(&self) {
        for dispatcher in &self.dispatchers {
            dispatcher.stop();
        }
    }

    pub fn wait(&self) {
        for dispatcher in &self.dispatchers {
            dispatcher.wait();
        }
    }
}
