//! Read loops: inline sequential processing, and one producer feeding a pool
//! of consumers through the lock-free queue.
//!
//! # Concurrent shutdown
//!
//! ```text
//! producer:  decode ─> push ─> notify_one ─> ... ─> DONE/EOF ─> done=true ─> notify_all ─> wait active==0
//!                        │                                                        │
//! consumer:  WAITING <───┘ (queue non-empty) ─> pop ─> dispatch ─> WAITING ...    └─> queue empty && done ─> TERMINATED
//! ```
//!
//! The wake mutex guards only `done` and the active-consumer count. The queue
//! itself is never locked; consumers read its emptiness hint while holding the
//! wake mutex so that a producer notification cannot slip in between the
//! check and the wait.

use chirp_events::Request;
use chirp_feed::FeedStore;
use chirp_sync::LockFreeQueue;
use parking_lot::{Condvar, Mutex};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::panic;
use std::thread;

use crate::RunSummary;
use crate::codec::RequestReader;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;

#[derive(Debug, Default)]
struct WakeState {
    done: bool,
    /// Consumer threads that have not terminated yet.
    active: usize,
}

struct Shared {
    queue: LockFreeQueue<Request>,
    wake: Mutex<WakeState>,
    /// Producer -> consumers: work arrived or shutdown began.
    work: Condvar,
    /// Last consumer -> producer: every consumer has terminated.
    drained: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: LockFreeQueue::new(),
            wake: Mutex::new(WakeState::default()),
            work: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    fn enqueue(&self, req: Request) {
        self.queue.push(req);
        let _wake = self.wake.lock();
        self.work.notify_one();
    }

    fn shutdown(&self) {
        let mut wake = self.wake.lock();
        wake.done = true;
        self.work.notify_all();
    }

    /// Blocks until the queue looks non-empty (`true`) or the queue is empty
    /// and shutdown has begun (`false`).
    fn wait_for_work(&self) -> bool {
        let mut wake = self.wake.lock();
        while self.queue.is_empty() {
            if wake.done {
                return false;
            }
            self.work.wait(&mut wake);
        }
        true
    }

    fn wait_drained(&self) {
        let mut wake = self.wake.lock();
        while wake.active > 0 {
            self.drained.wait(&mut wake);
        }
    }
}

/// Counts a consumer out when its thread ends, including by panic.
struct ActiveConsumer<'a>(&'a Shared);

impl Drop for ActiveConsumer<'_> {
    fn drop(&mut self) {
        let mut wake = self.0.wake.lock();
        wake.active -= 1;
        if wake.active == 0 {
            self.0.drained.notify_all();
        }
    }
}

pub(crate) fn run_sequential<F, R, W>(
    requests: RequestReader<R>,
    dispatcher: &Dispatcher<'_, F, W>,
) -> RunSummary
where
    F: FeedStore + ?Sized,
    R: Read,
    W: Write,
{
    let mut summary = RunSummary::default();
    for req in requests {
        if req.command.is_sentinel() {
            summary.sentinel = true;
            break;
        }
        summary.requests += 1;
        if dispatcher.dispatch(req) {
            summary.responses += 1;
        }
    }
    summary
}

pub(crate) fn run_concurrent<F, R, W>(
    consumers: NonZeroUsize,
    requests: RequestReader<R>,
    dispatcher: &Dispatcher<'_, F, W>,
) -> Result<RunSummary, ServerError>
where
    F: FeedStore + ?Sized,
    R: Read,
    W: Write + Send,
{
    let shared = Shared::new();

    thread::scope(|s| {
        let shared = &shared;
        let mut handles = Vec::with_capacity(consumers.get());

        for n in 0..consumers.get() {
            shared.wake.lock().active += 1;
            let spawned = thread::Builder::new()
                .name(format!("chirp-consumer-{n}"))
                .spawn_scoped(s, move || consume(n, shared, dispatcher));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // This slot never got a thread to count itself out.
                    shared.wake.lock().active -= 1;
                    shared.shutdown();
                    return Err(ServerError::Spawn {
                        consumer: n,
                        source,
                    });
                }
            }
        }

        let mut summary = produce(shared, requests);
        shared.wait_drained();

        for handle in handles {
            summary.responses += handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
        }
        Ok(summary)
    })
}

/// Decodes requests onto the queue until the sentinel or end of input, then
/// starts shutdown. Input after the sentinel is never read.
fn produce<R: Read>(shared: &Shared, requests: RequestReader<R>) -> RunSummary {
    let mut summary = RunSummary::default();
    for req in requests {
        if req.command.is_sentinel() {
            summary.sentinel = true;
            break;
        }
        summary.requests += 1;
        shared.enqueue(req);
    }

    if !summary.sentinel {
        tracing::info!("input ended without DONE; shutting down consumers");
    }
    shared.shutdown();
    summary
}

/// Consumer loop. Returns the number of replies this consumer wrote.
fn consume<F, W>(n: usize, shared: &Shared, dispatcher: &Dispatcher<'_, F, W>) -> u64
where
    F: FeedStore + ?Sized,
    W: Write,
{
    let _active = ActiveConsumer(shared);
    tracing::debug!(consumer = n, "consumer started");

    let mut responses = 0u64;
    while shared.wait_for_work() {
        // `None` means another consumer won the race for this item.
        if let Some(req) = shared.queue.pop() {
            if dispatcher.dispatch(req) {
                responses += 1;
            }
        }
    }

    tracing::debug!(consumer = n, responses, "consumer terminated");
    responses
}
