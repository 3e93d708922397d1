//! Unbounded multi-producer, multi-consumer lock-free FIFO queue.
//!
//! A singly linked list with a permanent dummy node at the head. Producers
//! link new nodes after the tail with a compare-and-swap; consumers swing the
//! head forward and take the payload of the node that becomes the new dummy.
//! No mutex ever protects the list.
//!
//! # Layout
//!
//! ```text
//!   head                                   tail
//!    │                                      │
//!    v                                      v
//! ┌───────┐    ┌───────┐    ┌───────┐    ┌───────┐
//! │ dummy │ -> │  r1   │ -> │  r2   │ -> │  r3   │ -> null
//! └───────┘    └───────┘    └───────┘    └───────┘
//! ```
//!
//! The payload of the dummy node is never handed out. After a successful
//! `pop`, the node that carried `r1` becomes the dummy and its payload slot is
//! treated as moved-out.
//!
//! # Progress
//!
//! - `push` and `pop` never block; a lost race retries from fresh pointers.
//! - The tail may lag one node behind the real end of the list (a producer
//!   linked its node but has not swung the tail yet). Any thread that sees a
//!   lagging tail helps advance it, so one stalled producer cannot stop others.
//!
//! # Reclamation
//!
//! Retired dummy nodes are handed to `crossbeam::epoch` and freed once every
//! thread that was pinned at retirement time has unpinned. A concurrent `pop`
//! still dereferencing an old head therefore never touches freed memory.

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::CachePadded;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

struct Node<T> {
    /// Initialized for every node except the current dummy.
    payload: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn dummy() -> Self {
        Self {
            payload: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn with(value: T) -> Self {
        Self {
            payload: MaybeUninit::new(value),
            next: Atomic::null(),
        }
    }
}

/// Lock-free FIFO. Enqueue and dequeue are linearizable; [`is_empty`]
/// is only a momentary hint.
///
/// [`is_empty`]: LockFreeQueue::is_empty
pub struct LockFreeQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
}

// SAFETY: payloads move between threads but are never shared; every node
// reachable from the queue is only touched through atomic pointers.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        let queue = Self {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
        };
        // SAFETY: nobody else can see the queue yet.
        unsafe {
            let guard = epoch::unprotected();
            let dummy = Owned::new(Node::dummy()).into_shared(guard);
            queue.head.store(dummy, Relaxed);
            queue.tail.store(dummy, Relaxed);
        }
        queue
    }

    /// Appends `value` at the tail.
    pub fn push(&self, value: T) {
        let guard = &epoch::pin();
        let node = Owned::new(Node::with(value)).into_shared(guard);

        loop {
            let tail = self.tail.load(Acquire, guard);
            // SAFETY: tail is never null and never retired while reachable.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Acquire, guard);

            // Tail moved while we were reading its successor.
            if tail != self.tail.load(Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(Shared::null(), node, Release, Relaxed, guard)
                    .is_ok()
                {
                    // Failure means another thread already helped.
                    let _ = self.tail.compare_exchange(tail, node, Release, Relaxed, guard);
                    return;
                }
            } else {
                // Another producer linked a node but has not swung the tail yet.
                let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, guard);
            }
        }
    }

    /// Removes the value at the head, or returns `None` if the queue is empty.
    /// Never waits for a producer.
    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.pop_in(guard)
    }

    fn pop_in(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.head.load(Acquire, guard);
            // SAFETY: head is never null; the guard keeps it alive.
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Acquire, guard);

            // SAFETY: a non-null successor is kept alive by the guard.
            let next_ref = unsafe { next.as_ref() }?;

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, guard)
                .is_ok()
            {
                // Keep the tail from pointing at the node we are about to retire.
                let tail = self.tail.load(Relaxed, guard);
                if tail == head {
                    let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, guard);
                }
                // SAFETY: winning the head CAS gives this thread sole ownership of
                // `next`'s payload; `next` is now the dummy and its payload is
                // never read again. `head` is unreachable from the queue.
                unsafe {
                    guard.defer_destroy(head);
                    return Some(next_ref.payload.assume_init_read());
                }
            }
        }
    }

    /// Returns `true` when head and tail point at the same node.
    ///
    /// A concurrent `push` can make this stale immediately: treat `false` as a
    /// reason to try `pop`, not a promise that it will succeed.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        self.head.load(Acquire, guard) == self.tail.load(Acquire, guard)
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread holds a reference, so the
        // unprotected guard frees retired nodes immediately.
        unsafe {
            let guard = epoch::unprotected();
            while self.pop_in(guard).is_some() {}
            let dummy = self.head.load(Relaxed, guard);
            drop(dummy.into_owned());
        }
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}
