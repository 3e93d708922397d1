//! Bounded read-write lock built on a mutex and a single condition variable.
//!
//! The lock admits either one writer or up to `max_readers` concurrent readers.
//! All bookkeeping (`writers`, `readers`, `waiting_writers`) lives behind one
//! mutex; every state change that can unblock somebody is followed by a
//! wake-up on the shared condition variable.
//!
//! # Layers
//!
//! - [`RawBoundedRwLock`]: counts holders and protects no data. It can run
//!   under either [`AdmissionPolicy`], including the permissive `Legacy` one.
//! - [`BoundedRwLock<T>`]: owns a `T` and hands out `&T` / `&mut T` through
//!   guards. It is always `Strict`, because `Legacy` admission can put a
//!   writer next to readers and that would alias a `&mut T`.
//!
//! # Policies
//!
//! **Strict** (default):
//! 1. A writer waits until there is no writer and no reader.
//! 2. A reader waits until there is no writer, no *waiting* writer, and fewer
//!    than `max_readers` readers. Blocking new readers behind a waiting writer
//!    keeps a steady stream of readers from starving writers.
//! 3. Every wait re-checks its condition in a loop (spurious wake-ups and
//!    stolen wake-ups are harmless).
//! 4. Every release broadcasts, so readers and writers waiting on the same
//!    condition variable all get to re-evaluate.
//!
//! **Legacy** reproduces the permissive admission rules of the older server:
//! 1. A writer only waits for other writers; active readers are ignored.
//! 2. A reader performs at most one wait and does not re-check the capacity
//!    condition afterwards, so it may be admitted past `max_readers`.
//! 3. Every release wakes exactly one waiter.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Admission rules applied by a [`RawBoundedRwLock`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// True reader/writer exclusion with an enforced reader cap.
    #[default]
    Strict,
    /// Behavioral parity with the permissive reference lock.
    Legacy,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LockError {
    #[error("max_readers must be at least 1")]
    ZeroReaders,
}

#[derive(Debug, Default, Clone, Copy)]
struct LockState {
    writers: usize,
    readers: usize,
    /// Writers blocked in `write()`. Only tracked under `Strict`.
    waiting_writers: usize,
}

/// Counting read-write lock with a fixed reader cap. Protects no data.
pub struct RawBoundedRwLock {
    state: Mutex<LockState>,
    cond: Condvar,
    max_readers: usize,
    policy: AdmissionPolicy,
}

impl RawBoundedRwLock {
    /// Creates a strict lock admitting at most `max_readers` readers.
    ///
    /// # Errors
    /// Returns [`LockError::ZeroReaders`] if `max_readers` is zero.
    pub fn new(max_readers: usize) -> Result<Self, LockError> {
        Self::with_policy(max_readers, AdmissionPolicy::Strict)
    }

    pub fn with_policy(max_readers: usize, policy: AdmissionPolicy) -> Result<Self, LockError> {
        if max_readers == 0 {
            return Err(LockError::ZeroReaders);
        }
        Ok(Self {
            state: Mutex::new(LockState::default()),
            cond: Condvar::new(),
            max_readers,
            policy,
        })
    }

    /// Acquires exclusive access, blocking until the policy admits a writer.
    /// Dropping the guard releases it.
    pub fn write(&self) -> RawWriteGuard<'_> {
        let mut st = self.state.lock();
        match self.policy {
            AdmissionPolicy::Strict => {
                st.waiting_writers += 1;
                while st.writers > 0 || st.readers > 0 {
                    self.cond.wait(&mut st);
                }
                st.waiting_writers -= 1;
            }
            AdmissionPolicy::Legacy => {
                if st.writers == 0 {
                    self.cond.notify_one();
                } else {
                    while st.writers > 0 {
                        self.cond.wait(&mut st);
                    }
                }
            }
        }
        st.writers += 1;
        RawWriteGuard { lock: self }
    }

    /// Acquires shared access, blocking until the policy admits a reader.
    /// Dropping the guard releases it.
    pub fn read(&self) -> RawReadGuard<'_> {
        let mut st = self.state.lock();
        match self.policy {
            AdmissionPolicy::Strict => {
                while st.writers > 0 || st.waiting_writers > 0 || st.readers >= self.max_readers {
                    self.cond.wait(&mut st);
                }
            }
            AdmissionPolicy::Legacy => {
                if st.writers == 0 && st.readers < self.max_readers {
                    self.cond.notify_one();
                } else if st.writers > 0 || st.readers == self.max_readers {
                    // One wait, no re-check.
                    self.cond.wait(&mut st);
                }
            }
        }
        st.readers += 1;
        RawReadGuard { lock: self }
    }

    fn release_write(&self) {
        let mut st = self.state.lock();
        debug_assert!(st.writers > 0, "write release without a writer");
        st.writers -= 1;
        self.wake(st);
    }

    fn release_read(&self) {
        let mut st = self.state.lock();
        debug_assert!(st.readers > 0, "read release without a reader");
        st.readers -= 1;
        self.wake(st);
    }

    #[inline]
    fn wake(&self, st: MutexGuard<'_, LockState>) {
        drop(st);
        match self.policy {
            AdmissionPolicy::Strict => {
                self.cond.notify_all();
            }
            AdmissionPolicy::Legacy => {
                self.cond.notify_one();
            }
        }
    }

    /// Number of readers currently holding the lock.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writers > 0
    }

    pub fn max_readers(&self) -> usize {
        self.max_readers
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }
}

impl fmt::Debug for RawBoundedRwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = *self.state.lock();
        f.debug_struct("RawBoundedRwLock")
            .field("writers", &st.writers)
            .field("readers", &st.readers)
            .field("waiting_writers", &st.waiting_writers)
            .field("max_readers", &self.max_readers)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Exclusive hold on a [`RawBoundedRwLock`]; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RawWriteGuard<'a> {
    lock: &'a RawBoundedRwLock,
}

impl Drop for RawWriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

/// Shared hold on a [`RawBoundedRwLock`]; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RawReadGuard<'a> {
    lock: &'a RawBoundedRwLock,
}

impl Drop for RawReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Data-owning bounded read-write lock. Always uses [`AdmissionPolicy::Strict`].
pub struct BoundedRwLock<T: ?Sized> {
    raw: RawBoundedRwLock,
    data: UnsafeCell<T>,
}

// SAFETY: same bounds as `std::sync::RwLock`. The strict raw lock never lets a
// `&mut T` coexist with any other reference to the data.
unsafe impl<T: ?Sized + Send> Send for BoundedRwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for BoundedRwLock<T> {}

impl<T> BoundedRwLock<T> {
    /// # Errors
    /// Returns [`LockError::ZeroReaders`] if `max_readers` is zero.
    pub fn new(value: T, max_readers: usize) -> Result<Self, LockError> {
        Ok(Self {
            raw: RawBoundedRwLock::with_policy(max_readers, AdmissionPolicy::Strict)?,
            data: UnsafeCell::new(value),
        })
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> BoundedRwLock<T> {
    pub fn read(&self) -> ReadGuard<'_, T> {
        let raw = self.raw.read();
        // SAFETY: a strict read hold excludes every writer.
        let data = unsafe { &*self.data.get() };
        ReadGuard { _raw: raw, data }
    }

    pub fn write(&self) -> WriteGuard<'_, T> {
        let raw = self.raw.write();
        // SAFETY: a strict write hold excludes every reader and writer.
        let data = unsafe { &mut *self.data.get() };
        WriteGuard { _raw: raw, data }
    }

    pub fn readers(&self) -> usize {
        self.raw.readers()
    }

    pub fn max_readers(&self) -> usize {
        self.raw.max_readers()
    }
}

impl<T: ?Sized> fmt::Debug for BoundedRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRwLock").field("raw", &self.raw).finish_non_exhaustive()
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, T: ?Sized> {
    _raw: RawReadGuard<'a>,
    data: &'a T,
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a, T: ?Sized> {
    _raw: RawWriteGuard<'a>,
    data: &'a mut T,
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}
