mod queue;
mod rwlock;

pub use queue::LockFreeQueue;
pub use rwlock::{
    AdmissionPolicy, BoundedRwLock, LockError, RawBoundedRwLock, RawReadGuard, RawWriteGuard,
    ReadGuard, WriteGuard,
};
