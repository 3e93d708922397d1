// Feed: the post store shared by every consumer thread.
//
// Posts are kept in a Vec sorted by descending timestamp, so the FEED reply
// is a straight clone and lookups are a binary search. Timestamps are f64
// and compared with `total_cmp`, which gives NaN and -0.0 a fixed place
// instead of breaking the ordering.
//
// Writes (add/remove) take the exclusive side of the bounded lock; reads
// (contains/snapshot) take the shared side, at most `max_readers` at once.

use chirp_events::Post;
use chirp_sync::{BoundedRwLock, LockError};
use std::cmp::Ordering;

use crate::store::FeedStore;

/// Reader cap used when the configuration does not name one.
pub const DEFAULT_MAX_READERS: usize = 32;

#[derive(Debug)]
pub struct Feed {
    posts: BoundedRwLock<Vec<Post>>,
}

impl Feed {
    /// Creates an empty feed whose lock admits at most `max_readers` readers.
    pub fn new(max_readers: usize) -> Result<Self, LockError> {
        Ok(Self {
            posts: BoundedRwLock::new(Vec::new(), max_readers)?,
        })
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }

    pub fn max_readers(&self) -> usize {
        self.posts.max_readers()
    }
}

/// Index of the first post not newer than `timestamp`.
#[inline]
fn lower_bound(posts: &[Post], timestamp: f64) -> usize {
    posts.partition_point(|p| p.timestamp.total_cmp(&timestamp) == Ordering::Greater)
}

#[inline]
fn find(posts: &[Post], timestamp: f64) -> Option<usize> {
    let idx = lower_bound(posts, timestamp);
    posts
        .get(idx)
        .filter(|p| p.timestamp.total_cmp(&timestamp) == Ordering::Equal)
        .map(|_| idx)
}

impl FeedStore for Feed {
    fn add(&self, body: String, timestamp: f64) {
        let mut posts = self.posts.write();
        let idx = lower_bound(&posts, timestamp);
        posts.insert(idx, Post { body, timestamp });
    }

    fn remove(&self, timestamp: f64) -> bool {
        let mut posts = self.posts.write();
        match find(&posts, timestamp) {
            Some(idx) => {
                posts.remove(idx);
                true
            }
            None => {
                tracing::trace!(timestamp, "remove: no such post");
                false
            }
        }
    }

    fn contains(&self, timestamp: f64) -> bool {
        find(&self.posts.read(), timestamp).is_some()
    }

    fn snapshot(&self) -> Vec<Post> {
        self.posts.read().clone()
    }
}
