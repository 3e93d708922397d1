use chirp_events::Post;

/// Operations the dispatcher performs on a feed.
///
/// Every call must be safe to make from several threads at once; the
/// implementation owns whatever locking that takes.
pub trait FeedStore: Send + Sync {
    fn add(&self, body: String, timestamp: f64);

    /// Removes one post with this timestamp. Returns `false` if none existed.
    fn remove(&self, timestamp: f64) -> bool;

    fn contains(&self, timestamp: f64) -> bool;

    /// Current contents, newest first.
    fn snapshot(&self) -> Vec<Post>;
}

