mod feed;
mod store;

pub use feed::{DEFAULT_MAX_READERS, Feed};
pub use store::FeedStore;
