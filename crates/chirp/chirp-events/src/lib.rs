#![forbid(unsafe_code)]

pub mod request;
pub mod response;

pub use request::{Command, Request};
pub use response::{FeedSnapshot, Post, Response};

/// Correlation identifier carried from a request to its response.
pub type RequestId = i64;
