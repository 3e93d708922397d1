pub mod codec;
pub mod dispatch;
mod error;
mod orchestrator;

pub use codec::{RequestReader, ResponseWriter};
pub use dispatch::{Dispatcher, Reply, apply};
pub use error::ServerError;

use chirp_feed::FeedStore;
use std::fmt;
use std::io::{Read, Write};
use std::num::NonZeroUsize;

/// How requests are processed. Chosen once, before any input is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// One thread: decode, dispatch, write, repeat.
    #[default]
    Sequential,
    /// One producer thread plus `consumers` worker threads.
    Concurrent { consumers: NonZeroUsize },
}

impl Mode {
    pub fn from_consumers(consumers: Option<NonZeroUsize>) -> Self {
        match consumers {
            Some(consumers) => Mode::Concurrent { consumers },
            None => Mode::Sequential,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sequential => f.write_str("sequential"),
            Mode::Concurrent { consumers } => write!(f, "concurrent ({consumers} consumers)"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: Mode,
    /// Requests decoded before the sentinel, including ignored ones.
    pub requests: u64,
    /// Replies successfully written.
    pub responses: u64,
    /// `false` when input ended (or failed to decode) before `DONE`.
    pub sentinel: bool,
}

pub struct Server<F> {
    feed: F,
    mode: Mode,
}

impl<F: FeedStore> Server<F> {
    pub fn new(feed: F, mode: Mode) -> Self {
        Self { feed, mode }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Serves requests from `input` until the sentinel or end of input.
    ///
    /// In concurrent mode this returns only after every consumer thread has
    /// drained the queue and terminated.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<RunSummary, ServerError>
    where
        R: Read,
        W: Write + Send,
    {
        tracing::info!(mode = %self.mode, "server starting");

        let requests = RequestReader::new(input);
        let out = ResponseWriter::new(output);
        let dispatcher = Dispatcher::new(&self.feed, &out);

        let summary = match self.mode {
            Mode::Sequential => orchestrator::run_sequential(requests, &dispatcher),
            Mode::Concurrent { consumers } => {
                orchestrator::run_concurrent(consumers, requests, &dispatcher)?
            }
        };
        let summary = RunSummary {
            mode: self.mode,
            ..summary
        };

        tracing::info!(
            mode = %summary.mode,
            requests = summary.requests,
            responses = summary.responses,
            sentinel = summary.sentinel,
            "server stopped"
        );
        Ok(summary)
    }
}
