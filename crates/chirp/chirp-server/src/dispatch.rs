use chirp_events::{Command, FeedSnapshot, Request, Response};
use chirp_feed::FeedStore;
use serde::Serialize;
use std::io::Write;

use crate::codec::ResponseWriter;

/// What a request produces on the output stream.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ack(Response),
    Feed(FeedSnapshot),
}

/// Applies one request to the feed.
///
/// Returns `None` for commands that produce no output: the sentinel (which
/// the read loops intercept before it gets here) and unrecognized commands.
pub fn apply<F: FeedStore + ?Sized>(feed: &F, req: Request) -> Option<Reply> {
    let id = req.id;
    let reply = match req.command {
        Command::Add => {
            feed.add(req.body, req.timestamp);
            Reply::Ack(Response::new(true, id))
        }
        Command::Remove => Reply::Ack(Response::new(feed.remove(req.timestamp), id)),
        Command::Contains => Reply::Ack(Response::new(feed.contains(req.timestamp), id)),
        Command::Feed => Reply::Feed(FeedSnapshot {
            id,
            feed: feed.snapshot(),
        }),
        Command::Done | Command::Unknown => return None,
    };
    Some(reply)
}

/// Applies requests and writes their replies. Shared by every consumer.
pub struct Dispatcher<'a, F: ?Sized, W> {
    feed: &'a F,
    out: &'a ResponseWriter<W>,
}

impl<'a, F: FeedStore + ?Sized, W: Write> Dispatcher<'a, F, W> {
    pub fn new(feed: &'a F, out: &'a ResponseWriter<W>) -> Self {
        Self { feed, out }
    }

    /// Returns `true` if a reply was written. Write failures are logged and
    /// otherwise ignored so later requests are still served.
    pub fn dispatch(&self, req: Request) -> bool {
        let (id, command) = (req.id, req.command);
        tracing::trace!(id, ?command, "dispatch");

        let Some(reply) = apply(self.feed, req) else {
            tracing::debug!(id, ?command, "no reply for command");
            return false;
        };

        match self.out.write(&reply) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to write reply");
                false
            }
        }
    }
}
