use serde::Deserialize;

use crate::RequestId;

/// Operation named by an incoming record.
///
/// Anything outside the known set decodes to `Unknown` so that a stray
/// command string is ignored by dispatch instead of ending the input stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum Command {
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "REMOVE")]
    Remove,
    #[serde(rename = "CONTAINS")]
    Contains,
    #[serde(rename = "FEED")]
    Feed,
    /// Sentinel: no further requests follow.
    #[serde(rename = "DONE")]
    Done,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Command {
    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == Command::Done
    }
}

/// One decoded input record. Immutable once decoded.
///
/// Every field is optional on the wire; missing fields keep their zero
/// value, so `{"command":"DONE"}` is a complete record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "lowercase")]
pub struct Request {
    #[serde(alias = "Command")]
    pub command: Command,
    #[serde(alias = "Id")]
    pub id: RequestId,
    /// Only meaningful for `ADD`.
    #[serde(alias = "Body")]
    pub body: String,
    /// Key of the feed entry this request refers to.
    #[serde(alias = "Timestamp")]
    pub timestamp: f64,
}

impl Request {
    pub fn new(command: Command, id: RequestId) -> Self {
        Self {
            command,
            id,
            ..Self::default()
        }
    }

    pub fn add(id: RequestId, body: impl Into<String>, timestamp: f64) -> Self {
        Self {
            command: Command::Add,
            id,
            body: body.into(),
            timestamp,
        }
    }

    pub fn with_timestamp(command: Command, id: RequestId, timestamp: f64) -> Self {
        Self {
            command,
            id,
            timestamp,
            ..Self::default()
        }
    }

    pub fn done() -> Self {
        Self::new(Command::Done, 0)
    }
}
