use serde::Serialize;

use crate::RequestId;

/// Acknowledgement written once per processed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub success: bool,
    pub id: RequestId,
}

impl Response {
    #[inline]
    pub fn new(success: bool, id: RequestId) -> Self {
        Self { success, id }
    }
}

/// A single feed entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Post {
    pub body: String,
    pub timestamp: f64,
}

impl Post {
    pub fn new(body: impl Into<String>, timestamp: f64) -> Self {
        Self {
            body: body.into(),
            timestamp,
        }
    }
}

/// Reply to a `FEED` request: the feed contents, newest first, tagged
/// with the id of the request that asked for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedSnapshot {
    pub id: RequestId,
    pub feed: Vec<Post>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_wire_shape() {
        let json = serde_json::to_string(&Response::new(true, 1)).unwrap();
        assert_eq!(json, r#"{"Success":true,"Id":1}"#);
    }

    #[test]
    fn snapshot_wire_shape() {
        let snap = FeedSnapshot {
            id: 4,
            feed: vec![Post::new("b", 2.5), Post::new("a", 1.0)],
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(
            json,
            r#"{"Id":4,"Feed":[{"Body":"b","Timestamp":2.5},{"Body":"a","Timestamp":1.0}]}"#
        );
    }
}
