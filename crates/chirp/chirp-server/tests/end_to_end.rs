//! End-to-end runs of the server over in-memory input and output.
//!
//! ```bash
//! cargo test -p chirp-server --test end_to_end
//! ```

use chirp_feed::{Feed, FeedStore};
use chirp_server::{Mode, RunSummary, Server};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::num::NonZeroUsize;

fn concurrent(n: usize) -> Mode {
    Mode::Concurrent {
        consumers: NonZeroUsize::new(n).unwrap(),
    }
}

fn server(mode: Mode) -> Server<Feed> {
    Server::new(Feed::new(8).unwrap(), mode)
}

fn run(server: &Server<Feed>, input: &str) -> (RunSummary, Vec<Value>) {
    let mut out = Vec::new();
    let summary = server.run(input.as_bytes(), &mut out).unwrap();
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("every output line is one JSON record"))
        .collect();
    (summary, lines)
}

#[test]
fn add_then_contains_in_order() {
    let input = r#"
        {"command":"ADD","id":1,"body":"hello","timestamp":1.0}
        {"command":"CONTAINS","id":2,"timestamp":1.0}
        {"command":"DONE"}
    "#;
    let (summary, out) = run(&server(Mode::Sequential), input);

    assert_eq!(
        out,
        [json!({"Success": true, "Id": 1}), json!({"Success": true, "Id": 2})]
    );
    assert_eq!(
        summary,
        RunSummary {
            mode: Mode::Sequential,
            requests: 2,
            responses: 2,
            sentinel: true
        }
    );
}

#[test]
fn remove_on_empty_feed_fails() {
    let input = r#"{"command":"REMOVE","id":5,"timestamp":99.0} {"command":"DONE"}"#;
    let (_, out) = run(&server(Mode::Sequential), input);
    assert_eq!(out, [json!({"Success": false, "Id": 5})]);
}

#[test]
fn feed_reply_lists_posts_newest_first() {
    let input = r#"
        {"command":"ADD","id":1,"body":"first","timestamp":10}
        {"command":"ADD","id":2,"body":"second","timestamp":20}
        {"command":"FEED","id":3}
        {"command":"DONE"}
    "#;
    let (_, out) = run(&server(Mode::Sequential), input);
    assert_eq!(
        out[2],
        json!({
            "Id": 3,
            "Feed": [
                {"Body": "second", "Timestamp": 20.0},
                {"Body": "first", "Timestamp": 10.0}
            ]
        })
    );
}

#[test]
fn nothing_after_the_sentinel_is_processed() {
    let input = r#"
        {"command":"ADD","id":1,"body":"kept","timestamp":1}
        {"command":"DONE"}
        {"command":"ADD","id":2,"body":"dropped","timestamp":2}
    "#;
    for mode in [Mode::Sequential, concurrent(2)] {
        let srv = server(mode);
        let (summary, out) = run(&srv, input);
        assert_eq!(out, [json!({"Success": true, "Id": 1})], "{mode}");
        assert!(summary.sentinel);
        assert!(!srv.feed().contains(2.0));
    }
}

#[test]
fn unknown_commands_are_ignored() {
    let input = r#"
        {"command":"SHOUT","id":1}
        {"command":"ADD","id":2,"body":"x","timestamp":3}
        {"command":"DONE"}
    "#;
    let (summary, out) = run(&server(Mode::Sequential), input);
    assert_eq!(out, [json!({"Success": true, "Id": 2})]);
    assert_eq!(summary.requests, 2);
    assert_eq!(summary.responses, 1);
}

#[test]
fn malformed_record_ends_input_like_eof() {
    let input = r#"
        {"command":"ADD","id":1,"body":"x","timestamp":1}
        {"command": 
    "#;
    let (summary, out) = run(&server(Mode::Sequential), input);
    assert_eq!(out.len(), 1);
    assert!(!summary.sentinel);
}

/// 200 ADDs across 4 consumers: every id answered exactly once.
#[test]
fn concurrent_adds_are_each_answered_once() {
    const N: i64 = 200;
    let mut input = String::new();
    for id in 1..=N {
        input.push_str(&format!(
            "{{\"command\":\"ADD\",\"id\":{id},\"body\":\"post {id}\",\"timestamp\":{id}}}\n"
        ));
    }
    input.push_str(r#"{"command":"DONE"}"#);

    let srv = server(concurrent(4));
    let (summary, out) = run(&srv, &input);

    assert_eq!(out.len(), N as usize);
    let mut ids = HashSet::new();
    for record in &out {
        assert_eq!(record["Success"], json!(true));
        let id = record["Id"].as_i64().unwrap();
        assert!((1..=N).contains(&id));
        assert!(ids.insert(id), "id {id} answered twice");
    }
    assert_eq!(summary.responses, N as u64);
    assert_eq!(summary.mode, srv.mode());
    assert_eq!(summary.mode, concurrent(4));
    assert_eq!(srv.feed().len(), N as usize);
}

/// Without a sentinel the consumers must still be released when input ends,
/// and whatever was queued is still served.
#[test]
fn concurrent_shutdown_on_end_of_input() {
    let input = r#"
        {"command":"ADD","id":1,"body":"a","timestamp":1}
        {"command":"ADD","id":2,"body":"b","timestamp":2}
    "#;
    let (summary, out) = run(&server(concurrent(3)), input);
    assert_eq!(out.len(), 2);
    assert!(!summary.sentinel);
}

/// More consumers than requests, and no requests at all.
#[test]
fn concurrent_idle_consumers_terminate() {
    let (summary, out) = run(&server(concurrent(16)), r#"{"command":"DONE"}"#);
    assert!(out.is_empty());
    assert_eq!(summary.requests, 0);

    let (_, out) = run(&server(concurrent(16)), "");
    assert!(out.is_empty());
}

/// Mixed workload: all ADDs complete before DONE, so a final sequential
/// check sees every post, and every reply line is intact.
#[test]
fn concurrent_mixed_commands_keep_lines_intact() {
    let mut input = String::new();
    for id in 0..300 {
        let cmd = match id % 3 {
            0 => "ADD",
            1 => "CONTAINS",
            _ => "FEED",
        };
        input.push_str(&format!(
            "{{\"command\":\"{cmd}\",\"id\":{id},\"body\":\"b{id}\",\"timestamp\":{id}}}\n"
        ));
    }
    input.push_str(r#"{"command":"DONE"}"#);

    let srv = server(concurrent(6));
    let (summary, out) = run(&srv, &input);

    assert_eq!(out.len(), 300);
    assert_eq!(summary.responses, 300);
    let ids: HashSet<_> = out.iter().map(|r| r["Id"].as_i64().unwrap()).collect();
    assert_eq!(ids.len(), 300);
    assert_eq!(srv.feed().len(), 100);
}
