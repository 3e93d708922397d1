//! Newline-delimited JSON framing for the request and response streams.

use chirp_events::Request;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};
use std::io::{self, Read, Write};

/// Decodes a stream of concatenated JSON request objects.
///
/// The first decode error ends the stream exactly like end of input does:
/// it is logged and the iterator returns `None` from then on.
pub struct RequestReader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Request>,
    closed: bool,
}

impl<R: Read> RequestReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            stream: Deserializer::from_reader(input).into_iter(),
            closed: false,
        }
    }
}

impl<R: Read> Iterator for RequestReader<R> {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        if self.closed {
            return None;
        }
        match self.stream.next() {
            Some(Ok(req)) => Some(req),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "request decode failed; closing input");
                self.closed = true;
                None
            }
            None => {
                tracing::debug!("end of input");
                self.closed = true;
                None
            }
        }
    }
}

/// Serializes records onto a shared output.
///
/// Each record is encoded into its own buffer first and then written and
/// flushed under the mutex, so lines from different consumers never interleave.
pub struct ResponseWriter<W> {
    out: Mutex<W>,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, record: &T) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut out = self.out.lock();
        out.write_all(&line)?;
        out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_events::{Command, Response};

    #[test]
    fn reads_concatenated_and_newline_separated_records() {
        let input = r#"{"command":"ADD","id":1,"body":"a","timestamp":1}{"command":"FEED","id":2}
            {"command":"DONE"}"#;
        let cmds: Vec<_> = RequestReader::new(input.as_bytes())
            .map(|r| r.command)
            .collect();
        assert_eq!(cmds, [Command::Add, Command::Feed, Command::Done]);
    }

    #[test]
    fn decode_error_ends_the_stream() {
        let input = r#"{"command":"ADD","id":1} {not json} {"command":"ADD","id":3}"#;
        let mut reader = RequestReader::new(input.as_bytes());
        assert_eq!(reader.next().map(|r| r.id), Some(1));
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(RequestReader::new(&b""[..]).count(), 0);
    }

    #[test]
    fn writer_emits_one_line_per_record() {
        let writer = ResponseWriter::new(Vec::new());
        writer.write(&Response::new(true, 1)).unwrap();
        writer.write(&Response::new(false, 2)).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "{\"Success\":true,\"Id\":1}\n{\"Success\":false,\"Id\":2}\n");
    }
}
