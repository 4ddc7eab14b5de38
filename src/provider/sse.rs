//! Server-sent events decoder (Bytes -> JSON Value)
//!
//! - frames are separated by a blank line
//! - `data:` lines carry the payload; comment lines (`:`) and other fields are ignored
//! - a `[DONE]` payload ends the stream
//! - a payload that is not JSON fails the stream with `Error::Serialization`

use crate::BoxStream;
use bytes::{Buf, Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::Value;

const DONE_SIGNAL: &str = "[DONE]";

enum Frame {
    Data(Value),
    Invalid(serde_json::Error),
    Done,
    Skip,
}

/// Decode a raw SSE byte stream into the JSON payload of each frame.
///
/// Bytes are buffered undecoded until a full frame is available, so multi-byte
/// UTF-8 sequences split across network chunks survive intact.
pub fn decode(input: BoxStream<'static, Bytes>) -> BoxStream<'static, Value> {
    let stream = stream::unfold(
        (input, BytesMut::new(), false),
        |(mut input, mut buf, finished)| async move {
            if finished {
                return None;
            }
            loop {
                // If we have a full frame in buffer, emit it.
                if let Some((end, delim_len)) = find_frame_end(&buf) {
                    let frame = buf.split_to(end);
                    buf.advance(delim_len);
                    match parse_frame(&frame) {
                        Frame::Data(v) => return Some((Ok(v), (input, buf, false))),
                        Frame::Invalid(e) => return Some((Err(e.into()), (input, buf, true))),
                        Frame::Done => return None,
                        Frame::Skip => continue,
                    }
                }

                // Need more data.
                match input.next().await {
                    Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (input, buf, true))),
                    None => {
                        // EOF: try the remaining buffer once
                        return match parse_frame(&buf) {
                            Frame::Data(v) => Some((Ok(v), (input, BytesMut::new(), true))),
                            Frame::Invalid(e) => {
                                Some((Err(e.into()), (input, BytesMut::new(), true)))
                            }
                            Frame::Done | Frame::Skip => None,
                        };
                    }
                }
            }
        },
    );
    Box::pin(stream)
}

/// Position of the first blank-line delimiter and its length.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|i| (i, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_frame(raw: &[u8]) -> Frame {
    let text = String::from_utf8_lossy(raw);
    let mut data = String::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    let payload = data.trim();
    if payload.is_empty() {
        return Frame::Skip;
    }
    if payload == DONE_SIGNAL {
        return Frame::Done;
    }
    match serde_json::from_str(payload) {
        Ok(v) => Frame::Data(v),
        Err(e) => {
            tracing::warn!(error = %e, "SSE frame payload is not valid JSON");
            Frame::Invalid(e)
        }
    }
}
