//! Append-only segmented byte buffer.
//!
//! Chunks are stored as reference-counted [`Bytes`] handles, so appending never
//! copies payload data. Each segment remembers how many bytes precede it, which
//! lets the built view map any absolute offset back to its segment.

use bytes::{Buf, Bytes, BytesMut};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Segment {
    bytes: Bytes,
    running_index: usize,
}

/// Write-once accumulator for byte chunks.
#[derive(Debug, Default)]
pub struct SegmentedBuffer {
    segments: Vec<Segment>,
    len: usize,
}

impl SegmentedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are ignored.
    pub fn append(&mut self, chunk: impl Into<Bytes>) {
        let bytes = chunk.into();
        if bytes.is_empty() {
            return;
        }
        let n = bytes.len();
        self.segments.push(Segment {
            bytes,
            running_index: self.len,
        });
        self.len += n;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Consume the buffer and return a read-only view over every appended chunk.
    pub fn build(mut self) -> SegmentedBytes {
        let repr = match self.segments.len() {
            0 => Repr::Empty,
            1 => match self.segments.pop() {
                Some(seg) => Repr::Single(seg.bytes),
                None => Repr::Empty,
            },
            _ => Repr::Multi {
                segments: Arc::from(self.segments),
                len: self.len,
            },
        };
        SegmentedBytes { repr }
    }
}

#[derive(Debug, Clone, Default)]
enum Repr {
    #[default]
    Empty,
    Single(Bytes),
    Multi {
        segments: Arc<[Segment]>,
        len: usize,
    },
}

/// Logically contiguous, read-only view over one or more byte chunks.
///
/// Cloning is cheap: the chunks are shared, not copied.
#[derive(Debug, Clone, Default)]
pub struct SegmentedBytes {
    repr: Repr,
}

impl SegmentedBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Single(b) => b.len(),
            Repr::Multi { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segment_count(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Single(_) => 1,
            Repr::Multi { segments, .. } => segments.len(),
        }
    }

    /// The underlying chunk when the view wraps exactly one.
    pub fn as_single(&self) -> Option<&Bytes> {
        match &self.repr {
            Repr::Single(b) => Some(b),
            _ => None,
        }
    }

    /// Iterate the chunks in append order.
    pub fn chunks(&self) -> Chunks<'_> {
        match &self.repr {
            Repr::Empty => Chunks {
                single: None,
                rest: Default::default(),
            },
            Repr::Single(b) => Chunks {
                single: Some(b),
                rest: Default::default(),
            },
            Repr::Multi { segments, .. } => Chunks {
                single: None,
                rest: segments.iter(),
            },
        }
    }

    /// Map an absolute offset to `(segment index, offset within segment)`.
    pub fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        if offset >= self.len() {
            return None;
        }
        match &self.repr {
            Repr::Empty => None,
            Repr::Single(_) => Some((0, offset)),
            Repr::Multi { segments, .. } => {
                let idx = segments
                    .partition_point(|s| s.running_index <= offset)
                    .checked_sub(1)?;
                Some((idx, offset - segments[idx].running_index))
            }
        }
    }

    /// Byte at an absolute offset.
    pub fn get(&self, offset: usize) -> Option<u8> {
        let (seg, inner) = self.locate(offset)?;
        match &self.repr {
            Repr::Empty => None,
            Repr::Single(b) => b.get(inner).copied(),
            Repr::Multi { segments, .. } => segments[seg].bytes.get(inner).copied(),
        }
    }

    /// A [`Buf`] cursor over the view. Use `cursor().reader()` to stream it into a parser.
    pub fn cursor(&self) -> SegmentedCursor<'_> {
        let mut chunks = self.chunks();
        let current: &[u8] = chunks.next().map(|b| b.as_ref()).unwrap_or(&[]);
        SegmentedCursor {
            current,
            rest: chunks,
            remaining: self.len(),
        }
    }

    /// Flatten into one contiguous buffer. Only copies when there is more than one chunk.
    pub fn to_bytes(&self) -> Bytes {
        match &self.repr {
            Repr::Empty => Bytes::new(),
            Repr::Single(b) => b.clone(),
            Repr::Multi { segments, len } => {
                let mut out = BytesMut::with_capacity(*len);
                for seg in segments.iter() {
                    out.extend_from_slice(&seg.bytes);
                }
                out.freeze()
            }
        }
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

impl From<Bytes> for SegmentedBytes {
    fn from(bytes: Bytes) -> Self {
        let mut buf = SegmentedBuffer::new();
        buf.append(bytes);
        buf.build()
    }
}

impl From<String> for SegmentedBytes {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for SegmentedBytes {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl PartialEq<[u8]> for SegmentedBytes {
    fn eq(&self, other: &[u8]) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut at = 0;
        for chunk in self.chunks() {
            if other[at..at + chunk.len()] != chunk[..] {
                return false;
            }
            at += chunk.len();
        }
        true
    }
}

impl PartialEq<&str> for SegmentedBytes {
    fn eq(&self, other: &&str) -> bool {
        *self == *other.as_bytes()
    }
}

impl PartialEq for SegmentedBytes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for SegmentedBytes {}

/// Iterator over the chunks of a [`SegmentedBytes`].
pub struct Chunks<'a> {
    single: Option<&'a Bytes>,
    rest: std::slice::Iter<'a, Segment>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(b) = self.single.take() {
            return Some(b);
        }
        self.rest.next().map(|s| &s.bytes)
    }
}

/// Read cursor spanning segment boundaries.
pub struct SegmentedCursor<'a> {
    current: &'a [u8],
    rest: Chunks<'a>,
    remaining: usize,
}

impl Buf for SegmentedCursor<'_> {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn chunk(&self) -> &[u8] {
        self.current
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining,
            "cannot advance past the end of a segmented view"
        );
        self.remaining -= cnt;
        loop {
            if cnt < self.current.len() {
                self.current = &self.current[cnt..];
                return;
            }
            cnt -= self.current.len();
            match self.rest.next() {
                Some(next) => self.current = next.as_ref(),
                None => {
                    self.current = &[];
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn build(chunks: &[&'static str]) -> SegmentedBytes {
        let mut buf = SegmentedBuffer::new();
        for c in chunks {
            buf.append(Bytes::from_static(c.as_bytes()));
        }
        buf.build()
    }

    #[test]
    fn empty_buffer_builds_empty_view() {
        let view = SegmentedBuffer::new().build();
        assert!(view.is_empty());
        assert_eq!(view.segment_count(), 0);
        assert_eq!(view.to_bytes(), Bytes::new());
        assert_eq!(view.chunks().count(), 0);
        assert_eq!(view.cursor().remaining(), 0);
    }

    #[test]
    fn single_chunk_is_returned_without_wrapping() {
        let chunk = Bytes::from_static(b"{\"a\":1}");
        let mut buf = SegmentedBuffer::new();
        buf.append(chunk.clone());
        let view = buf.build();
        let single = view.as_single().expect("single chunk");
        assert_eq!(single.as_ptr(), chunk.as_ptr());
        assert_eq!(view.to_bytes().as_ptr(), chunk.as_ptr());
    }

    #[test]
    fn multi_chunk_view_preserves_append_order() {
        let view = build(&["{\"bir", "thday\": ", "\"2024-", "03-10\"}"]);
        assert_eq!(view.segment_count(), 4);
        assert_eq!(view, "{\"birthday\": \"2024-03-10\"}");
        let joined: Vec<u8> = view.chunks().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, b"{\"birthday\": \"2024-03-10\"}");
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let view = build(&["", "ab", "", "c"]);
        assert_eq!(view.segment_count(), 2);
        assert_eq!(view, "abc");
    }

    #[test]
    fn locate_uses_running_index() {
        let view = build(&["abc", "de", "fghi"]);
        assert_eq!(view.locate(0), Some((0, 0)));
        assert_eq!(view.locate(2), Some((0, 2)));
        assert_eq!(view.locate(3), Some((1, 0)));
        assert_eq!(view.locate(4), Some((1, 1)));
        assert_eq!(view.locate(5), Some((2, 0)));
        assert_eq!(view.locate(8), Some((2, 3)));
        assert_eq!(view.locate(9), None);
        assert_eq!(view.get(6), Some(b'g'));
    }

    #[test]
    fn cursor_reads_across_segments() {
        let view = build(&["{\"k\"", ":", " [1, ", "2]}"]);
        let mut out = String::new();
        view.cursor().reader().read_to_string(&mut out).unwrap();
        assert_eq!(out, "{\"k\": [1, 2]}");

        let parsed: serde_json::Value = serde_json::from_reader(view.cursor().reader()).unwrap();
        assert_eq!(parsed["k"][1], 2);
    }

    #[test]
    fn cursor_advance_on_exact_boundary() {
        let view = build(&["ab", "cd"]);
        let mut cursor = view.cursor();
        cursor.advance(2);
        assert_eq!(cursor.chunk(), b"cd");
        assert_eq!(cursor.remaining(), 2);
        cursor.advance(2);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.chunk().is_empty());
    }
}
