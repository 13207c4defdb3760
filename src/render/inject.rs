//! Marker injection between the render output and the wire.
//!
//! # Responsibilities
//! - Splice the head block immediately before the first `</head>`
//! - Splice the payload block immediately before the first `</body>`
//! - Pass everything else through unchanged
//!
//! # Design Decisions
//! - Works on bytes, so chunk boundaries inside UTF-8 sequences are harmless
//! - Only the longest tail that could still start a pending marker is held
//!   back; everything before it is forwarded immediately
//! - Each block is injected exactly once; once both are done the injector is
//!   a pass-through
//! - A block whose marker never appears is appended at end of stream

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Bytes;
use futures_util::stream::Stream;

const HEAD_CLOSE: &[u8] = b"</head>";
const BODY_CLOSE: &[u8] = b"</body>";

#[derive(Debug)]
struct Watch {
    marker: &'static [u8],
    insert: Vec<u8>,
    done: bool,
}

/// Buffering state machine for two fixed markers.
#[derive(Debug)]
pub struct HtmlInjector {
    watches: [Watch; 2],
    carry: Vec<u8>,
}

impl HtmlInjector {
    pub fn new(head_block: impl Into<Vec<u8>>, body_block: impl Into<Vec<u8>>) -> Self {
        Self {
            watches: [
                Watch {
                    marker: HEAD_CLOSE,
                    insert: head_block.into(),
                    done: false,
                },
                Watch {
                    marker: BODY_CLOSE,
                    insert: body_block.into(),
                    done: false,
                },
            ],
            carry: Vec::new(),
        }
    }

    /// True once both blocks have been written.
    pub fn is_done(&self) -> bool {
        self.watches.iter().all(|w| w.done)
    }

    /// Feed one chunk, returning the bytes that can be sent now.
    pub fn push(&mut self, chunk: &[u8]) -> Bytes {
        if self.is_done() && self.carry.is_empty() {
            return Bytes::copy_from_slice(chunk);
        }

        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);

        let mut out = Vec::with_capacity(buf.len() + 64);
        let mut pos = 0;

        // Earliest pending marker first, so output order follows the document
        while let Some((at, index)) = self.next_marker(&buf[pos..]) {
            let at = pos + at;
            out.extend_from_slice(&buf[pos..at]);
            let watch = &mut self.watches[index];
            out.extend_from_slice(&watch.insert);
            watch.done = true;
            pos = at;
        }

        let hold = self.held_suffix(&buf[pos..]);
        let split = buf.len() - hold;
        out.extend_from_slice(&buf[pos..split]);
        self.carry = buf[split..].to_vec();

        Bytes::from(out)
    }

    /// Flush held bytes and any block whose marker never appeared.
    pub fn finish(&mut self) -> Bytes {
        let mut out = std::mem::take(&mut self.carry);
        for watch in self.watches.iter_mut().filter(|w| !w.done) {
            out.extend_from_slice(&watch.insert);
            watch.done = true;
        }
        Bytes::from(out)
    }

    fn next_marker(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        self.watches
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.done)
            .filter_map(|(i, w)| find(haystack, w.marker).map(|at| (at, i)))
            .min()
    }

    fn held_suffix(&self, tail: &[u8]) -> usize {
        self.watches
            .iter()
            .filter(|w| !w.done)
            .map(|w| partial_marker_len(tail, w.marker))
            .max()
            .unwrap_or(0)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `tail` that is a proper prefix of `marker`.
fn partial_marker_len(tail: &[u8], marker: &[u8]) -> usize {
    (1..marker.len())
        .rev()
        .find(|&k| k <= tail.len() && tail.ends_with(&marker[..k]))
        .unwrap_or(0)
}

/// Stream adapter applying an `HtmlInjector` to every chunk.
#[derive(Debug)]
pub struct Injected<S> {
    inner: S,
    injector: HtmlInjector,
    finished: bool,
}

impl<S> Injected<S> {
    pub fn new(inner: S, injector: HtmlInjector) -> Self {
        Self {
            inner,
            injector,
            finished: false,
        }
    }
}

impl<S> Stream for Injected<S>
where
    S: Stream<Item = Bytes> + Unpin,
{
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(chunk) => {
                    let out = this.injector.push(&chunk);
                    if !out.is_empty() {
                        return Poll::Ready(Some(out));
                    }
                }
                None => {
                    this.finished = true;
                    let out = this.injector.finish();
                    if !out.is_empty() {
                        return Poll::Ready(Some(out));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};

    const DOC: &str = "<html><head><meta charset=\"utf-8\"></head><body><p>hi</p></body></html>";
    const EXPECTED: &str =
        "<html><head><meta charset=\"utf-8\"><title>T</title></head><body><p>hi</p><script>P</script></body></html>";

    fn run(chunks: &[&[u8]]) -> String {
        let mut injector = HtmlInjector::new("<title>T</title>", "<script>P</script>");
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend_from_slice(&injector.push(chunk));
        }
        out.extend_from_slice(&injector.finish());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(run(&[DOC.as_bytes()]), EXPECTED);
    }

    #[test]
    fn test_every_two_way_split() {
        let bytes = DOC.as_bytes();
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(run(&[a, b]), EXPECTED, "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = DOC.as_bytes().chunks(1).collect();
        assert_eq!(run(&chunks), EXPECTED);
    }

    #[test]
    fn test_injects_exactly_once() {
        let doc = "<head></head><head></head><body></body></body>";
        assert_eq!(
            run(&[doc.as_bytes()]),
            "<head><title>T</title></head><head></head><body><script>P</script></body></body>"
        );
    }

    #[test]
    fn test_forwards_eagerly_and_holds_only_marker_prefix() {
        let mut injector = HtmlInjector::new("H", "B");
        assert_eq!(&injector.push(b"<html><he")[..], b"<html><he");
        assert_eq!(&injector.push(b"ad><title>x</title></he")[..], b"ad><title>x</title>");
        assert_eq!(&injector.push(b"ad>")[..], b"H</head>");
        assert!(!injector.is_done());
        assert_eq!(&injector.push(b"<body>ok</bo")[..], b"<body>ok");
        assert_eq!(&injector.push(b"dy></html>")[..], b"B</body></html>");
        assert!(injector.is_done());
        assert_eq!(&injector.push(b"</body>")[..], b"</body>");
        assert!(injector.finish().is_empty());
    }

    #[test]
    fn test_missing_markers_append_at_end() {
        assert_eq!(run(&[b"<p>fragment</p>"]), "<p>fragment</p><title>T</title><script>P</script>");
    }

    #[test]
    fn test_multibyte_split() {
        let doc = "<head></head><body>café</body>";
        let bytes = doc.as_bytes();
        let at = doc.find('é').unwrap() + 1; // inside the two-byte sequence
        let (a, b) = bytes.split_at(at);
        assert_eq!(
            run(&[a, b]),
            "<head><title>T</title></head><body>café<script>P</script></body>"
        );
    }

    #[tokio::test]
    async fn test_stream_adapter() {
        let chunks = vec![
            Bytes::from_static(b"<html><head></he"),
            Bytes::from_static(b"ad><body>x</"),
            Bytes::from_static(b"body></html>"),
        ];
        let injected = Injected::new(
            stream::iter(chunks),
            HtmlInjector::new("<title>T</title>", "<script>P</script>"),
        );
        let out: Vec<Bytes> = injected.collect().await;
        let html: String = out
            .iter()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect();
        assert_eq!(
            html,
            "<html><head><title>T</title></head><body>x<script>P</script></body></html>"
        );
    }
}
