//! Hook-instrumented request body.
//!
//! # Data Flow
//! ```text
//! caller polls InstrumentedBody
//!     → active stream yields Ready(outcome)
//!     → hook 1 (sequence, outcome) → outcome'
//!     → hook 2 (sequence, outcome') → outcome''
//!     → caller receives outcome''
//! ```
//!
//! # Design Decisions
//! - Hooks belong to the decorator, not to the stream: swapping the active
//!   stream keeps every registered hook firing on the new one
//! - Only `Poll::Ready` counts as a read; `Pending` never reaches hooks
//! - Closing releases the stream without draining it

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::http::error::BodyError;

/// Result of one read on a body stream. `None` is end of stream.
pub type ReadOutcome = Option<Result<Frame<Bytes>, axum::Error>>;

/// Number of payload bytes carried by a read outcome.
pub fn bytes_read(outcome: &ReadOutcome) -> usize {
    match outcome {
        Some(Ok(frame)) => frame.data_ref().map_or(0, Bytes::len),
        _ => 0,
    }
}

/// One completed read as seen by a hook.
#[derive(Debug)]
pub struct ReadEvent {
    /// Zero-based index of this read on the decorator.
    pub sequence: u64,
    pub outcome: ReadOutcome,
}

impl ReadEvent {
    pub fn bytes_read(&self) -> usize {
        bytes_read(&self.outcome)
    }
}

/// Post-read hook. Returns the outcome handed to the next hook and finally to the caller.
pub trait AfterRead: Send {
    fn after_read(&mut self, event: ReadEvent) -> ReadOutcome;
}

impl<F> AfterRead for F
where
    F: FnMut(ReadEvent) -> ReadOutcome + Send,
{
    fn after_read(&mut self, event: ReadEvent) -> ReadOutcome {
        self(event)
    }
}

/// Body decorator running registered hooks after every read of the active stream.
pub struct InstrumentedBody {
    active: Option<Body>,
    hooks: Vec<Box<dyn AfterRead>>,
    sequence: u64,
}

impl InstrumentedBody {
    /// Wrap `body` with no hooks registered.
    pub fn new(body: Body) -> Self {
        Self {
            active: Some(body),
            hooks: Vec::new(),
            sequence: 0,
        }
    }

    /// Register a hook; hooks run in registration order.
    pub fn on_after<H>(&mut self, hook: H)
    where
        H: AfterRead + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Swap the stream used by future reads.
    ///
    /// With `close_previous` the previous stream is released before the swap
    /// and `None` comes back; otherwise the caller receives it untouched.
    /// A closed decorator stays closed and hands `body` straight back.
    pub fn set_reader(&mut self, body: Body, close_previous: bool) -> Option<Body> {
        if self.is_closed() {
            tracing::debug!("set_reader on closed body ignored");
            return Some(body);
        }

        if close_previous {
            drop(self.active.take());
            self.active = Some(body);
            None
        } else {
            self.active.replace(body)
        }
    }

    /// Release the active stream and every hook. Unread bytes are not drained.
    pub fn close(&mut self) {
        if self.active.take().is_some() {
            self.hooks.clear();
            tracing::trace!(reads = self.sequence, "Instrumented body closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.active.is_none()
    }

    /// Number of completed reads so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn run_hooks(&mut self, mut outcome: ReadOutcome) -> ReadOutcome {
        let sequence = self.sequence;
        self.sequence += 1;

        for hook in &mut self.hooks {
            outcome = hook.after_read(ReadEvent { sequence, outcome });
        }
        outcome
    }
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        let Some(active) = this.active.as_mut() else {
            return Poll::Ready(Some(Err(axum::Error::new(BodyError::Closed))));
        };

        match Pin::new(active).poll_frame(cx) {
            Poll::Ready(outcome) => Poll::Ready(this.run_hooks(outcome)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        // A closed body still owes the caller a `Closed` error.
        self.active.as_ref().is_some_and(HttpBody::is_end_stream)
    }

    fn size_hint(&self) -> SizeHint {
        self.active
            .as_ref()
            .map(HttpBody::size_hint)
            .unwrap_or_default()
    }
}

impl fmt::Debug for InstrumentedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedBody")
            .field("closed", &self.is_closed())
            .field("hooks", &self.hooks.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Body yielding one frame per chunk, then an optional error.
    struct Chunks {
        chunks: VecDeque<Bytes>,
        fail_at_end: bool,
    }

    impl HttpBody for Chunks {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            if let Some(chunk) = self.chunks.pop_front() {
                return Poll::Ready(Some(Ok(Frame::data(chunk))));
            }
            if std::mem::take(&mut self.fail_at_end) {
                return Poll::Ready(Some(Err(std::io::Error::other("connection reset"))));
            }
            Poll::Ready(None)
        }
    }

    fn chunked(chunks: &[&'static str], fail_at_end: bool) -> Body {
        Body::new(Chunks {
            chunks: chunks.iter().map(|c| Bytes::from_static(c.as_bytes())).collect(),
            fail_at_end,
        })
    }

    fn tally(body: &mut InstrumentedBody) -> Arc<AtomicUsize> {
        let total = Arc::new(AtomicUsize::new(0));
        let counter = total.clone();
        body.on_after(move |event: ReadEvent| {
            counter.fetch_add(event.bytes_read(), Ordering::SeqCst);
            event.outcome
        });
        total
    }

    #[tokio::test]
    async fn test_hook_sees_every_read() {
        let mut body = InstrumentedBody::new(chunked(&["hel", "lo"], false));
        let total = tally(&mut body);

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"hello");
        assert_eq!(total.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_sequence_numbers() {
        let mut body = InstrumentedBody::new(chunked(&["a", "b", "c"], false));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = seen.clone();
        body.on_after(move |event: ReadEvent| {
            log.lock().unwrap().push(event.sequence);
            event.outcome
        });

        while body.frame().await.is_some() {}
        // three data frames plus the end-of-stream read
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(body.sequence(), 4);
    }

    #[tokio::test]
    async fn test_hooks_chain_and_rewrite() {
        let mut body = InstrumentedBody::new(chunked(&["abc"], false));
        body.on_after(|event: ReadEvent| match event.outcome {
            Some(Ok(frame)) if frame.is_data() => Some(Ok(Frame::data(Bytes::from_static(b"x")))),
            other => other,
        });
        let total = tally(&mut body);

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"x");
        // second hook observes the rewritten outcome
        assert_eq!(total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let mut body = InstrumentedBody::new(chunked(&["ok"], true));
        let total = tally(&mut body);

        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), "ok");

        let err = body.frame().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(total.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_reader_keeps_hooks() {
        let mut body = InstrumentedBody::new(chunked(&["old"], false));
        let total = tally(&mut body);

        let previous = body.set_reader(Body::from("replacement"), false);
        assert!(previous.is_some());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"replacement");
        assert_eq!(total.load(Ordering::SeqCst), "replacement".len());
    }

    /// Returns `Pending` once before every frame.
    struct Stalling {
        inner: Chunks,
        stalled: bool,
    }

    impl HttpBody for Stalling {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            if !std::mem::replace(&mut self.stalled, true) {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            self.stalled = false;
            Pin::new(&mut self.inner).poll_frame(cx)
        }
    }

    #[tokio::test]
    async fn test_pending_is_not_a_read() {
        let mut body = InstrumentedBody::new(Body::new(Stalling {
            inner: Chunks {
                chunks: VecDeque::from([Bytes::from_static(b"ab"), Bytes::from_static(b"c")]),
                fail_at_end: false,
            },
            stalled: false,
        }));
        let total = tally(&mut body);

        while body.frame().await.is_some() {}
        assert_eq!(body.sequence(), 3);
        assert_eq!(total.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_after_close() {
        let mut body = InstrumentedBody::new(Body::from("unread"));
        body.close();
        body.close();
        assert!(body.is_closed());

        let err = body.frame().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), BodyError::Closed.to_string());

        let handed_back = body.set_reader(Body::empty(), true);
        assert!(handed_back.is_some());
    }
}
