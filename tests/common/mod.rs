//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::Bytes;
use http_body::Frame;

/// Body yielding one frame per chunk and counting how often it is dropped.
pub struct TrackedBody {
    chunks: VecDeque<Bytes>,
    polls: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

/// Counters shared with a [`TrackedBody`].
#[derive(Clone, Default)]
pub struct Tracker {
    pub polls: Arc<AtomicUsize>,
    pub drops: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn body(&self, chunks: &[&'static str]) -> Body {
        Body::new(TrackedBody {
            chunks: chunks.iter().map(|c| Bytes::from_static(c.as_bytes())).collect(),
            polls: self.polls.clone(),
            drops: self.drops.clone(),
        })
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

impl http_body::Body for TrackedBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(self.chunks.pop_front().map(|chunk| Ok(Frame::data(chunk))))
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
