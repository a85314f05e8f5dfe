//! Body fixtures for unit tests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use hyper::body::Frame;

/// A body that yields a fixed list of frames, trailers included.
pub struct FrameBody {
    frames: VecDeque<Result<Frame<Bytes>, io::Error>>,
}

impl FrameBody {
    /// `data` as one frame followed by a single trailer field.
    pub fn with_trailer(data: &'static str, name: &'static str, value: &'static str) -> Body {
        let mut trailers = HeaderMap::new();
        trailers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        Body::new(Self {
            frames: VecDeque::from([
                Ok(Frame::data(Bytes::from_static(data.as_bytes()))),
                Ok(Frame::trailers(trailers)),
            ]),
        })
    }
}

impl HttpBody for FrameBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        Poll::Ready(self.get_mut().frames.pop_front())
    }
}

/// Poll the next frame out of `body`.
pub async fn next_frame(body: &mut Body) -> Option<Result<Frame<Bytes>, axum::Error>> {
    std::future::poll_fn(|cx| Pin::new(&mut *body).poll_frame(cx)).await
}
