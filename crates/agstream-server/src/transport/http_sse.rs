use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::convert::Infallible;
use tokio::sync::mpsc;

use agstream_protocol_ag_ui::EVENT_STREAM_CONTENT_TYPE;

use crate::transport::TransportError;

/// Frames buffered between the run driver and the response body.
pub const SSE_CHANNEL_CAPACITY: usize = 64;

/// Bounded frame channel for one SSE response.
pub fn sse_channel(capacity: usize) -> (SseFrameSink, SseBody) {
    let (tx, rx) = mpsc::channel(capacity);
    (SseFrameSink { tx }, SseBody { rx })
}

/// Write side of one SSE response. Each frame is forwarded as one body
/// chunk, in order.
#[derive(Debug, Clone)]
pub struct SseFrameSink {
    tx: mpsc::Sender<Bytes>,
}

impl SseFrameSink {
    pub async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Read side of one SSE response; becomes the streaming body.
#[derive(Debug)]
pub struct SseBody {
    rx: mpsc::Receiver<Bytes>,
}

impl SseBody {
    /// Next frame, or `None` once the driver has dropped its sink.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl IntoResponse for SseBody {
    fn into_response(self) -> Response {
        let mut body = self;
        let frames = async_stream::stream! {
            while let Some(frame) = body.next_frame().await {
                yield Ok::<Bytes, Infallible>(frame);
            }
        };
        let headers = [
            (header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ];
        (headers, Body::from_stream(frames)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn sink_forwards_frames_in_order() {
        let (sink, mut body) = sse_channel(4);
        sink.send(Bytes::from("event: A\ndata: {}\n\n")).await.unwrap();
        sink.send(Bytes::from("event: B\ndata: {}\n\n")).await.unwrap();
        drop(sink);

        assert_eq!(body.next_frame().await.unwrap(), Bytes::from("event: A\ndata: {}\n\n"));
        assert_eq!(body.next_frame().await.unwrap(), Bytes::from("event: B\ndata: {}\n\n"));
        assert_eq!(body.next_frame().await, None);
    }

    #[tokio::test]
    async fn send_returns_closed_once_consumer_is_gone() {
        let (sink, body) = sse_channel(4);
        drop(body);

        sink.closed().await;
        let result = sink.send(Bytes::from("x")).await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn response_streams_frames_with_event_stream_headers() {
        let (sink, body) = sse_channel(4);
        sink.send(Bytes::from("event: A\ndata: {}\n\n")).await.unwrap();
        sink.send(Bytes::from("event: B\ndata: {}\n\n")).await.unwrap();
        drop(sink);

        let resp = body.into_response();
        let headers = resp.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");

        let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(bytes, Bytes::from("event: A\ndata: {}\n\nevent: B\ndata: {}\n\n"));
    }
}
