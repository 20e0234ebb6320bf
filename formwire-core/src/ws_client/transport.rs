//! Socket transport seam.
//!
//! The driver only sees a [`Connection`]: a sink of outgoing text frames and
//! a stream of [`TransportEvent`]s. [`TungsteniteConnector`] is the
//! production implementation; tests script their own [`Connector`].

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use std::fmt;
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, trace, warn};

use super::error::WsError;
use crate::error::{Error, Result};

/// Outgoing half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Incoming half of a connection. The end of the stream means the socket closed.
pub type EventStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// Something observed on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Text(String),
    /// A protocol-level pong.
    Pong,
    /// The transport failed; the connection is unusable afterwards.
    Error(WsError),
    /// The peer closed the socket.
    Closed,
}

/// An open socket.
pub struct Connection {
    pub(crate) sink: FrameSink,
    pub(crate) stream: EventStream,
}

impl Connection {
    /// Wraps a sink and a stream.
    pub fn new<S, St>(sink: S, stream: St) -> Self
    where
        S: Sink<String, Error = Error> + Send + 'static,
        St: Stream<Item = TransportEvent> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens sockets.
///
/// The handshake timeout is applied by the caller, so implementations may
/// wait indefinitely.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Performs the handshake with `url`.
    async fn connect(&self, url: &str) -> Result<Connection>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Creates the connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Connection> {
        let (ws_stream, response) = connect_async(url).await?;
        debug!(status = response.status().as_u16(), "WebSocket handshake completed");

        let (write, read) = ws_stream.split();
        let sink = write
            .sink_map_err(Error::from)
            .with(|text: String| future::ready(Ok::<_, Error>(Message::Text(text.into()))));

        // Yield one event per frame and end the stream after a close or an error.
        let stream = read
            .scan(false, |finished, item| {
                if *finished {
                    return future::ready(None);
                }
                let event = match item {
                    Ok(Message::Text(text)) => Some(TransportEvent::Text(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => binary_frame(&bytes),
                    Ok(Message::Pong(_)) => Some(TransportEvent::Pong),
                    Ok(Message::Close(frame)) => {
                        trace!(?frame, "close frame received");
                        *finished = true;
                        Some(TransportEvent::Closed)
                    }
                    Ok(Message::Ping(_) | Message::Frame(_)) => None,
                    Err(err) => {
                        *finished = true;
                        Some(TransportEvent::Error(WsError::from_tungstenite(&err)))
                    }
                };
                future::ready(Some(event))
            })
            .filter_map(future::ready);

        Ok(Connection::new(sink, stream))
    }
}

/// Binary frames carry the same JSON as text frames. Frames that are not
/// UTF-8 are dropped.
fn binary_frame(bytes: &[u8]) -> Option<TransportEvent> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(TransportEvent::Text(text.to_owned())),
        Err(err) => {
            warn!(len = bytes.len(), error = %err, "dropping binary frame that is not UTF-8");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_frame_decoding() {
        assert_eq!(
            binary_frame(br#"{"type":"pong"}"#),
            Some(TransportEvent::Text(r#"{"type":"pong"}"#.to_string()))
        );
        assert_eq!(binary_frame(&[0xff, 0xfe, 0x00]), None);
    }
}
