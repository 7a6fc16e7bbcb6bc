/*!
Frame transports feeding a [Session](crate::Session).

A transport hands out one frame at a time. The live feed is read through
[WebSocketTransport]; anything else implementing [FrameTransport] (a replay file, an in-memory
script in tests) can be plugged into a session with
[SessionBuilder::build_with_transport](crate::SessionBuilder::build_with_transport).
*/
use crate::error::StreamError;
use bytes::Bytes;
use log::{debug, info};
use std::net::TcpStream;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

pub trait FrameTransport {
    /// Blocks until the next frame is available.
    ///
    /// Returning an error ends the session; implementations must not be called again after
    /// that.
    fn read_frame(&mut self) -> Result<Bytes, StreamError>;

    /// Best-effort shutdown of the underlying connection.
    fn close(&mut self) {}
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn read_frame(&mut self) -> Result<Bytes, StreamError> {
        (**self).read_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Blocking websocket connection to the live feed.
pub struct WebSocketTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Connects to `stream_url`, authenticating with `api_key` as query parameter.
    pub fn connect(stream_url: &str, api_key: &str) -> Result<Self, StreamError> {
        info!("connecting to live feed at {}", stream_url);
        let url = feed_url(stream_url, api_key);
        let (socket, response) =
            tungstenite::connect(url.as_str()).map_err(|e| StreamError::Connect(Box::new(e)))?;
        debug!("websocket handshake done with status {}", response.status());
        Ok(WebSocketTransport { socket })
    }
}

impl FrameTransport for WebSocketTransport {
    fn read_frame(&mut self) -> Result<Bytes, StreamError> {
        loop {
            match self.socket.read()? {
                Message::Text(text) => return Ok(Bytes::copy_from_slice(text.as_str().as_bytes())),
                Message::Binary(data) => return Ok(data),
                // pongs are queued by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    return Err(StreamError::ConnectionClosed(reason));
                }
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.socket.close(None) {
            debug!("error while closing websocket: {}", e);
        }
    }
}

/// Appends the API key to the stream URL.
pub(crate) fn feed_url(stream_url: &str, api_key: &str) -> String {
    let separator = if stream_url.contains('?') { '&' } else { '?' };
    format!("{}{}api_key={}", stream_url, separator, api_key)
}
