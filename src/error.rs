/*!
error module defines the error types used in bgproutes-live.
*/
use thiserror::Error;

/// Errors that end a stream session.
///
/// Every variant is terminal for the current connection: the session never keeps polling a
/// connection after returning one of these.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The websocket connection could not be established.
    ///
    /// ## Occurs during:
    ///  - The first pull of a lazily connected session
    #[error("unable to connect to feed: {0}")]
    Connect(#[source] Box<tungstenite::Error>),
    /// The remote side closed the connection, optionally with a close reason.
    #[error("connection closed{}", .0.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed(Option<String>),
    /// The underlying connection broke while reading a frame.
    #[error("transport error: {0}")]
    Transport(#[source] Box<tungstenite::Error>),
    /// The feed sent an `error` payload instead of a record.
    #[error("remote rejected the session: {0}")]
    RemoteRejection(String),
}

impl StreamError {
    /// Returns true if the session ended because the feed explicitly rejected it, as opposed to
    /// the connection being lost.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StreamError::RemoteRejection(_))
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(value: tungstenite::Error) -> Self {
        match value {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                StreamError::ConnectionClosed(None)
            }
            e => StreamError::Transport(Box::new(e)),
        }
    }
}

/// Reasons a well-formed record is rejected by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing record type")]
    MissingRecordType,
    #[error("invalid record type: {0}")]
    InvalidRecordType(String),
    #[error("missing vantage point")]
    MissingVantagePoint,
}

/// Errors returned by the prefix subscription call.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The subscription endpoint answered with a non-200 status.
    #[error("subscription rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The subscription endpoint could not be reached.
    #[error("subscription request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter type: {0}")]
    UnknownType(String),
    #[error("cannot parse {what} from {value}")]
    InvalidValue { what: &'static str, value: String },
}
