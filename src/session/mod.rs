/*!
Stream session: pulls frames from the feed, decodes them and delivers valid route updates.

A [Session] owns one connection to the feed. Each pull reads exactly one frame and ends in one
of three [PullOutcome]s. [Session::next_valid_update] retries pulls until it gets a valid
update, so that consumers never see malformed frames or records the decoder rejected. Only
a transport failure or a remote rejection reaches the caller as an error.

```no_run
use bgproutes_live::Session;

let session = Session::new("MY_API_KEY");
session.subscribe(["192.0.2.0/24", "2001:db8::/32"]).unwrap();

for update in session {
    match update {
        Ok(update) => println!("{}", update),
        Err(e) => eprintln!("stream ended: {}", e),
    }
}
```
*/
mod iters;
mod subscription;
mod transport;

pub use iters::UpdateIter;
pub use subscription::{HttpSubscriptionService, SubscriptionHandle, SubscriptionService};
pub use transport::{FrameTransport, WebSocketTransport};

use crate::error::{DecodeError, FilterError, StreamError, SubscriptionError};
use crate::models::RouteUpdate;
use crate::parser::{decode_record, Filter, Filterable, RawRecord};
use bytes::Bytes;
use log::{info, log, trace, warn, Level};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default websocket endpoint of the live feed.
pub const DEFAULT_STREAM_URL: &str = "wss://bgproutes.io:8765/ws";
/// Default base URL of the HTTP service registering prefixes against an API key. The
/// subscription path is appended to it.
pub const DEFAULT_SUBSCRIBE_URL: &str = "https://bgproutes.io:8765";

/// Result of reading and decoding a single frame.
#[derive(Debug)]
pub enum PullOutcome {
    /// The connection is gone, or the feed rejected the session. Terminal.
    Transport(StreamError),
    /// The frame is not a JSON object.
    Format(serde_json::Error),
    /// The frame is a record and went through the decoder.
    Decoded(Result<RouteUpdate, DecodeError>),
}

/// Cooperative cancellation flag for a session.
///
/// Cancellation is checked before every pull: a pull already blocked on the transport is never
/// interrupted, the session ends once it returns.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Connector<T> = Box<dyn FnOnce() -> Result<T, StreamError> + Send>;

enum Connection<T> {
    Pending(Connector<T>),
    Open(T),
    Ended,
}

/// Builder for [Session].
pub struct SessionBuilder {
    api_key: String,
    stream_url: String,
    subscribe_url: String,
    diagnostic_level: Level,
    filters: Vec<Filter>,
    cancel: CancelHandle,
    subscription_service: Option<Arc<dyn SubscriptionService>>,
}

impl SessionBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        SessionBuilder {
            api_key: api_key.into(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            subscribe_url: DEFAULT_SUBSCRIBE_URL.to_string(),
            diagnostic_level: Level::Debug,
            filters: vec![],
            cancel: CancelHandle::new(),
            subscription_service: None,
        }
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Sets the base URL of the default subscription service. Ignored when a custom
    /// service is set with [SessionBuilder::subscription_service].
    pub fn subscribe_url(mut self, url: impl Into<String>) -> Self {
        self.subscribe_url = url.into();
        self
    }

    /// Log level used for frames and records the session skips. Defaults to `Debug`.
    pub fn diagnostic_level(mut self, level: Level) -> Self {
        self.diagnostic_level = level;
        self
    }

    /// Adds a filter by its string form, see [Filter::new].
    pub fn add_filter(mut self, filter_type: &str, filter_value: &str) -> Result<Self, FilterError> {
        self.filters.push(Filter::new(filter_type, filter_value)?);
        Ok(self)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Shares an existing cancellation flag with the session.
    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn subscription_service(mut self, service: impl SubscriptionService + 'static) -> Self {
        self.subscription_service = Some(Arc::new(service));
        self
    }

    /// Builds a session reading from the websocket feed. The connection is opened on the first
    /// pull.
    pub fn build(self) -> Session<WebSocketTransport> {
        let stream_url = self.stream_url.clone();
        let api_key = self.api_key.clone();
        self.build_with_connector(move || WebSocketTransport::connect(&stream_url, &api_key))
    }

    /// Builds a session over an already opened transport.
    pub fn build_with_transport<T: FrameTransport + Send + 'static>(self, transport: T) -> Session<T> {
        self.build_with_connector(move || Ok(transport))
    }

    /// Builds a session that calls `connect` on its first pull.
    pub fn build_with_connector<T, F>(self, connect: F) -> Session<T>
    where
        T: FrameTransport,
        F: FnOnce() -> Result<T, StreamError> + Send + 'static,
    {
        let service = match self.subscription_service {
            Some(service) => service,
            None => Arc::new(HttpSubscriptionService::new(&self.subscribe_url)),
        };
        Session {
            connection: Connection::Pending(Box::new(connect)),
            subscription: SubscriptionHandle::new(&self.api_key, service),
            cancel: self.cancel,
            filters: self.filters,
            diagnostic_level: self.diagnostic_level,
        }
    }
}

/// A live connection to the feed and the prefixes subscribed for its API key.
///
/// Sessions are not restartable: once the connection is lost, rejected or cancelled, a new
/// session must be built.
pub struct Session<T = WebSocketTransport> {
    connection: Connection<T>,
    subscription: SubscriptionHandle,
    cancel: CancelHandle,
    filters: Vec<Filter>,
    diagnostic_level: Level,
}

impl Session<WebSocketTransport> {
    /// Creates a session for `api_key` with default endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        SessionBuilder::new(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(api_key)
    }
}

impl<T> Session<T> {
    /// Registers prefixes against the session's API key, see [SubscriptionHandle::subscribe].
    pub fn subscribe<I, S>(&self, prefixes: I) -> Result<(), SubscriptionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscription.subscribe(prefixes)
    }

    /// Returns a handle for subscribing from another thread while the session is pulled.
    pub fn subscription_handle(&self) -> SubscriptionHandle {
        self.subscription.clone()
    }

    pub fn subscribed_prefixes(&self) -> BTreeSet<String> {
        self.subscription.subscribed_prefixes()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Returns true once the session reached a terminal state and will not pull anymore.
    pub fn is_ended(&self) -> bool {
        matches!(self.connection, Connection::Ended)
    }
}

impl<T: FrameTransport> Session<T> {
    /// Reads one frame and classifies it.
    ///
    /// A [PullOutcome::Transport] outcome ends the session. Pulling an ended session returns a
    /// closed-connection outcome without touching the transport.
    pub fn pull(&mut self) -> PullOutcome {
        let frame = match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.end();
                return PullOutcome::Transport(e);
            }
        };

        let record = match RawRecord::from_slice(&frame) {
            Ok(record) => record,
            Err(e) => return PullOutcome::Format(e),
        };

        if let Some(message) = record.remote_error() {
            self.end();
            return PullOutcome::Transport(StreamError::RemoteRejection(message));
        }

        PullOutcome::Decoded(decode_record(&record))
    }

    /// Blocks until the next valid update that passes the session's filters.
    ///
    /// Returns `Ok(None)` when cancellation was requested, and on every call after the session
    /// ended. Returns `Err` when the connection is lost or the feed rejected the session.
    pub fn next_valid_update(&mut self) -> Result<Option<RouteUpdate>, StreamError> {
        loop {
            if self.is_ended() {
                return Ok(None);
            }
            if self.cancel.is_cancelled() {
                info!("session cancelled");
                self.end();
                return Ok(None);
            }

            match self.pull() {
                PullOutcome::Transport(e) => {
                    warn!("live feed session ended: {}", e);
                    return Err(e);
                }
                PullOutcome::Format(e) => {
                    log!(self.diagnostic_level, "skipping malformed frame: {}", e);
                }
                PullOutcome::Decoded(Err(e)) => {
                    log!(self.diagnostic_level, "skipping record: {}", e);
                }
                PullOutcome::Decoded(Ok(update)) if !update.is_valid() => {
                    log!(
                        self.diagnostic_level,
                        "skipping record with malformed vantage point: {}",
                        update
                    );
                }
                PullOutcome::Decoded(Ok(update)) => {
                    if update.match_filters(&self.filters) {
                        return Ok(Some(update));
                    }
                    trace!("update filtered out: {}", update);
                }
            }
        }
    }

    fn read_frame(&mut self) -> Result<Bytes, StreamError> {
        if matches!(self.connection, Connection::Pending(_)) {
            if let Connection::Pending(connect) =
                std::mem::replace(&mut self.connection, Connection::Ended)
            {
                self.connection = Connection::Open(connect()?);
                info!("connected to live feed");
            }
        }

        match &mut self.connection {
            Connection::Open(transport) => transport.read_frame(),
            _ => Err(StreamError::ConnectionClosed(None)),
        }
    }

    fn end(&mut self) {
        if let Connection::Open(mut transport) =
            std::mem::replace(&mut self.connection, Connection::Ended)
        {
            transport.close();
        }
    }
}
