/*!
Prefix subscription: associates an API key with the prefixes the feed should stream.

The feed drops a prefix from an API key by itself after a period of inactivity, so there is no
unsubscribe call.
*/
use crate::error::SubscriptionError;
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);
const SUBSCRIBE_PATH: &str = "update_live_prefixes";

/// The remote call registering prefixes against an API key.
pub trait SubscriptionService: Send + Sync {
    fn register(&self, api_key: &str, prefixes: &[String]) -> Result<(), SubscriptionError>;
}

/// Registers prefixes with an HTTP
/// `GET <base_url>/update_live_prefixes?api_key=<key>&new_pfxs=<p1,p2,...>`.
///
/// Only a `200` answer counts as success; any other status is returned as
/// [SubscriptionError::Rejected] with the response body.
pub struct HttpSubscriptionService {
    url: String,
    agent: ureq::Agent,
}

impl HttpSubscriptionService {
    pub fn new(base_url: &str) -> Self {
        HttpSubscriptionService {
            url: format!("{}/{}", base_url.trim_end_matches('/'), SUBSCRIBE_PATH),
            agent: ureq::AgentBuilder::new().timeout(SUBSCRIBE_TIMEOUT).build(),
        }
    }
}

impl SubscriptionService for HttpSubscriptionService {
    fn register(&self, api_key: &str, prefixes: &[String]) -> Result<(), SubscriptionError> {
        let response = self
            .agent
            .get(&self.url)
            .query("api_key", api_key)
            .query("new_pfxs", &prefixes.join(","))
            .call();

        match response {
            Ok(resp) if resp.status() == 200 => Ok(()),
            Ok(resp) => Err(SubscriptionError::Rejected {
                status: resp.status(),
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Status(status, resp)) => Err(SubscriptionError::Rejected {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(SubscriptionError::Transport(e.to_string())),
        }
    }
}

/// Cloneable handle to a session's subscription state.
///
/// Subscribing through a handle is safe from any thread, including while another thread is
/// blocked pulling updates from the session.
#[derive(Clone)]
pub struct SubscriptionHandle {
    api_key: Arc<str>,
    service: Arc<dyn SubscriptionService>,
    prefixes: Arc<Mutex<BTreeSet<String>>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(api_key: &str, service: Arc<dyn SubscriptionService>) -> Self {
        SubscriptionHandle {
            api_key: Arc::from(api_key),
            service,
            prefixes: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Registers `prefixes` against the API key. On success they are added to the subscribed
    /// set; already subscribed prefixes are kept. On failure the set is left untouched.
    pub fn subscribe<I, S>(&self, prefixes: I) -> Result<(), SubscriptionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        if prefixes.is_empty() {
            return Ok(());
        }

        match self.service.register(&self.api_key, &prefixes) {
            Ok(()) => {
                info!("subscribed to {} prefixes", prefixes.len());
                self.lock().extend(prefixes);
                Ok(())
            }
            Err(e) => {
                warn!("prefix subscription failed: {}", e);
                Err(e)
            }
        }
    }

    /// Snapshot of the prefixes subscribed through this session so far.
    pub fn subscribed_prefixes(&self) -> BTreeSet<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.prefixes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
