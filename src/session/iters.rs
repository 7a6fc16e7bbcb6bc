use crate::error::StreamError;
use crate::models::RouteUpdate;
use crate::session::{CancelHandle, FrameTransport, Session, SubscriptionHandle};
use std::iter::FusedIterator;

/// Iterator over the valid updates of a [Session].
///
/// Yields `Ok(update)` for every valid update. The iteration ends:
/// - with `None` right away when the session was cancelled;
/// - with one `Err` item, then `None`, when the connection was lost or the feed rejected the
///   session.
pub struct UpdateIter<T> {
    session: Session<T>,
}

impl<T> UpdateIter<T> {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle()
    }

    pub fn subscription_handle(&self) -> SubscriptionHandle {
        self.session.subscription_handle()
    }
}

impl<T: FrameTransport> Iterator for UpdateIter<T> {
    type Item = Result<RouteUpdate, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.session.next_valid_update().transpose()
    }
}

// an ended session only ever returns `Ok(None)`
impl<T: FrameTransport> FusedIterator for UpdateIter<T> {}

impl<T: FrameTransport> IntoIterator for Session<T> {
    type Item = Result<RouteUpdate, StreamError>;
    type IntoIter = UpdateIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        UpdateIter { session: self }
    }
}
