//! Change notifications and per-session subscriptions.
//!
//! A successful mutation yields one [`ChangeNotification`]. Delivery belongs
//! to the transport; this module only decides which of a session's
//! subscriptions a notification concerns. Subscriptions are owned by their
//! [`SubscriptionSession`] and keyed by the request id that created them.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::metadata::LogUri;

/// What happened to a log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The log was created.
    Insert,
    /// Header or data changed.
    Update,
    /// The log was removed.
    Delete,
}

/// Notification emitted after a commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Changed log.
    pub uri: LogUri,
    /// Commit version that made the change visible.
    pub version: u64,
    /// Kind of change.
    pub kind: ChangeKind,
    /// When the notification was produced.
    pub timestamp: DateTime<Utc>,
}

impl ChangeNotification {
    /// Notification stamped with the current time.
    pub fn new(uri: LogUri, version: u64, kind: ChangeKind) -> Self {
        Self {
            uri,
            version,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Subscriptions of one client session.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionSession {
    subscriptions: HashMap<u64, LogUri>,
}

impl SubscriptionSession {
    /// Session without subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `request_id` to changes on `uri` and everything under it.
    ///
    /// Returns `false` (and keeps the existing subscription) when the request
    /// id is already in use.
    pub fn subscribe(&mut self, request_id: u64, uri: LogUri) -> bool {
        if self.subscriptions.contains_key(&request_id) {
            debug!("ignoring duplicate subscription {request_id}");
            return false;
        }
        self.subscriptions.insert(request_id, uri);
        true
    }

    /// Cancel a subscription; `false` when `request_id` is unknown.
    pub fn cancel(&mut self, request_id: u64) -> bool {
        let removed = self.subscriptions.remove(&request_id).is_some();
        if !removed {
            debug!("ignoring cancellation of unknown subscription {request_id}");
        }
        removed
    }

    /// Request ids whose subscription covers the notification's log, sorted.
    pub fn dispatch(&self, notification: &ChangeNotification) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .subscriptions
            .iter()
            .filter(|(_, scope)| notification.uri.is_within(scope))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// True without live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_and_unknown_cancellations_are_no_ops() {
        let mut session = SubscriptionSession::new();
        assert!(session.subscribe(1, LogUri::from("well(a)")));
        assert!(!session.subscribe(1, LogUri::from("well(b)")));
        assert_eq!(session.len(), 1);

        assert!(!session.cancel(99));
        assert!(session.cancel(1));
        assert!(session.is_empty());
    }

    #[test]
    fn dispatch_matches_scope_and_descendants() {
        let mut session = SubscriptionSession::new();
        session.subscribe(3, LogUri::from("well(a)"));
        session.subscribe(1, LogUri::from("well(a)/log(l1)"));
        session.subscribe(2, LogUri::from("well(b)"));

        let note = ChangeNotification::new(LogUri::from("well(a)/log(l1)"), 4, ChangeKind::Update);
        assert_eq!(session.dispatch(&note), vec![1, 3]);

        let other = ChangeNotification::new(LogUri::from("well(ab)/log(x)"), 1, ChangeKind::Insert);
        assert!(session.dispatch(&other).is_empty());
    }
}
