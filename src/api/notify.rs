//! Purpose: Read-only observation of contact store snapshots.
//! Exports: `Snapshot`, `Subscription`.
//! Role: What a presentation layer renders: contacts, loading flag, last error.
//! Invariants: Subscribers never mutate store state.
//! Invariants: Observation is latest-value; intermediate snapshots may coalesce.
use crate::core::record::Contact;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    pub contacts: Vec<Contact>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct Subscription {
    receiver: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next published snapshot; `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
