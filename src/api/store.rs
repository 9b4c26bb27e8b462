//! Purpose: Authoritative in-memory contact list coordinated with a backend.
//! Exports: `ContactStore`, `Outcome`, `Confirm`, `DELETE_PROMPT`.
//! Role: Sequences backend calls, adapts records, publishes snapshots.
//! Invariants: At most one operation is in flight; concurrent calls get `Outcome::Busy`.
//! Invariants: `error` is cleared when an operation starts and set only on failure.
//! Invariants: Failed, invalid, cancelled or busy operations never touch the list.
use super::client::{ApiResult, ContactBackend};
use super::notify::{Snapshot, Subscription};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Contact, ContactDraft, ContactId, from_remote, to_remote};
use crate::core::validate::{FieldErrors, validate_draft};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this contact?";

/// Yes/no gate in front of destructive operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug)]
#[must_use]
pub enum Outcome {
    Applied,
    /// Blocked locally; nothing was sent.
    Invalid(FieldErrors),
    Failed(Error),
    Cancelled,
    Busy,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn into_result(self) -> ApiResult<()> {
        match self {
            Outcome::Applied => Ok(()),
            Outcome::Invalid(errors) => Err(errors
                .to_error()
                .unwrap_or_else(|| Error::new(ErrorKind::Validation))),
            Outcome::Failed(err) => Err(err),
            Outcome::Cancelled => Err(Error::new(ErrorKind::Cancelled)),
            Outcome::Busy => Err(Error::new(ErrorKind::Busy)),
        }
    }
}

pub struct ContactStore<B: ContactBackend> {
    backend: Arc<B>,
    state: watch::Sender<Snapshot>,
}

impl<B: ContactBackend> ContactStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_shared(Arc::new(backend))
    }

    pub fn with_shared(backend: Arc<B>) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self { backend, state }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state.borrow().contacts.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn find(&self, id: &ContactId) -> Option<Contact> {
        self.state
            .borrow()
            .contacts
            .iter()
            .find(|contact| &contact.id == id)
            .cloned()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.state.subscribe())
    }

    /// Replace the list with whatever the backend holds.
    pub async fn fetch_all(&self) -> Outcome {
        let flight = match self.begin(|_| Ok(())) {
            Ok(flight) => flight,
            Err(outcome) => return outcome,
        };
        match self.call(|backend| backend.list_contacts()).await {
            Ok(records) => {
                let contacts = records
                    .into_iter()
                    .map(|record| from_remote(record, None))
                    .collect::<Vec<_>>();
                debug!(count = contacts.len(), "contacts loaded");
                flight.finish(|snapshot| snapshot.contacts = contacts);
                Outcome::Applied
            }
            Err(err) => flight.fail(err),
        }
    }

    /// Create a new contact. Any id on the draft is ignored; the service
    /// assigns one, and the duplicate check covers every existing contact.
    pub async fn add(&self, draft: ContactDraft) -> Outcome {
        let draft = ContactDraft { id: None, ..draft };
        let flight = match self.begin(|snapshot| check_draft(&draft, &snapshot.contacts)) {
            Ok(flight) => flight,
            Err(outcome) => return outcome,
        };
        let body = to_remote(&draft);
        match self.call(move |backend| backend.create_contact(&body)).await {
            Ok(record) => {
                let contact = from_remote(record, draft.supplied_avatar());
                info!(id = %contact.id, "contact created");
                flight.finish(|snapshot| snapshot.contacts.push(contact));
                Outcome::Applied
            }
            Err(err) => flight.fail(err),
        }
    }

    pub async fn update(&self, draft: ContactDraft) -> Outcome {
        let Some(id) = draft.id.clone() else {
            return Outcome::Failed(
                Error::new(ErrorKind::Usage).with_message("cannot update a contact without an id"),
            );
        };
        let flight = match self.begin(|snapshot| check_draft(&draft, &snapshot.contacts)) {
            Ok(flight) => flight,
            Err(outcome) => return outcome,
        };
        let body = to_remote(&draft);
        let target = id.clone();
        match self
            .call(move |backend| backend.update_contact(&target, &body))
            .await
        {
            Ok(record) => {
                let contact = from_remote(record, draft.supplied_avatar());
                info!(id = %id, "contact updated");
                flight.finish(|snapshot| {
                    if let Some(slot) = snapshot.contacts.iter_mut().find(|c| c.id == id) {
                        *slot = contact;
                    }
                });
                Outcome::Applied
            }
            Err(err) => flight.fail(err),
        }
    }

    /// Delete after asking `confirm`; a "no" is a no-op.
    pub async fn remove(&self, id: &ContactId, confirm: &dyn Confirm) -> Outcome {
        if self.is_loading() {
            return Outcome::Busy;
        }
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(id = %id, "delete declined");
            return Outcome::Cancelled;
        }
        let flight = match self.begin(|_| Ok(())) {
            Ok(flight) => flight,
            Err(outcome) => return outcome,
        };
        let target = id.clone();
        match self.call(move |backend| backend.delete_contact(&target)).await {
            Ok(()) => {
                info!(id = %id, "contact deleted");
                flight.finish(|snapshot| snapshot.contacts.retain(|c| &c.id != id));
                Outcome::Applied
            }
            Err(err) => flight.fail(err),
        }
    }

    /// Claim the in-flight slot, running `check` against the current state
    /// under the same lock.
    fn begin<F>(&self, check: F) -> Result<InFlight<'_>, Outcome>
    where
        F: FnOnce(&Snapshot) -> Result<(), Outcome>,
    {
        let mut rejected = None;
        let started = self.state.send_if_modified(|snapshot| {
            if snapshot.loading {
                rejected = Some(Outcome::Busy);
                return false;
            }
            if let Err(outcome) = check(snapshot) {
                rejected = Some(outcome);
                return false;
            }
            snapshot.loading = true;
            snapshot.error = None;
            true
        });
        if started {
            Ok(InFlight {
                state: &self.state,
                settled: false,
            })
        } else {
            let outcome = rejected.unwrap_or(Outcome::Busy);
            debug!(?outcome, "operation not started");
            Err(outcome)
        }
    }

    async fn call<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&B) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || op(&backend))
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("backend task failed")
                    .with_source(err)
            })?
    }
}

fn check_draft(draft: &ContactDraft, contacts: &[Contact]) -> Result<(), Outcome> {
    let errors = validate_draft(draft, contacts);
    if errors.is_valid() {
        Ok(())
    } else {
        Err(Outcome::Invalid(errors))
    }
}

/// Holds the loading flag; clears it on drop if the operation never settled.
struct InFlight<'a> {
    state: &'a watch::Sender<Snapshot>,
    settled: bool,
}

impl InFlight<'_> {
    fn finish<F>(mut self, apply: F)
    where
        F: FnOnce(&mut Snapshot),
    {
        self.settled = true;
        self.state.send_modify(|snapshot| {
            apply(snapshot);
            snapshot.loading = false;
        });
    }

    fn fail(mut self, err: Error) -> Outcome {
        self.settled = true;
        warn!(error = %err, "operation failed");
        let message = err.message().to_string();
        self.state.send_modify(|snapshot| {
            snapshot.loading = false;
            snapshot.error = Some(message);
        });
        Outcome::Failed(err)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_modify(|snapshot| snapshot.loading = false);
        }
    }
}
