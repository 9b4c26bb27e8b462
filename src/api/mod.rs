//! Purpose: Public API boundary for the agenda core.
//! Exports: Store, form, backends, snapshots, and the shared error/record types.
//! Role: The only path presentation layers (including the CLI) should use.
//! Invariants: Backends are injected; there is no global store.

mod client;
mod form;
mod notify;
mod remote;
mod store;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::record::{
    Contact, ContactDraft, ContactId, RemoteContact, RemoteRecord, avatar_url, from_remote,
    to_remote,
};
pub use crate::core::validate::{Field, FieldErrors, FieldResult, validate_draft, validate_field};
pub use client::{
    AgendaConfig, ApiResult, ContactBackend, DEFAULT_AGENDA_SLUG, DEFAULT_BASE_URL, MemoryAgenda,
};
pub use form::{ContactForm, FormMode};
pub use notify::{Snapshot, Subscription};
pub use remote::RemoteClient;
pub use store::{Confirm, ContactStore, DELETE_PROMPT, Outcome};
