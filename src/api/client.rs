//! Purpose: Define the backend seam the contact store talks to, plus agenda addressing.
//! Exports: `ContactBackend`, `AgendaConfig`, `MemoryAgenda`, `ApiResult`.
//! Role: Lets the store run against the HTTP client or an in-process agenda.
//! Invariants: Backend calls are blocking; the store moves them off the async runtime.
//! Invariants: Agenda URLs are always `{base}/agendas/{slug}[/contacts[/{id}]]`.
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{ContactId, RemoteContact, RemoteRecord};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use url::Url;

pub type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_BASE_URL: &str = "https://playground.4geeks.com/contact";
pub const DEFAULT_AGENDA_SLUG: &str = "mi-agenda-unica";

/// Remote contact store operations, in the remote schema.
pub trait ContactBackend: Send + Sync + 'static {
    fn list_contacts(&self) -> ApiResult<Vec<RemoteRecord>>;

    fn create_contact(&self, body: &RemoteContact) -> ApiResult<RemoteRecord>;

    fn update_contact(&self, id: &ContactId, body: &RemoteContact) -> ApiResult<RemoteRecord>;

    fn delete_contact(&self, id: &ContactId) -> ApiResult<()>;
}

/// Where the agenda lives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AgendaConfig {
    base_url: Url,
    slug: String,
}

impl AgendaConfig {
    pub fn new(base_url: &str, slug: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let slug = slug.into();
        ensure_slug(&slug)?;
        Ok(Self { base_url, slug })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn agenda_url(&self) -> ApiResult<Url> {
        build_url(&self.base_url, &["agendas", &self.slug])
    }

    pub fn contacts_url(&self) -> ApiResult<Url> {
        build_url(&self.base_url, &["agendas", &self.slug, "contacts"])
    }

    pub fn contact_url(&self, id: &ContactId) -> ApiResult<Url> {
        build_url(
            &self.base_url,
            &["agendas", &self.slug, "contacts", id.as_str()],
        )
    }
}

fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid agenda base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("agenda base url must use http or https scheme"));
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage).with_message("agenda base url cannot be a base"));
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn ensure_slug(slug: &str) -> ApiResult<()> {
    if slug.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("agenda slug must not be empty"));
    }
    if slug.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("agenda slug must not contain path separators"));
    }
    Ok(())
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("agenda base url cannot be a base")
        })?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

/// In-process agenda with the same semantics as the remote service.
///
/// Ids are assigned sequentially from 1. Failures can be scripted with
/// [`MemoryAgenda::fail_next`]; every call, failed or not, is counted.
#[derive(Debug, Default)]
pub struct MemoryAgenda {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    records: Vec<RemoteRecord>,
    failures: VecDeque<(ErrorKind, String)>,
    requests: usize,
}

impl MemoryAgenda {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<RemoteRecord>) -> Self {
        let agenda = Self::new();
        {
            let mut state = agenda.lock();
            state.next_id = records
                .iter()
                .filter_map(|record| record.id.as_str().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            state.records = records;
        }
        agenda
    }

    /// Make the next call fail with `kind` and `message`.
    pub fn fail_next(&self, kind: ErrorKind, message: impl Into<String>) {
        self.lock().failures.push_back((kind, message.into()));
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    pub fn records(&self) -> Vec<RemoteRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn begin(&self) -> ApiResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.requests += 1;
        if let Some((kind, message)) = state.failures.pop_front() {
            let mut err = Error::new(kind).with_message(message);
            if kind == ErrorKind::Remote {
                err = err.with_status(400);
            }
            return Err(err);
        }
        Ok(state)
    }
}

impl ContactBackend for MemoryAgenda {
    fn list_contacts(&self) -> ApiResult<Vec<RemoteRecord>> {
        let state = self.begin()?;
        Ok(state.records.clone())
    }

    fn create_contact(&self, body: &RemoteContact) -> ApiResult<RemoteRecord> {
        let mut state = self.begin()?;
        state.next_id += 1;
        let record = record_from_body(ContactId::from(state.next_id), body);
        state.records.push(record.clone());
        Ok(record)
    }

    fn update_contact(&self, id: &ContactId, body: &RemoteContact) -> ApiResult<RemoteRecord> {
        let mut state = self.begin()?;
        let Some(slot) = state.records.iter_mut().find(|record| &record.id == id) else {
            return Err(not_found(id));
        };
        *slot = record_from_body(id.clone(), body);
        Ok(slot.clone())
    }

    fn delete_contact(&self, id: &ContactId) -> ApiResult<()> {
        let mut state = self.begin()?;
        let before = state.records.len();
        state.records.retain(|record| &record.id != id);
        if state.records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn record_from_body(id: ContactId, body: &RemoteContact) -> RemoteRecord {
    RemoteRecord {
        id,
        name: Some(body.name.clone()),
        email: Some(body.email.clone()),
        phone: Some(body.phone.clone()),
        address: Some(body.address.clone()),
    }
}

fn not_found(id: &ContactId) -> Error {
    Error::new(ErrorKind::Remote)
        .with_message(format!("Contact with id {id} doesn't exist"))
        .with_status(404)
}
