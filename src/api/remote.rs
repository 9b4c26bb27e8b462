//! Purpose: HTTP client for the agenda REST protocol (JSON over ureq).
//! Exports: `RemoteClient`.
//! Role: `ContactBackend` implementation that talks to `{base}/agendas/{slug}`.
//! Invariants: Non-success statuses become `ErrorKind::Remote` with the status attached.
//! Invariants: Failure messages come from the payload `detail` when present.
//! Invariants: Listing first ensures the agenda exists; ensure failures do not abort it.
use super::client::{AgendaConfig, ApiResult, ContactBackend};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{ContactId, RemoteContact, RemoteRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Statuses the service answers with when the agenda is already there.
const AGENDA_EXISTS_STATUSES: [u16; 2] = [400, 409];

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    config: AgendaConfig,
    agent: ureq::Agent,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operation {
    EnsureAgenda,
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    fn default_message(self, status: u16) -> String {
        match self {
            Operation::EnsureAgenda => "failed to create agenda".to_string(),
            Operation::List => format!("failed to load contacts (status {status})"),
            Operation::Create => "failed to create contact".to_string(),
            Operation::Update => "failed to update contact".to_string(),
            Operation::Delete => "failed to delete contact".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ContactsEnvelope {
    #[serde(default)]
    contacts: Option<Vec<RemoteRecord>>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    detail: Option<Value>,
}

impl RemoteClient {
    pub fn new(config: AgendaConfig) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self {
            inner: Arc::new(RemoteClientInner { config, agent }),
        }
    }

    pub fn config(&self) -> &AgendaConfig {
        &self.inner.config
    }

    /// Create the agenda, treating "already exists" as success.
    pub fn ensure_agenda(&self) -> ApiResult<()> {
        let url = self.inner.config.agenda_url()?;
        debug!(url = %url, "ensuring agenda exists");
        let response = self
            .request("POST", &url)
            .set("Content-Type", "application/json")
            .call();
        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) if AGENDA_EXISTS_STATUSES.contains(&code) => {
                debug!(status = code, "agenda already exists");
                Ok(())
            }
            Err(ureq::Error::Status(code, resp)) => {
                Err(parse_error_response(code, resp, Operation::EnsureAgenda))
            }
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    fn request_json<T, R>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&T>,
        operation: Operation,
    ) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(method, url, body, operation)?;
        read_json_response(response)
    }

    fn send<T>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&T>,
        operation: Operation,
    ) -> ApiResult<ureq::Response>
    where
        T: Serialize,
    {
        debug!(method, url = %url, ?operation, "sending request");
        let request = self.request(method, url).set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => {
                Err(parse_error_response(code, resp, operation))
            }
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.inner.agent.request(method, url.as_str())
    }
}

impl ContactBackend for RemoteClient {
    fn list_contacts(&self) -> ApiResult<Vec<RemoteRecord>> {
        if let Err(err) = self.ensure_agenda() {
            warn!(error = %err, "could not ensure agenda exists; listing anyway");
        }
        let url = self.inner.config.contacts_url()?;
        let envelope: ContactsEnvelope =
            self.request_json::<(), _>("GET", &url, None, Operation::List)?;
        Ok(envelope.contacts.unwrap_or_default())
    }

    fn create_contact(&self, body: &RemoteContact) -> ApiResult<RemoteRecord> {
        let url = self.inner.config.contacts_url()?;
        self.request_json("POST", &url, Some(body), Operation::Create)
    }

    fn update_contact(&self, id: &ContactId, body: &RemoteContact) -> ApiResult<RemoteRecord> {
        let url = self.inner.config.contact_url(id)?;
        self.request_json("PUT", &url, Some(body), Operation::Update)
    }

    fn delete_contact(&self, id: &ContactId) -> ApiResult<()> {
        let url = self.inner.config.contact_url(id)?;
        self.send::<()>("DELETE", &url, None, Operation::Delete)?;
        Ok(())
    }
}

fn transport_error(err: ureq::Transport) -> Error {
    Error::new(ErrorKind::Network)
        .with_message("could not reach the contact service")
        .with_source(err)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Network)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response, operation: Operation) -> Error {
    let body = response.into_string().unwrap_or_default();
    error_from_body(status, &body, operation)
}

fn error_from_body(status: u16, body: &str, operation: Operation) -> Error {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.detail)
        .and_then(|detail| detail_message(&detail))
        .unwrap_or_else(|| operation.default_message(status));
    warn!(status, ?operation, %message, "request rejected");
    Error::new(ErrorKind::Remote)
        .with_message(message)
        .with_status(status)
}

/// `detail` is a string for most errors and a list of `{msg, ...}` entries
/// for request validation errors.
fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.as_str())
                })
                .collect::<Vec<_>>();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
