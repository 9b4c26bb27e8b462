//! Purpose: In-process mock of the agenda REST service for integration tests.
//! Exports: `MockAgenda`.
//! Role: Serves `/agendas/:slug[/contacts[/:id]]` from memory on a loopback port.
//! Invariants: Each server runs on its own thread and runtime; it lives until the test exits.
//! Invariants: Every request is logged as `METHOD path` for assertions.
#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    agendas: BTreeMap<String, Vec<Value>>,
    next_id: u64,
    requests: Vec<String>,
    fail_next: Option<(u16, Value)>,
    refuse_agenda_create: bool,
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockAgenda {
    base_url: String,
    state: Shared,
}

impl MockAgenda {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock agenda");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("mock addr");
        let state: Shared = Arc::new(Mutex::new(MockState {
            next_id: 1,
            ..MockState::default()
        }));

        let app = Router::new()
            .route("/agendas/:slug", post(create_agenda))
            .route(
                "/agendas/:slug/contacts",
                post(create_contact).get(list_contacts),
            )
            .route(
                "/agendas/:slug/contacts/:id",
                put(update_contact).delete(delete_contact),
            )
            .with_state(Arc::clone(&state));

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
                axum::serve(listener, app).await.expect("mock serve");
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pre-create an agenda holding `(name, email)` contacts; returns their ids.
    pub fn seed(&self, slug: &str, contacts: &[(&str, &str)]) -> Vec<u64> {
        let mut state = lock(&self.state);
        let mut ids = Vec::new();
        for (name, email) in contacts {
            let id = state.next_id;
            state.next_id += 1;
            ids.push(id);
            let record = json!({
                "id": id,
                "name": name,
                "email": email,
                "phone": "",
                "address": "",
                "agenda_slug": slug,
            });
            state
                .agendas
                .entry(slug.to_string())
                .or_default()
                .push(record);
        }
        state.agendas.entry(slug.to_string()).or_default();
        ids
    }

    pub fn has_agenda(&self, slug: &str) -> bool {
        lock(&self.state).agendas.contains_key(slug)
    }

    pub fn contacts(&self, slug: &str) -> Vec<Value> {
        lock(&self.state)
            .agendas
            .get(slug)
            .cloned()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// The next contact request (not agenda creation) answers with `status` and `body`.
    pub fn fail_next(&self, status: u16, body: Value) {
        lock(&self.state).fail_next = Some((status, body));
    }

    pub fn refuse_agenda_create(&self) {
        lock(&self.state).refuse_agenda_create = true;
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

fn begin<'a>(
    state: &'a Shared,
    method: &Method,
    uri: &Uri,
) -> Result<MutexGuard<'a, MockState>, Response> {
    let mut guard = lock(state);
    guard.requests.push(format!("{method} {}", uri.path()));
    match guard.fail_next.take() {
        Some((status, body)) => Err(reply(status, body)),
        None => Ok(guard),
    }
}

async fn create_agenda(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    let mut guard = lock(&state);
    guard.requests.push(format!("{method} {}", uri.path()));
    if guard.refuse_agenda_create {
        return reply(500, json!({"detail": "agenda service unavailable"}));
    }
    if guard.agendas.contains_key(&slug) {
        return reply(
            400,
            json!({"detail": format!("Agenda \"{slug}\" already exists.")}),
        );
    }
    guard.agendas.insert(slug.clone(), Vec::new());
    reply(201, json!({"slug": slug, "id": 1}))
}

async fn list_contacts(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    let guard = match begin(&state, &method, &uri) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    match guard.agendas.get(&slug) {
        Some(contacts) => reply(200, json!({"slug": slug, "contacts": contacts})),
        None => reply(
            404,
            json!({"detail": format!("Agenda \"{slug}\" doesn't exist.")}),
        ),
    }
}

async fn create_contact(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Path(slug): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match begin(&state, &method, &uri) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if !guard.agendas.contains_key(&slug) {
        return reply(404, json!({"detail": "Agenda not found"}));
    }
    let id = guard.next_id;
    guard.next_id += 1;
    let record = contact_record(id, &slug, &body);
    if let Some(contacts) = guard.agendas.get_mut(&slug) {
        contacts.push(record.clone());
    }
    reply(201, record)
}

async fn update_contact(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Path((slug, id)): Path<(String, u64)>,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match begin(&state, &method, &uri) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let record = contact_record(id, &slug, &body);
    let slot = guard
        .agendas
        .get_mut(&slug)
        .and_then(|contacts| contacts.iter_mut().find(|c| c["id"] == json!(id)));
    match slot {
        Some(slot) => {
            *slot = record.clone();
            reply(200, record)
        }
        None => reply(
            404,
            json!({"detail": format!("Contact with id {id} doesn't exist")}),
        ),
    }
}

async fn delete_contact(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Path((slug, id)): Path<(String, u64)>,
) -> Response {
    let mut guard = match begin(&state, &method, &uri) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(contacts) = guard.agendas.get_mut(&slug) else {
        return reply(404, json!({"detail": "Agenda not found"}));
    };
    let before = contacts.len();
    contacts.retain(|c| c["id"] != json!(id));
    if contacts.len() == before {
        return reply(
            404,
            json!({"detail": format!("Contact with id {id} doesn't exist")}),
        );
    }
    StatusCode::NO_CONTENT.into_response()
}

fn contact_record(id: u64, slug: &str, body: &Value) -> Value {
    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    json!({
        "id": id,
        "name": text("name"),
        "email": text("email"),
        "phone": text("phone"),
        "address": text("address"),
        "agenda_slug": slug,
    })
}
