//! Purpose: Local and remote contact shapes plus the adapter between them.
//! Exports: `ContactId`, `Contact`, `ContactDraft`, `RemoteRecord`, `RemoteContact`,
//! `to_remote`, `from_remote`, `avatar_url`.
//! Role: The only place that knows the remote schema (`name`) differs from the local one.
//! Invariants: Adaptation is total; missing or null optional remote fields become "".
//! Invariants: Avatar URLs are a pure function of the name when not user supplied.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::form_urlencoded;

const AVATAR_ENDPOINT: &str = "https://ui-avatars.com/api/";
const AVATAR_PARAMS: &str = "background=6c757d&color=fff&size=150";

/// Opaque identifier assigned by the remote store.
///
/// The service sends integers, but nothing here relies on that: ids are kept
/// in their textual form and only ever compared for equality.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ContactId(String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ContactId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for ContactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match WireId::deserialize(deserializer)? {
            WireId::Number(id) => Self(id.to_string()),
            WireId::Text(id) => Self(id),
        })
    }
}

impl Serialize for ContactId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// A persisted contact in display shape.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub avatar: String,
}

/// Form values for a contact that may not have been persisted yet.
///
/// Empty `phone`/`address` mean "absent"; an empty `avatar` asks for a
/// synthesized one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactDraft {
    pub id: Option<ContactId>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub avatar: String,
}

impl ContactDraft {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: ContactId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    /// Avatar the user typed in, if any.
    pub fn supplied_avatar(&self) -> Option<&str> {
        let avatar = self.avatar.trim();
        (!avatar.is_empty()).then_some(avatar)
    }
}

impl From<&Contact> for ContactDraft {
    fn from(contact: &Contact) -> Self {
        Self {
            id: Some(contact.id.clone()),
            full_name: contact.full_name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            avatar: contact.avatar.clone(),
        }
    }
}

/// Contact as returned by the remote store. There is no avatar on the wire.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteRecord {
    pub id: ContactId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Request body for create and update.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RemoteContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

pub fn to_remote(draft: &ContactDraft) -> RemoteContact {
    RemoteContact {
        name: draft.full_name.clone(),
        email: draft.email.clone(),
        phone: draft.phone.clone(),
        address: draft.address.clone(),
    }
}

pub fn from_remote(record: RemoteRecord, avatar: Option<&str>) -> Contact {
    let full_name = record.name.unwrap_or_default();
    let avatar = match avatar.map(str::trim) {
        Some(avatar) if !avatar.is_empty() => avatar.to_string(),
        _ => avatar_url(&full_name),
    };
    Contact {
        id: record.id,
        full_name,
        email: record.email.unwrap_or_default(),
        phone: record.phone.unwrap_or_default(),
        address: record.address.unwrap_or_default(),
        avatar,
    }
}

pub fn avatar_url(name: &str) -> String {
    // form encoding turns spaces into '+'; literal '+' is already %2B here.
    let encoded = form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("{AVATAR_ENDPOINT}?name={encoded}&{AVATAR_PARAMS}")
}

#[cfg(test)]
mod tests {
    use super::{
        Contact, ContactDraft, ContactId, RemoteRecord, avatar_url, from_remote, to_remote,
    };
    use serde_json::json;

    fn record(value: serde_json::Value) -> RemoteRecord {
        serde_json::from_value(value).expect("record")
    }

    #[test]
    fn avatar_url_percent_encodes_spaces() {
        assert_eq!(
            avatar_url("Ada Lovelace"),
            "https://ui-avatars.com/api/?name=Ada%20Lovelace&background=6c757d&color=fff&size=150"
        );
    }

    #[test]
    fn avatar_url_escapes_query_delimiters() {
        let url = avatar_url("Tom & Jerry+Co");
        assert!(url.contains("name=Tom%20%26%20Jerry%2BCo&"));
    }

    #[test]
    fn to_remote_renames_name_and_keeps_empty_optionals() {
        let draft = ContactDraft::new("Ada Lovelace", "ada@example.com");
        let body = to_remote(&draft);
        assert_eq!(
            serde_json::to_value(&body).expect("json"),
            json!({"name": "Ada Lovelace", "email": "ada@example.com", "phone": "", "address": ""})
        );
    }

    #[test]
    fn from_remote_synthesizes_avatar_without_local_value() {
        let contact = from_remote(
            record(json!({"id": 7, "name": "Grace Hopper", "email": "grace@navy.mil"})),
            None,
        );
        assert_eq!(contact.id, ContactId::from(7));
        assert_eq!(contact.full_name, "Grace Hopper");
        assert_eq!(contact.phone, "");
        assert_eq!(contact.address, "");
        assert_eq!(contact.avatar, avatar_url("Grace Hopper"));
    }

    #[test]
    fn from_remote_prefers_supplied_avatar() {
        let contact = from_remote(
            record(json!({"id": "abc", "name": "Grace", "email": "g@x.io", "phone": null})),
            Some("https://img.example/g.png"),
        );
        assert_eq!(contact.id.as_str(), "abc");
        assert_eq!(contact.avatar, "https://img.example/g.png");
        assert_eq!(contact.phone, "");
    }

    #[test]
    fn blank_supplied_avatar_is_ignored() {
        let contact = from_remote(record(json!({"id": 1, "name": "Al"})), Some("  "));
        assert_eq!(contact.avatar, avatar_url("Al"));
    }

    #[test]
    fn adapter_round_trip_preserves_fields() {
        let draft = ContactDraft::new("Alan Turing", "alan@bletchley.uk")
            .with_phone("0123456789")
            .with_address("Bletchley Park");
        let body = to_remote(&draft);
        let echoed = record(json!({
            "id": 3,
            "name": body.name,
            "email": body.email,
            "phone": body.phone,
            "address": body.address,
        }));
        let contact: Contact = from_remote(echoed, None);
        assert_eq!(contact.full_name, draft.full_name);
        assert_eq!(contact.email, draft.email);
        assert_eq!(contact.phone, draft.phone);
        assert_eq!(contact.address, draft.address);
    }

    #[test]
    fn contact_serializes_in_display_shape() {
        let contact = from_remote(record(json!({"id": 9, "name": "Ada", "email": "a@b.co"})), None);
        let value = serde_json::to_value(&contact).expect("json");
        assert_eq!(value["id"], "9");
        assert_eq!(value["fullName"], "Ada");
        assert!(value.get("full_name").is_none());
    }
}
