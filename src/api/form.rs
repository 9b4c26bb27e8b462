//! Purpose: One create/edit form session over a contact store.
//! Exports: `ContactForm`, `FormMode`.
//! Role: Holds form values and their derived field state; submits through the store.
//! Invariants: Field state is recomputed from values, never edited directly.
//! Invariants: A blocked submit sends nothing and leaves the store untouched.
use super::client::{ApiResult, ContactBackend};
use super::store::{ContactStore, Outcome};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Contact, ContactDraft, ContactId};
use crate::core::validate::{Field, FieldErrors, validate_draft, validate_field};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormMode {
    Create,
    Edit(ContactId),
}

#[derive(Clone, Debug)]
pub struct ContactForm {
    mode: FormMode,
    draft: ContactDraft,
    errors: FieldErrors,
}

impl Default for ContactForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactForm {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            draft: ContactDraft::default(),
            errors: FieldErrors::default(),
        }
    }

    /// Start editing a contact the store already knows about.
    pub fn edit<B: ContactBackend>(store: &ContactStore<B>, id: &ContactId) -> ApiResult<Self> {
        let contact = store.find(id).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message(format!("no contact with id {id}"))
                .with_hint("Refresh the contact list and try again.")
        })?;
        Ok(Self {
            mode: FormMode::Edit(id.clone()),
            draft: ContactDraft::from(&contact),
            errors: FieldErrors::default(),
        })
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn draft(&self) -> &ContactDraft {
        &self.draft
    }

    pub fn value(&self, field: Field) -> &str {
        field.value(&self.draft)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Change one value and re-check just that field.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>, existing: &[Contact]) {
        *field.value_mut(&mut self.draft) = value.into();
        let value = field.value(&self.draft);
        let result = validate_field(field, value, existing, self.draft.id.as_ref());
        self.errors.record(field, value, result);
    }

    pub fn validate(&mut self, existing: &[Contact]) -> bool {
        self.errors = validate_draft(&self.draft, existing);
        self.errors.is_valid()
    }

    /// Validate everything against the store, then create or update.
    ///
    /// A successful create clears the form for the next entry.
    pub async fn submit<B: ContactBackend>(&mut self, store: &ContactStore<B>) -> Outcome {
        if !self.validate(&store.contacts()) {
            return Outcome::Invalid(self.errors.clone());
        }
        let outcome = match &self.mode {
            FormMode::Create => store.add(self.draft.clone()).await,
            FormMode::Edit(id) => {
                let draft = self.draft.clone().with_id(id.clone());
                store.update(draft).await
            }
        };
        match &outcome {
            Outcome::Applied if self.mode == FormMode::Create => {
                self.draft = ContactDraft::default();
                self.errors = FieldErrors::default();
            }
            Outcome::Invalid(errors) => self.errors = errors.clone(),
            _ => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::{ContactForm, FormMode};
    use crate::api::client::MemoryAgenda;
    use crate::api::store::{ContactStore, Outcome};
    use crate::core::error::ErrorKind;
    use crate::core::record::ContactId;
    use crate::core::validate::{
        Field, MSG_EMAIL_DUPLICATE, MSG_EMAIL_INVALID, MSG_EMAIL_REQUIRED, MSG_PHONE_INVALID,
    };

    #[test]
    fn live_validation_tracks_each_field() {
        let mut form = ContactForm::new();
        form.set_field(Field::Email, "ada@", &[]);
        assert_eq!(form.errors().get(Field::Email), Some(MSG_EMAIL_INVALID));
        form.set_field(Field::Email, "ada@example.com", &[]);
        assert_eq!(form.errors().get(Field::Email), None);
        assert!(form.errors().is_marked_valid(Field::Email));

        form.set_field(Field::Phone, "12", &[]);
        assert_eq!(form.errors().get(Field::Phone), Some(MSG_PHONE_INVALID));
        form.set_field(Field::Phone, "", &[]);
        assert_eq!(form.errors().get(Field::Phone), None);
        assert!(!form.errors().is_marked_valid(Field::Phone));
    }

    #[test]
    fn clearing_email_reports_required() {
        let mut form = ContactForm::new();
        form.set_field(Field::Email, "a@b.co", &[]);
        form.set_field(Field::Email, "", &[]);
        assert_eq!(form.errors().get(Field::Email), Some(MSG_EMAIL_REQUIRED));
    }

    #[tokio::test]
    async fn submit_creates_and_resets() {
        let store = ContactStore::new(MemoryAgenda::new());
        let mut form = ContactForm::new();
        form.set_field(Field::FullName, "Ada Lovelace", &[]);
        form.set_field(Field::Email, "ada@example.com", &[]);

        assert!(form.submit(&store).await.is_applied());
        assert_eq!(store.contacts().len(), 1);
        assert_eq!(form.value(Field::FullName), "");
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn blocked_submit_sends_nothing() {
        let store = ContactStore::new(MemoryAgenda::new());
        let mut form = ContactForm::new();
        form.set_field(Field::FullName, "Ada", &[]);
        form.set_field(Field::Email, "not-an-email", &[]);

        let outcome = form.submit(&store).await;
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(store.backend().request_count(), 0);
        assert!(store.contacts().is_empty());
        assert_eq!(form.value(Field::Email), "not-an-email");
    }

    #[tokio::test]
    async fn edit_form_loads_contact_and_detects_duplicates() {
        let store = ContactStore::new(MemoryAgenda::new());
        let mut form = ContactForm::new();
        form.set_field(Field::FullName, "A", &[]);
        form.set_field(Field::Email, "x@y.com", &[]);
        assert!(form.submit(&store).await.is_applied());
        form.set_field(Field::FullName, "B", &[]);
        form.set_field(Field::Email, "b@y.com", &[]);
        assert!(form.submit(&store).await.is_applied());

        let b_id = ContactId::from(2);
        let mut edit = ContactForm::edit(&store, &b_id).expect("edit");
        assert_eq!(edit.mode(), &FormMode::Edit(b_id.clone()));
        assert!(edit.is_editing());
        assert!(!form.is_editing());
        assert_eq!(edit.draft().id.as_ref(), Some(&b_id));
        assert_eq!(edit.draft().email, "b@y.com");
        assert_eq!(edit.value(Field::FullName), "B");

        edit.set_field(Field::Email, "X@y.com", &store.contacts());
        assert_eq!(edit.errors().get(Field::Email), Some(MSG_EMAIL_DUPLICATE));
        let outcome = edit.submit(&store).await;
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(store.find(&b_id).expect("b").email, "b@y.com");

        edit.set_field(Field::Email, "b2@y.com", &store.contacts());
        assert!(edit.submit(&store).await.is_applied());
        assert_eq!(store.find(&b_id).expect("b").email, "b2@y.com");
        assert_eq!(edit.value(Field::Email), "b2@y.com");
    }

    #[test]
    fn editing_unknown_contact_is_not_found() {
        let store = ContactStore::new(MemoryAgenda::new());
        let err = ContactForm::edit(&store, &ContactId::from(5)).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
