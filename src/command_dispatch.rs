//! Purpose: Execute one parsed `agenda` subcommand against the remote agenda.
//! Role: Binary-only glue between clap types and `ContactStore`/`ContactForm`.
//! Invariants: Local validation runs before the first request for add/edit.
//! Invariants: Every store outcome is turned into output or an `Error`.
use super::*;

use agenda::api::{
    ContactForm, ContactId, ContactStore, FieldResult, Outcome, RemoteClient, validate_field,
};
use tracing::debug;

pub(super) async fn dispatch_command(
    command: Command,
    config: AgendaConfig,
) -> Result<RunOutcome, Error> {
    debug!(url = %config.base_url(), agenda = config.slug(), "using agenda");
    let store = ContactStore::new(RemoteClient::new(config));
    match command {
        Command::List { json } => {
            store.fetch_all().await.into_result()?;
            emit_contacts(&store.contacts(), json);
            Ok(RunOutcome::ok())
        }
        Command::Show { id, json } => {
            store.fetch_all().await.into_result()?;
            let id = ContactId::from(id.as_str());
            let contact = store.find(&id).ok_or_else(|| missing_contact(&id))?;
            emit_contact(&contact, json);
            Ok(RunOutcome::ok())
        }
        Command::Add(args) => {
            let mut form = ContactForm::new();
            for (field, value) in args.fields() {
                form.set_field(field, value, &[]);
            }
            if !form.validate(&[]) {
                return Err(validation_error(form.errors()));
            }
            store.fetch_all().await.into_result()?;
            submitted(form.submit(&store).await)?;
            if let Some(contact) = store.contacts().last() {
                emit_contact(contact, args.json);
            }
            Ok(RunOutcome::ok())
        }
        Command::Edit(args) => {
            let fields = args.fields();
            if fields.is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("nothing to change")
                    .with_hint("Pass at least one of --name, --email, --phone, --address, --avatar."));
            }
            for (field, value) in &fields {
                if let FieldResult::Invalid(message) = validate_field(*field, value, &[], None) {
                    return Err(Error::new(ErrorKind::Validation)
                        .with_message(format!("{field}: {message}"))
                        .with_field(field.name()));
                }
            }

            let id = ContactId::from(args.id.as_str());
            store.fetch_all().await.into_result()?;
            let contacts = store.contacts();
            let mut form = ContactForm::edit(&store, &id)?;
            for (field, value) in fields {
                form.set_field(field, value, &contacts);
            }
            submitted(form.submit(&store).await)?;
            let contact = store.find(&id).ok_or_else(|| missing_contact(&id))?;
            emit_contact(&contact, args.json);
            Ok(RunOutcome::ok())
        }
        Command::Delete { id, yes } => {
            let id = ContactId::from(id.as_str());
            let outcome = if yes {
                store.remove(&id, &|_: &str| true).await
            } else {
                store.remove(&id, &prompt_confirm).await
            };
            match outcome {
                Outcome::Cancelled => Err(Error::new(ErrorKind::Cancelled)
                    .with_message(format!("kept contact {id}"))),
                outcome => {
                    outcome.into_result()?;
                    eprintln!("Deleted contact {id}.");
                    Ok(RunOutcome::ok())
                }
            }
        }
    }
}

fn submitted(outcome: Outcome) -> Result<(), Error> {
    match outcome {
        Outcome::Invalid(errors) => Err(validation_error(&errors)),
        outcome => outcome.into_result(),
    }
}

fn missing_contact(id: &ContactId) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message(format!("no contact with id {id}"))
        .with_hint("Run `agenda list` to see contact ids.")
}
