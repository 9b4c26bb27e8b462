//! Purpose: `agenda` CLI entry point.
//! Role: Binary crate root; parses args, resolves config, runs one store operation.
//! Invariants: Contact output is human text by default and JSON with `--json`.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Invalid input is reported before any request is sent.
use std::ffi::OsString;
use std::io::{self, BufRead, IsTerminal, Write};

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use agenda::api::{
    AgendaConfig, Contact, DEFAULT_AGENDA_SLUG, DEFAULT_BASE_URL, Error, ErrorKind, Field,
    FieldErrors, to_exit_code,
};

const BASE_URL_ENV: &str = "AGENDA_BASE_URL";
const SLUG_ENV: &str = "AGENDA_SLUG";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run<I>(args: I) -> Result<RunOutcome, (Error, ColorMode)>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Internal)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `agenda --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let config = resolve_config(
        cli.base_url,
        cli.agenda,
        std::env::var(BASE_URL_ENV).ok(),
        std::env::var(SLUG_ENV).ok(),
    )
    .map_err(|err| (err, color_mode))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            (
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start runtime")
                    .with_source(err),
                color_mode,
            )
        })?;
    runtime
        .block_on(command_dispatch::dispatch_command(cli.command, config))
        .map_err(|err| (err, color_mode))
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn resolve_config(
    base_url: Option<String>,
    slug: Option<String>,
    env_base_url: Option<String>,
    env_slug: Option<String>,
) -> Result<AgendaConfig, Error> {
    let base_url = base_url
        .or(env_base_url.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let slug = slug
        .or(env_slug.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_AGENDA_SLUG.to_string());
    AgendaConfig::new(&base_url, slug)
        .map_err(|err| err.with_hint("Check --base-url/--agenda or AGENDA_BASE_URL/AGENDA_SLUG."))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "agenda",
    version,
    about = "Browse and edit contacts stored in a remote agenda",
    long_about = None,
    after_help = r#"EXAMPLES
  $ agenda list
  $ agenda add --name "Ada Lovelace" --email ada@example.com
  $ agenda edit 12 --phone 0123456789
  $ agenda delete 12

ENVIRONMENT
  AGENDA_BASE_URL   contact service base url (default: https://playground.4geeks.com/contact)
  AGENDA_SLUG       agenda name (default: mi-agenda-unica)
  RUST_LOG          log filter for diagnostics on stderr (default: warn)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, help = "Contact service base url")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Agenda name on the service")]
    agenda: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize error output"
    )]
    color: ColorMode,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Fetch and print every contact")]
    List {
        #[arg(long, help = "Emit JSON")]
        json: bool,
    },
    #[command(about = "Print one contact")]
    Show {
        id: String,
        #[arg(long, help = "Emit JSON")]
        json: bool,
    },
    #[command(about = "Create a contact")]
    Add(AddArgs),
    #[command(about = "Change fields of an existing contact")]
    Edit(EditArgs),
    #[command(about = "Delete a contact (asks first)")]
    Delete {
        id: String,
        #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, help = "Full name")]
    name: String,
    #[arg(long, help = "Email address")]
    email: String,
    #[arg(long, default_value = "", help = "Phone number (10+ characters)")]
    phone: String,
    #[arg(long, default_value = "", help = "Postal address")]
    address: String,
    #[arg(long, default_value = "", help = "Avatar image url (generated when empty)")]
    avatar: String,
    #[arg(long, help = "Emit JSON")]
    json: bool,
}

#[derive(Args)]
struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
    #[arg(long, help = "Emit JSON")]
    json: bool,
}

impl AddArgs {
    fn fields(&self) -> Vec<(Field, &str)> {
        vec![
            (Field::FullName, self.name.as_str()),
            (Field::Email, self.email.as_str()),
            (Field::Phone, self.phone.as_str()),
            (Field::Address, self.address.as_str()),
            (Field::Avatar, self.avatar.as_str()),
        ]
    }
}

impl EditArgs {
    fn fields(&self) -> Vec<(Field, &str)> {
        [
            (Field::FullName, &self.name),
            (Field::Email, &self.email),
            (Field::Phone, &self.phone),
            (Field::Address, &self.address),
            (Field::Avatar, &self.avatar),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|value| (field, value)))
        .collect()
    }
}

/// Ask on stderr, read one line from stdin; anything but y/yes declines.
fn prompt_confirm(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{prompt} [y/N] ");
    let _ = stderr.flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
    }
}

fn validation_error(errors: &FieldErrors) -> Error {
    let message = errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ");
    let mut err = Error::new(ErrorKind::Validation).with_message(message);
    if let Some((field, _)) = errors.iter().next() {
        err = err.with_field(field.name());
    }
    err
}

fn contact_json(contact: &Contact) -> Value {
    serde_json::to_value(contact).unwrap_or_else(|_| json!({"id": contact.id.as_str()}))
}

fn contact_line(contact: &Contact) -> String {
    let phone = if contact.phone.is_empty() {
        "no phone"
    } else {
        contact.phone.as_str()
    };
    let address = if contact.address.is_empty() {
        "no address"
    } else {
        contact.address.as_str()
    };
    format!(
        "{:>5}  {}  <{}>  {phone}  {address}",
        contact.id, contact.full_name, contact.email
    )
}

fn emit_contacts(contacts: &[Contact], json: bool) {
    if json {
        let values = contacts.iter().map(contact_json).collect::<Vec<_>>();
        emit_json(json!({ "contacts": values }));
    } else if contacts.is_empty() {
        println!("No contacts yet. Use `agenda add` to create one.");
    } else {
        for contact in contacts {
            println!("{}", contact_line(contact));
        }
    }
}

fn emit_contact(contact: &Contact, json: bool) {
    if json {
        emit_json(json!({ "contact": contact_json(contact) }));
    } else {
        println!("{}", contact_line(contact));
        println!("       avatar: {}", contact.avatar);
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// Leading tag of each line in human-readable error output.
#[derive(Copy, Clone, Debug)]
enum Label {
    Error,
    Field,
    Status,
    Hint,
    Cause,
}

impl Label {
    fn paint(self, enabled: bool) -> String {
        let (text, sgr) = match self {
            Label::Error => ("error:", "1;31"),
            Label::Field => ("field:", "36"),
            Label::Status => ("status:", "36"),
            Label::Hint => ("hint:", "33"),
            Label::Cause => ("caused by:", "2"),
        };
        if enabled {
            format!("\u{1b}[{sgr}m{text}\u{1b}[0m")
        } else {
            text.to_string()
        }
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let stderr_tty = io::stderr().is_terminal();
    let rendered = if stderr_tty {
        error_text(err, color_mode.use_color(true))
    } else {
        serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
            r#"{"error":{"kind":"Internal","message":"json encode failed"}}"#.to_string()
        })
    };
    eprintln!("{rendered}");
}

/// Source chain below `err`, outermost first.
fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&source| source.source())
        .map(ToString::to_string)
        .collect()
}

fn error_json(err: &Error) -> Value {
    let mut body = Map::new();
    body.insert("kind".into(), json!(err.kind().as_str()));
    body.insert("message".into(), json!(err.message()));
    let optional = [
        ("field", err.field().map(|field| json!(field))),
        ("status", err.status().map(|status| json!(status))),
        ("hint", err.hint().map(|hint| json!(hint))),
    ];
    body.extend(
        optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key.to_string(), value))),
    );
    let causes = error_causes(err);
    if !causes.is_empty() {
        body.insert("causes".into(), json!(causes));
    }
    json!({ "error": body })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut out = format!("{} {}", Label::Error.paint(use_color), err.message());
    let mut push = |label: Label, text: String| {
        out.push('\n');
        out.push_str(&label.paint(use_color));
        out.push(' ');
        out.push_str(&text);
    };
    if let Some(field) = err.field() {
        push(Label::Field, field.to_string());
    }
    if let Some(status) = err.status() {
        push(Label::Status, status.to_string());
    }
    if let Some(hint) = err.hint() {
        push(Label::Hint, hint.to_string());
    }
    for cause in error_causes(err) {
        push(Label::Cause, cause);
    }
    out
}
