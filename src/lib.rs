//! Purpose: Contact synchronization and validation core for a remote address book.
//! Exports: `api` (store, form, backends), `core` (errors, records, validation).
//! Role: Library backing the `agenda` CLI and any other presentation layer.
//! Invariants: Core modules are pure; all I/O goes through `api` backends.
pub mod api;
pub mod core;
