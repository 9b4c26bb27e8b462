// Core modules: error modeling, contact records, validation rules.
pub mod error;
pub mod record;
pub mod validate;
