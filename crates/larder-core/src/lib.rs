//! Larder Core — domain models, the pantry stock ledger, validation,
//! and repository trait definitions shared across all crates.

pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod validate;

pub use error::{ErrorResponse, FieldViolation, LarderError, LarderResult};
pub use ledger::PantryLedger;
