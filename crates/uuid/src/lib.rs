//! Record identifiers and sharded-path utilities.
//!
//! Every homecare record (patient, medication) lives in its own directory derived from a
//! UUID. Identifiers use a *canonical* form: **32 lowercase hexadecimal characters** with no
//! hyphens, e.g. `550e8400e29b41d4a716446655440000`.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, a record is stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `homecare_data/patients/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps any single directory from growing to millions of entries.
//!
//! The crate also provides [`Sha256Hash`], the validated content hash used to address stored
//! attachments.

mod service;

pub use service::{RecordId, Sha256Hash, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
