//! Homecare attachment storage
//!
//! Binary uploads attached to a patient record: profile images and DICOM imaging files.
//!
//! ## Design Principles
//!
//! - Binary bytes are kept apart from the YAML record that references them
//! - Stored files are immutable and addressed by their SHA-256 digest
//! - Identical content is stored once per record
//! - Storage is scoped to one record directory; no cross-record namespace exists
//!
//! ## Storage Model
//!
//! ```text
//! patients/
//! └── <s1>/<s2>/<record_id>/
//!     ├── patient.yaml
//!     └── files/
//!         └── sha256/
//!             └── ab/
//!                 └── cd/
//!                     └── abcd3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use homecare_files::{AttachmentKind, AttachmentStore};
//! use homecare_uuid::RecordId;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new("homecare_data/patients");
//! let patient_id = RecordId::parse("550e8400e29b41d4a716446655440000")?;
//!
//! let store = AttachmentStore::new(root, patient_id)?;
//! let bytes = std::fs::read("chest.dcm")?;
//! let meta = store.add_bytes(AttachmentKind::Dicom, "chest.dcm", &bytes)?;
//! println!("stored {} bytes as {}", meta.size_bytes, meta.hash);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::{
    DICOM_MEDIA_TYPE, FILES_FOLDER_NAME, MAX_DICOM_BYTES, MAX_PROFILE_IMAGE_BYTES,
    PROFILE_IMAGE_MEDIA_TYPES,
};
pub use files::{AttachmentKind, AttachmentStore, FileMetadata};
pub use homecare_uuid::{RecordId, Sha256Hash};

/// Errors that can occur during attachment operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Record directory does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The upload contained no bytes
    #[error("Upload is empty")]
    EmptyUpload,

    /// The upload exceeds the size limit for its kind
    #[error("{kind} upload is {size_bytes} bytes, limit is {limit_bytes}")]
    TooLarge {
        kind: AttachmentKind,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// The detected media type is not accepted for this kind of attachment
    #[error("Unsupported media type for {kind}: {detected}")]
    UnsupportedMediaType {
        kind: AttachmentKind,
        detected: String,
    },

    /// File already exists in content-addressed storage (immutability violation)
    #[error("File with hash {0} already exists in storage")]
    FileAlreadyExists(String),

    /// No stored file has the requested hash
    #[error("File not found for hash: {0}")]
    FileNotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identifier or hash validation failed
    #[error("UUID error: {0}")]
    Uuid(#[from] homecare_uuid::UuidError),
}
