use crate::reminders::DispatchError;
use homecare_uuid::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "create failed and cleanup also failed (path: {path}): create={create_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterCreateFailed {
        path: std::path::PathBuf,
        #[source]
        create_error: Box<RecordError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("invalid text: {0}")]
    Text(#[from] homecare_types::TextError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] homecare_uuid::UuidError),
    #[error("attachment error: {0}")]
    Files(#[from] homecare_files::FilesError),
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;

/// Failures of a reminder pass.
///
/// `StoreUnavailable` fails the whole pass. The other two variants are recorded per
/// (medication, scheduled time) pair and never stop the remaining pairs from being processed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("medication store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("dispatch failed for medication {medication_id}: {source}")]
    DispatchFailed {
        medication_id: RecordId,
        #[source]
        source: DispatchError,
    },
    #[error("medication {medication_id} references patient {patient_id}, which could not be resolved")]
    DataIntegrityFault {
        medication_id: RecordId,
        patient_id: RecordId,
    },
}

pub type ReminderResult<T> = std::result::Result<T, ReminderError>;

impl From<RecordError> for ReminderError {
    fn from(e: RecordError) -> Self {
        ReminderError::StoreUnavailable(e.to_string())
    }
}
