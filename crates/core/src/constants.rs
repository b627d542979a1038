//! Constants used throughout the homecare core crate.
//!
//! Path and filename constants live here so every record type is laid out the same way.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "homecare_data";

/// Directory name for patient records.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for medication records.
pub const MEDICATIONS_DIR_NAME: &str = "medications";

/// Filename of a patient record inside its sharded directory.
pub const PATIENT_FILENAME: &str = "patient.yaml";

/// Filename of a medication record inside its sharded directory.
pub const MEDICATION_FILENAME: &str = "medication.yaml";

/// Default reminder tolerance, in minutes.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 1;

/// Default reminder text. Placeholders: `{patient}`, `{medication}`, `{dose}`, `{time}`.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Hello {patient}! Don't forget to take {medication} now with dose {dose}";

/// Rendered in place of `{dose}` when a medication has no dose amount recorded.
pub const UNSPECIFIED_DOSE_TEXT: &str = "as prescribed";
