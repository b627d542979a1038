//! # Homecare Core
//!
//! Core business logic for the homecare back end.
//!
//! This crate contains pure data operations and the reminder pass:
//! - Patient and medication records in sharded YAML storage under the data directory
//! - Profile image and DICOM attachments via `homecare-files`
//! - The medication reminder evaluator and its seams ([`MedicationSource`],
//!   [`NotificationDispatcher`])
//!
//! **No transport concerns**: the Twilio client lives in `homecare-messaging`, the minute loop
//! in `homecare-scheduler`, and the HTTP surface in the root binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod records;
pub mod reminders;

pub use config::{CoreConfig, MidnightPolicy, ReminderConfig};
pub use error::{RecordError, RecordResult, ReminderError, ReminderResult};
pub use records::{Medication, NewMedication, NewPatient, Patient, RecordStore};
pub use reminders::{
    DispatchError, DispatchResult, DueReminder, InMemorySource, MedicationSource,
    MedicationWithPatient, NotificationDispatcher, PassSummary, ReminderEvaluator, TimeWindow,
};

pub use homecare_files::{AttachmentKind, FileMetadata, Sha256Hash};
pub use homecare_types::{
    NonEmptyText, PhoneNumber, ScheduleTime, TextError, parse_time_of_day,
};
pub use homecare_uuid::RecordId;
