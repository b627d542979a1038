//! Patient and medication records as persisted on disk.

use chrono::{DateTime, Utc};
use homecare_files::FileMetadata;
use homecare_types::{NonEmptyText, PhoneNumber, ScheduleTime};
use homecare_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A patient who receives medication reminders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub phone: PhoneNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<NonEmptyText>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<FileMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imaging_files: Vec<FileMetadata>,
}

/// Input for [`RecordStore::create_patient`](crate::RecordStore::create_patient).
#[derive(Clone, Debug)]
pub struct NewPatient {
    pub name: NonEmptyText,
    pub phone: PhoneNumber,
    pub gender: Option<NonEmptyText>,
    pub address: Option<NonEmptyText>,
    pub city: Option<NonEmptyText>,
}

impl NewPatient {
    pub fn new(name: NonEmptyText, phone: PhoneNumber) -> Self {
        Self {
            name,
            phone,
            gender: None,
            address: None,
            city: None,
        }
    }
}

/// A prescribed medication belonging to exactly one patient.
///
/// `usage_times` is a set: the same time of day cannot be scheduled twice for one medication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_frequency: Option<u32>,
    #[serde(default)]
    pub usage_times: BTreeSet<ScheduleTime>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`RecordStore::add_medication`](crate::RecordStore::add_medication).
#[derive(Clone, Debug)]
pub struct NewMedication {
    pub name: NonEmptyText,
    pub description: Option<NonEmptyText>,
    pub dose: Option<f64>,
    pub dose_frequency: Option<u32>,
    pub usage_times: BTreeSet<ScheduleTime>,
}

impl NewMedication {
    pub fn new(name: NonEmptyText) -> Self {
        Self {
            name,
            description: None,
            dose: None,
            dose_frequency: None,
            usage_times: BTreeSet::new(),
        }
    }
}
