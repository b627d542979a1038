//! File-backed record store for patients and medications.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   patients/<s1>/<s2>/<id>/
//!     patient.yaml
//!     files/sha256/...        # profile image and imaging uploads
//!   medications/<s1>/<s2>/<id>/
//!     medication.yaml
//! ```
//!
//! A medication stores the id of its patient. Deleting a patient removes its medications first,
//! so the join performed for reminder passes only sees an orphan when the data directory was
//! edited by hand.

use crate::config::CoreConfig;
use crate::constants::{MEDICATION_FILENAME, PATIENT_FILENAME};
use crate::records::helpers::{
    cleanup_after_failed_create, create_unique_sharded_dir, read_sharded_records, read_yaml,
    write_yaml,
};
use crate::records::model::{Medication, NewMedication, NewPatient, Patient};
use crate::reminders::{MedicationSource, MedicationWithPatient};
use crate::{RecordError, RecordResult, ReminderError, ReminderResult};
use chrono::Utc;
use homecare_files::{AttachmentKind, AttachmentStore, FileMetadata, Sha256Hash};
use homecare_types::{PhoneNumber, ScheduleTime};
use homecare_uuid::RecordId;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct RecordStore {
    cfg: Arc<CoreConfig>,
}

impl RecordStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    /// Creates a new patient record with a freshly allocated id.
    pub fn create_patient(&self, new: NewPatient) -> RecordResult<Patient> {
        let patients_dir = self.cfg.patients_dir();
        fs::create_dir_all(&patients_dir).map_err(RecordError::StorageDirCreation)?;

        let (id, dir) = create_unique_sharded_dir(&patients_dir, RecordId::new)?;

        let patient = Patient {
            id,
            name: new.name,
            phone: new.phone,
            gender: new.gender,
            address: new.address,
            city: new.city,
            created_at: Utc::now(),
            profile_image: None,
            imaging_files: Vec::new(),
        };

        if let Err(e) = write_yaml(&dir.join(PATIENT_FILENAME), &patient) {
            return Err(cleanup_after_failed_create(&dir, e));
        }

        tracing::info!(patient = %patient.id, "created patient");
        Ok(patient)
    }

    pub fn get_patient(&self, id: &RecordId) -> RecordResult<Patient> {
        let path = self.patient_file(id);
        if !path.is_file() {
            return Err(RecordError::NotFound {
                kind: "patient",
                id: id.to_string(),
            });
        }
        read_yaml(&path)
    }

    /// Lists all readable patients, oldest first.
    ///
    /// Patient files that cannot be parsed are logged as warnings and skipped.
    pub fn list_patients(&self) -> RecordResult<Vec<Patient>> {
        let mut patients: Vec<Patient> =
            read_sharded_records(&self.cfg.patients_dir(), PATIENT_FILENAME)?;
        patients.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(patients)
    }

    pub fn update_patient_phone(&self, id: &RecordId, phone: PhoneNumber) -> RecordResult<Patient> {
        let mut patient = self.get_patient(id)?;
        patient.phone = phone;
        write_yaml(&self.patient_file(id), &patient)?;
        Ok(patient)
    }

    /// Deletes a patient, its attachments, and every medication that references it.
    ///
    /// Returns the number of medications removed.
    pub fn delete_patient(&self, id: &RecordId) -> RecordResult<usize> {
        // Fail before touching medications if the patient does not exist.
        self.get_patient(id)?;

        let medications = self.medications_for_patient(id)?;
        for medication in &medications {
            self.delete_medication(&medication.id)?;
        }

        fs::remove_dir_all(id.sharded_dir(&self.cfg.patients_dir()))
            .map_err(RecordError::FileRemove)?;

        tracing::info!(
            patient = %id,
            medications = medications.len(),
            "deleted patient"
        );
        Ok(medications.len())
    }

    // ------------------------------------------------------------------
    // Medications
    // ------------------------------------------------------------------

    /// Adds a medication for an existing patient.
    ///
    /// # Errors
    ///
    /// - [`RecordError::NotFound`] if the patient does not exist
    /// - [`RecordError::InvalidInput`] if the dose is not a positive number or the dose
    ///   frequency is zero
    pub fn add_medication(
        &self,
        patient_id: &RecordId,
        new: NewMedication,
    ) -> RecordResult<Medication> {
        self.get_patient(patient_id)?;
        validate_dose(new.dose, new.dose_frequency)?;

        let medications_dir = self.cfg.medications_dir();
        fs::create_dir_all(&medications_dir).map_err(RecordError::StorageDirCreation)?;

        let (id, dir) = create_unique_sharded_dir(&medications_dir, RecordId::new)?;

        let medication = Medication {
            id,
            patient_id: patient_id.clone(),
            name: new.name,
            description: new.description,
            dose: new.dose,
            dose_frequency: new.dose_frequency,
            usage_times: new.usage_times,
            created_at: Utc::now(),
        };

        if let Err(e) = write_yaml(&dir.join(MEDICATION_FILENAME), &medication) {
            return Err(cleanup_after_failed_create(&dir, e));
        }

        tracing::info!(
            medication = %medication.id,
            patient = %patient_id,
            times = medication.usage_times.len(),
            "added medication"
        );
        Ok(medication)
    }

    pub fn get_medication(&self, id: &RecordId) -> RecordResult<Medication> {
        let path = self.medication_file(id);
        if !path.is_file() {
            return Err(RecordError::NotFound {
                kind: "medication",
                id: id.to_string(),
            });
        }
        read_yaml(&path)
    }

    /// Lists all readable medications in insertion order.
    pub fn list_medications(&self) -> RecordResult<Vec<Medication>> {
        let mut medications: Vec<Medication> =
            read_sharded_records(&self.cfg.medications_dir(), MEDICATION_FILENAME)?;
        medications.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(medications)
    }

    pub fn medications_for_patient(&self, patient_id: &RecordId) -> RecordResult<Vec<Medication>> {
        Ok(self
            .list_medications()?
            .into_iter()
            .filter(|m| &m.patient_id == patient_id)
            .collect())
    }

    /// Replaces the usage times of a medication.
    pub fn set_usage_times(
        &self,
        id: &RecordId,
        usage_times: BTreeSet<ScheduleTime>,
    ) -> RecordResult<Medication> {
        let mut medication = self.get_medication(id)?;
        medication.usage_times = usage_times;
        write_yaml(&self.medication_file(id), &medication)?;
        Ok(medication)
    }

    pub fn delete_medication(&self, id: &RecordId) -> RecordResult<()> {
        let dir = id.sharded_dir(&self.cfg.medications_dir());
        if !dir.is_dir() {
            return Err(RecordError::NotFound {
                kind: "medication",
                id: id.to_string(),
            });
        }
        fs::remove_dir_all(&dir).map_err(RecordError::FileRemove)
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Stores a PNG or JPEG profile image and makes it the patient's current image.
    pub fn attach_profile_image(
        &self,
        patient_id: &RecordId,
        original_filename: &str,
        bytes: &[u8],
    ) -> RecordResult<FileMetadata> {
        let mut patient = self.get_patient(patient_id)?;
        let meta = self.attachments(patient_id)?.add_bytes(
            AttachmentKind::ProfileImage,
            original_filename,
            bytes,
        )?;

        patient.profile_image = Some(meta.clone());
        write_yaml(&self.patient_file(patient_id), &patient)?;
        Ok(meta)
    }

    /// Stores a DICOM upload and appends it to the patient's imaging files.
    pub fn attach_imaging_file(
        &self,
        patient_id: &RecordId,
        original_filename: &str,
        bytes: &[u8],
    ) -> RecordResult<FileMetadata> {
        let mut patient = self.get_patient(patient_id)?;
        let meta =
            self.attachments(patient_id)?
                .add_bytes(AttachmentKind::Dicom, original_filename, bytes)?;

        patient.imaging_files.push(meta.clone());
        write_yaml(&self.patient_file(patient_id), &patient)?;
        Ok(meta)
    }

    pub fn read_attachment(&self, patient_id: &RecordId, hash: &Sha256Hash) -> RecordResult<Vec<u8>> {
        self.get_patient(patient_id)?;
        Ok(self.attachments(patient_id)?.read(hash)?)
    }

    fn attachments(&self, patient_id: &RecordId) -> RecordResult<AttachmentStore> {
        Ok(AttachmentStore::new(
            &self.cfg.patients_dir(),
            patient_id.clone(),
        )?)
    }

    fn patient_file(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.cfg.patients_dir())
            .join(PATIENT_FILENAME)
    }

    fn medication_file(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.cfg.medications_dir())
            .join(MEDICATION_FILENAME)
    }
}

impl MedicationSource for RecordStore {
    /// Joins every medication with its patient.
    ///
    /// A medication whose patient record is missing is returned with `patient: None`. A data
    /// directory that does not exist is reported as [`ReminderError::StoreUnavailable`] rather
    /// than as an empty store.
    fn medications_with_patients(&self) -> ReminderResult<Vec<MedicationWithPatient>> {
        let data_dir = self.cfg.data_dir();
        if !data_dir.is_dir() {
            return Err(ReminderError::StoreUnavailable(format!(
                "data directory {} does not exist",
                data_dir.display()
            )));
        }

        let patients: HashMap<RecordId, Patient> = self
            .list_patients()?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let joined = self
            .list_medications()?
            .into_iter()
            .map(|medication| {
                let patient = patients.get(&medication.patient_id).cloned();
                MedicationWithPatient {
                    medication,
                    patient,
                }
            })
            .collect();

        Ok(joined)
    }
}

fn validate_dose(dose: Option<f64>, dose_frequency: Option<u32>) -> RecordResult<()> {
    if let Some(dose) = dose {
        if !dose.is_finite() || dose <= 0.0 {
            return Err(RecordError::InvalidInput(format!(
                "dose must be a positive number, got {dose}"
            )));
        }
    }
    if dose_frequency == Some(0) {
        return Err(RecordError::InvalidInput(
            "dose frequency must be at least 1".into(),
        ));
    }
    Ok(())
}
