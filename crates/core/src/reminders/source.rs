//! Where the evaluator reads medications from.

use crate::records::{Medication, Patient};
use crate::ReminderResult;

/// A medication together with the patient it belongs to.
///
/// `patient` is `None` when the medication references a patient that no longer resolves.
#[derive(Clone, Debug, PartialEq)]
pub struct MedicationWithPatient {
    pub medication: Medication,
    pub patient: Option<Patient>,
}

/// Read access to every medication joined with its patient.
///
/// Implementations report an unreachable store as
/// [`ReminderError::StoreUnavailable`](crate::ReminderError::StoreUnavailable).
pub trait MedicationSource: Send + Sync {
    fn medications_with_patients(&self) -> ReminderResult<Vec<MedicationWithPatient>>;
}

/// Fixed in-memory source, used for previews over hand-built data and in tests.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    records: Vec<MedicationWithPatient>,
}

impl InMemorySource {
    pub fn new(records: Vec<MedicationWithPatient>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, medication: Medication, patient: Option<Patient>) {
        self.records.push(MedicationWithPatient {
            medication,
            patient,
        });
    }
}

impl MedicationSource for InMemorySource {
    fn medications_with_patients(&self) -> ReminderResult<Vec<MedicationWithPatient>> {
        Ok(self.records.clone())
    }
}
