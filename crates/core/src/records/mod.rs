//! Patient and medication records.

mod helpers;
mod model;
mod store;

pub use model::{Medication, NewMedication, NewPatient, Patient};
pub use store::RecordStore;
