//! The reminder pass.
//!
//! One pass reads every medication with its patient, finds the usage times that fall inside the
//! tolerance window around `now`, and sends one message per due (medication, time) pair.
//!
//! The evaluator keeps no memory between passes. Calling [`ReminderEvaluator::evaluate_due`]
//! twice with the same `now` sends the same reminders twice; suppressing a repeated minute is
//! the caller's job.

use crate::config::ReminderConfig;
use crate::reminders::dispatch::NotificationDispatcher;
use crate::reminders::matcher::TimeWindow;
use crate::reminders::message::{recipient_address, render_message};
use crate::reminders::source::{MedicationSource, MedicationWithPatient};
use crate::{ReminderError, ReminderResult};
use chrono::NaiveTime;
use homecare_types::{NonEmptyText, ScheduleTime};
use homecare_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;

/// Address and rendered text for one reminder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub to: String,
    pub body: String,
}

/// A (medication, scheduled time) pair that is due, before anything has been sent.
///
/// `delivery` is an error when the medication's patient cannot be resolved.
#[derive(Clone, Debug)]
pub struct DueReminder {
    pub medication_id: RecordId,
    pub medication_name: NonEmptyText,
    pub patient_id: RecordId,
    pub scheduled: ScheduleTime,
    pub delivery: Result<Delivery, ReminderError>,
}

/// What happened to one due pair during a pass.
#[derive(Clone, Debug)]
pub struct DispatchResult {
    pub medication_id: RecordId,
    pub patient_id: RecordId,
    pub scheduled: ScheduleTime,
    pub recipient: Option<String>,
    pub outcome: Result<(), ReminderError>,
}

impl DispatchResult {
    pub fn is_sent(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Counts for one pass, for logging and the ops endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PassSummary {
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let mut summary = PassSummary {
            due: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                Ok(()) => summary.sent += 1,
                Err(ReminderError::DispatchFailed { .. }) => summary.failed += 1,
                Err(_) => summary.skipped += 1,
            }
        }
        summary
    }
}

pub struct ReminderEvaluator {
    source: Arc<dyn MedicationSource>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: ReminderConfig,
    window: TimeWindow,
}

impl ReminderEvaluator {
    pub fn new(
        source: Arc<dyn MedicationSource>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: ReminderConfig,
    ) -> Self {
        let window = TimeWindow::new(config.tolerance(), config.midnight_policy());
        Self {
            source,
            dispatcher,
            config,
            window,
        }
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Lists what a pass at `now` would send, without sending anything.
    ///
    /// Pairs come out in store order, and within a medication in ascending time order.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::StoreUnavailable`] if the medication source cannot be read.
    pub fn due_at(&self, now: NaiveTime) -> ReminderResult<Vec<DueReminder>> {
        let entries = self.source.medications_with_patients()?;
        Ok(self.select_due(entries, now))
    }

    fn select_due(&self, entries: Vec<MedicationWithPatient>, now: NaiveTime) -> Vec<DueReminder> {
        let mut due = Vec::new();
        for entry in entries {
            let medication = &entry.medication;
            for scheduled in &medication.usage_times {
                if !self.window.is_due(scheduled.time(), now) {
                    continue;
                }

                let delivery = match &entry.patient {
                    Some(patient) if patient.id == medication.patient_id => Ok(Delivery {
                        to: recipient_address(&patient.phone, self.config.country_code_prefix()),
                        body: render_message(
                            self.config.message_template(),
                            patient,
                            medication,
                            *scheduled,
                        ),
                    }),
                    _ => Err(ReminderError::DataIntegrityFault {
                        medication_id: medication.id.clone(),
                        patient_id: medication.patient_id.clone(),
                    }),
                };

                due.push(DueReminder {
                    medication_id: medication.id.clone(),
                    medication_name: medication.name.clone(),
                    patient_id: medication.patient_id.clone(),
                    scheduled: *scheduled,
                    delivery,
                });
            }
        }

        due
    }

    /// Runs one reminder pass at `now`.
    ///
    /// Every due pair gets exactly one dispatch attempt. A failed dispatch or an unresolvable
    /// patient is recorded in that pair's [`DispatchResult`] and the pass carries on with the
    /// next pair.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::StoreUnavailable`] if the medication source cannot be read. No
    /// messages are sent in that case.
    pub async fn evaluate_due(&self, now: NaiveTime) -> ReminderResult<Vec<DispatchResult>> {
        // The source reads the store with blocking file I/O.
        let source = Arc::clone(&self.source);
        let entries = tokio::task::spawn_blocking(move || source.medications_with_patients())
            .await
            .map_err(|e| ReminderError::StoreUnavailable(format!("store read task failed: {e}")))??;
        let due = self.select_due(entries, now);

        let mut results = Vec::with_capacity(due.len());
        for reminder in due {
            let (recipient, outcome) = match reminder.delivery {
                Ok(delivery) => {
                    let outcome = self
                        .dispatcher
                        .send(&delivery.to, &delivery.body)
                        .await
                        .map_err(|source| ReminderError::DispatchFailed {
                            medication_id: reminder.medication_id.clone(),
                            source,
                        });
                    (Some(delivery.to), outcome)
                }
                Err(fault) => (None, Err(fault)),
            };

            match &outcome {
                Ok(()) => tracing::info!(
                    medication = %reminder.medication_id,
                    patient = %reminder.patient_id,
                    scheduled = %reminder.scheduled,
                    "sent reminder for {}",
                    reminder.medication_name
                ),
                Err(e @ ReminderError::DispatchFailed { .. }) => tracing::error!(
                    medication = %reminder.medication_id,
                    patient = %reminder.patient_id,
                    scheduled = %reminder.scheduled,
                    "reminder not sent: {}",
                    e
                ),
                Err(e) => tracing::warn!(
                    medication = %reminder.medication_id,
                    patient = %reminder.patient_id,
                    scheduled = %reminder.scheduled,
                    "reminder skipped: {}",
                    e
                ),
            }

            results.push(DispatchResult {
                medication_id: reminder.medication_id,
                patient_id: reminder.patient_id,
                scheduled: reminder.scheduled,
                recipient,
                outcome,
            });
        }

        Ok(results)
    }
}
