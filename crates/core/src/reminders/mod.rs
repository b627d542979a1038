//! Medication reminders: matching, message rendering, and the per-minute pass.

mod dispatch;
mod evaluator;
mod matcher;
mod message;
mod source;

pub use dispatch::{DispatchError, NotificationDispatcher};
pub use evaluator::{Delivery, DispatchResult, DueReminder, PassSummary, ReminderEvaluator};
pub use matcher::TimeWindow;
pub use message::{format_dose, recipient_address, render_message};
pub use source::{InMemorySource, MedicationSource, MedicationWithPatient};
