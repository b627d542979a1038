//! Reminder text and recipient formatting.

use crate::constants::UNSPECIFIED_DOSE_TEXT;
use crate::records::{Medication, Patient};
use homecare_types::{PhoneNumber, ScheduleTime};

/// Renders a reminder message from `template`.
///
/// Recognised placeholders are `{patient}`, `{medication}`, `{dose}` and `{time}`. Anything
/// else in the template is copied through unchanged.
pub fn render_message(
    template: &str,
    patient: &Patient,
    medication: &Medication,
    scheduled: ScheduleTime,
) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    // Substituted values are appended to `out` and never scanned again, so a name that itself
    // contains `{dose}` is sent as written.
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            rest = tail;
            break;
        };
        let value = match &tail[1..close] {
            "patient" => Some(patient.name.as_str().to_string()),
            "medication" => Some(medication.name.as_str().to_string()),
            "dose" => Some(format_dose(medication.dose)),
            "time" => Some(scheduled.to_string()),
            _ => None,
        };
        match value {
            Some(value) => {
                out.push_str(&value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `100.0` renders as `100`, `2.5` as `2.5`, and a missing dose as "as prescribed".
pub fn format_dose(dose: Option<f64>) -> String {
    match dose {
        Some(amount) => amount.to_string(),
        None => UNSPECIFIED_DOSE_TEXT.to_string(),
    }
}

/// Builds the address handed to the dispatcher.
///
/// A number already in international form is used as is. Otherwise, when a country code is
/// configured, it is prefixed as `+<code><digits>`. Without a country code the stored number is
/// passed through unchanged.
pub fn recipient_address(phone: &PhoneNumber, country_code_prefix: Option<&str>) -> String {
    match country_code_prefix {
        Some(code) if !phone.is_international() => format!("+{code}{}", phone.as_str()),
        _ => phone.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MESSAGE_TEMPLATE;
    use chrono::Utc;
    use homecare_types::NonEmptyText;
    use homecare_uuid::RecordId;

    fn patient() -> Patient {
        Patient {
            id: RecordId::new(),
            name: NonEmptyText::new("Jane Doe").unwrap(),
            phone: PhoneNumber::new("5551234").unwrap(),
            gender: None,
            address: None,
            city: None,
            created_at: Utc::now(),
            profile_image: None,
            imaging_files: Vec::new(),
        }
    }

    fn medication(dose: Option<f64>) -> Medication {
        Medication {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            name: NonEmptyText::new("Aspirin").unwrap(),
            description: None,
            dose,
            dose_frequency: None,
            usage_times: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn default_template_names_patient_medication_and_dose() {
        let text = render_message(
            DEFAULT_MESSAGE_TEMPLATE,
            &patient(),
            &medication(Some(100.0)),
            ScheduleTime::from_hm(9, 0).unwrap(),
        );
        assert_eq!(
            text,
            "Hello Jane Doe! Don't forget to take Aspirin now with dose 100"
        );
    }

    #[test]
    fn missing_dose_renders_placeholder_text() {
        let text = render_message(
            "{medication}: {dose}",
            &patient(),
            &medication(None),
            ScheduleTime::from_hm(9, 0).unwrap(),
        );
        assert_eq!(text, "Aspirin: as prescribed");
    }

    #[test]
    fn custom_template_with_time() {
        let text = render_message(
            "{patient}, {medication} {dose}mg at {time} ({unknown})",
            &patient(),
            &medication(Some(2.5)),
            ScheduleTime::from_hm(21, 30).unwrap(),
        );
        assert_eq!(text, "Jane Doe, Aspirin 2.5mg at 21:30 ({unknown})");
    }

    #[test]
    fn placeholders_inside_names_are_not_expanded() {
        let mut jane = patient();
        jane.name = NonEmptyText::new("Jane {medication}").unwrap();
        let mut vitamin = medication(Some(100.0));
        vitamin.name = NonEmptyText::new("Vitamin {dose}").unwrap();

        let text = render_message(
            DEFAULT_MESSAGE_TEMPLATE,
            &jane,
            &vitamin,
            ScheduleTime::from_hm(9, 0).unwrap(),
        );
        assert_eq!(
            text,
            "Hello Jane {medication}! Don't forget to take Vitamin {dose} now with dose 100"
        );
    }

    #[test]
    fn stray_braces_are_copied_through() {
        let text = render_message(
            "{{medication}} {dose",
            &patient(),
            &medication(Some(5.0)),
            ScheduleTime::from_hm(9, 0).unwrap(),
        );
        assert_eq!(text, "{Aspirin} {dose");
    }

    #[test]
    fn recipient_gets_country_code_when_local() {
        let local = PhoneNumber::new("5551234").unwrap();
        assert_eq!(recipient_address(&local, Some("2")), "+25551234");
        assert_eq!(recipient_address(&local, None), "5551234");

        let international = PhoneNumber::new("+201001234567").unwrap();
        assert_eq!(recipient_address(&international, Some("2")), "+201001234567");
    }
}
