//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Nothing in this crate reads process-wide environment variables while handling a request or
//! a reminder pass. The `*_from_env_value` helpers take the raw optional string so the binaries
//! decide where values come from.

use crate::constants::{
    DEFAULT_MESSAGE_TEMPLATE, DEFAULT_TOLERANCE_MINUTES, MEDICATIONS_DIR_NAME, PATIENTS_DIR_NAME,
};
use crate::{RecordError, RecordResult};
use chrono::TimeDelta;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    pub fn new(data_dir: PathBuf) -> RecordResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(RecordError::InvalidInput("data_dir cannot be empty".into()));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn medications_dir(&self) -> PathBuf {
        self.data_dir.join(MEDICATIONS_DIR_NAME)
    }
}

/// How the reminder window treats scheduled times close to midnight.
///
/// With `SameDay`, 23:59 and 00:00 are 1439 minutes apart. With `Wraparound`, distances are
/// measured around the 24-hour clock, so the same pair is one minute apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MidnightPolicy {
    #[default]
    SameDay,
    Wraparound,
}

impl fmt::Display for MidnightPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidnightPolicy::SameDay => f.write_str("same-day"),
            MidnightPolicy::Wraparound => f.write_str("wraparound"),
        }
    }
}

impl FromStr for MidnightPolicy {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same-day" | "same_day" | "sameday" => Ok(MidnightPolicy::SameDay),
            "wraparound" | "wrap" => Ok(MidnightPolicy::Wraparound),
            other => Err(RecordError::InvalidInput(format!(
                "unknown midnight policy '{other}' (expected same-day or wraparound)"
            ))),
        }
    }
}

/// Settings for the reminder evaluator.
#[derive(Clone, Debug)]
pub struct ReminderConfig {
    tolerance: TimeDelta,
    message_template: String,
    country_code_prefix: Option<String>,
    midnight_policy: MidnightPolicy,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            tolerance: TimeDelta::minutes(DEFAULT_TOLERANCE_MINUTES),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            country_code_prefix: None,
            midnight_policy: MidnightPolicy::SameDay,
        }
    }
}

impl ReminderConfig {
    /// Create a validated `ReminderConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidInput`] if the tolerance is not positive or reaches twelve
    /// hours, if the template is blank, or if the country code is not 1 to 3 digits.
    pub fn new(
        tolerance: TimeDelta,
        message_template: impl Into<String>,
        country_code_prefix: Option<String>,
        midnight_policy: MidnightPolicy,
    ) -> RecordResult<Self> {
        if tolerance <= TimeDelta::zero() {
            return Err(RecordError::InvalidInput(
                "reminder tolerance must be positive".into(),
            ));
        }
        if tolerance >= TimeDelta::hours(12) {
            return Err(RecordError::InvalidInput(
                "reminder tolerance must be shorter than 12 hours".into(),
            ));
        }

        let message_template = message_template.into();
        if message_template.trim().is_empty() {
            return Err(RecordError::InvalidInput(
                "reminder message template cannot be empty".into(),
            ));
        }

        let country_code_prefix = country_code_prefix
            .map(|code| normalise_country_code(&code))
            .transpose()?;

        Ok(Self {
            tolerance,
            message_template,
            country_code_prefix,
            midnight_policy,
        })
    }

    /// Build a config from raw environment values. `None` or blank values fall back to the
    /// defaults.
    pub fn from_env_values(
        tolerance_minutes: Option<String>,
        message_template: Option<String>,
        country_code_prefix: Option<String>,
        midnight_policy: Option<String>,
    ) -> RecordResult<Self> {
        let defaults = Self::default();
        let tolerance = tolerance_from_env_value(tolerance_minutes)?;
        let message_template = non_blank(message_template).unwrap_or(defaults.message_template);
        let midnight_policy = midnight_policy_from_env_value(midnight_policy)?;

        Self::new(
            tolerance,
            message_template,
            non_blank(country_code_prefix),
            midnight_policy,
        )
    }

    pub fn tolerance(&self) -> TimeDelta {
        self.tolerance
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Digits only, without a leading `+`.
    pub fn country_code_prefix(&self) -> Option<&str> {
        self.country_code_prefix.as_deref()
    }

    pub fn midnight_policy(&self) -> MidnightPolicy {
        self.midnight_policy
    }
}

/// Parse the reminder tolerance, given in (possibly fractional) minutes.
///
/// If `value` is `None` or empty/whitespace, returns the default of one minute.
pub fn tolerance_from_env_value(value: Option<String>) -> RecordResult<TimeDelta> {
    let Some(value) = non_blank(value) else {
        return Ok(TimeDelta::minutes(DEFAULT_TOLERANCE_MINUTES));
    };

    let minutes: f64 = value.parse().map_err(|_| {
        RecordError::InvalidInput(format!("reminder tolerance '{value}' is not a number"))
    })?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(RecordError::InvalidInput(format!(
            "reminder tolerance must be a positive number of minutes, got '{value}'"
        )));
    }

    let millis = (minutes * 60_000.0).round() as i64;
    TimeDelta::try_milliseconds(millis).ok_or_else(|| {
        RecordError::InvalidInput(format!("reminder tolerance '{value}' is out of range"))
    })
}

/// Parse the midnight policy. `None` or empty/whitespace selects [`MidnightPolicy::SameDay`].
pub fn midnight_policy_from_env_value(value: Option<String>) -> RecordResult<MidnightPolicy> {
    non_blank(value)
        .map(|v| v.parse::<MidnightPolicy>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse a boolean flag such as `REMINDER_DRY_RUN`. Unset means `false`.
pub fn flag_from_env_value(value: Option<String>) -> RecordResult<bool> {
    let Some(value) = non_blank(value) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RecordError::InvalidInput(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

fn normalise_country_code(code: &str) -> RecordResult<String> {
    let digits = code.trim().trim_start_matches('+');
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecordError::InvalidInput(format!(
            "country code prefix must be 1 to 3 digits, got '{code}'"
        )));
    }
    Ok(digits.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_config_derives_record_dirs() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/homecare")).unwrap();
        assert_eq!(cfg.patients_dir(), PathBuf::from("/srv/homecare/patients"));
        assert_eq!(
            cfg.medications_dir(),
            PathBuf::from("/srv/homecare/medications")
        );
    }

    #[test]
    fn core_config_rejects_empty_dir() {
        assert!(CoreConfig::new(PathBuf::new()).is_err());
    }

    #[test]
    fn default_reminder_config() {
        let cfg = ReminderConfig::default();
        assert_eq!(cfg.tolerance(), TimeDelta::minutes(1));
        assert_eq!(cfg.midnight_policy(), MidnightPolicy::SameDay);
        assert_eq!(cfg.country_code_prefix(), None);
        assert_eq!(cfg.message_template(), DEFAULT_MESSAGE_TEMPLATE);
    }

    #[test]
    fn tolerance_accepts_fractional_minutes() {
        assert_eq!(
            tolerance_from_env_value(Some("0.5".into())).unwrap(),
            TimeDelta::seconds(30)
        );
        assert_eq!(
            tolerance_from_env_value(Some("  ".into())).unwrap(),
            TimeDelta::minutes(1)
        );
        assert_eq!(tolerance_from_env_value(None).unwrap(), TimeDelta::minutes(1));
    }

    #[test]
    fn tolerance_rejects_non_positive_and_garbage() {
        for bad in ["0", "-1", "abc", "NaN", "inf"] {
            assert!(
                tolerance_from_env_value(Some(bad.into())).is_err(),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn tolerance_of_twelve_hours_is_rejected() {
        let err = ReminderConfig::new(
            TimeDelta::hours(12),
            DEFAULT_MESSAGE_TEMPLATE,
            None,
            MidnightPolicy::Wraparound,
        );
        assert!(err.is_err());
    }

    #[test]
    fn midnight_policy_parsing() {
        assert_eq!(
            midnight_policy_from_env_value(None).unwrap(),
            MidnightPolicy::SameDay
        );
        assert_eq!(
            midnight_policy_from_env_value(Some("Wraparound".into())).unwrap(),
            MidnightPolicy::Wraparound
        );
        assert_eq!(
            midnight_policy_from_env_value(Some("same_day".into())).unwrap(),
            MidnightPolicy::SameDay
        );
        assert!(midnight_policy_from_env_value(Some("tomorrow".into())).is_err());
    }

    #[test]
    fn country_code_is_normalised() {
        let cfg = ReminderConfig::from_env_values(None, None, Some("+20".into()), None).unwrap();
        assert_eq!(cfg.country_code_prefix(), Some("20"));

        assert!(ReminderConfig::from_env_values(None, None, Some("2a".into()), None).is_err());
        assert!(ReminderConfig::from_env_values(None, None, Some("1234".into()), None).is_err());
    }

    #[test]
    fn blank_template_falls_back_to_default() {
        let cfg = ReminderConfig::from_env_values(None, Some("   ".into()), None, None).unwrap();
        assert_eq!(cfg.message_template(), DEFAULT_MESSAGE_TEMPLATE);
    }

    #[test]
    fn flag_parsing() {
        assert!(!flag_from_env_value(None).unwrap());
        assert!(flag_from_env_value(Some("true".into())).unwrap());
        assert!(flag_from_env_value(Some("1".into())).unwrap());
        assert!(!flag_from_env_value(Some("off".into())).unwrap());
        assert!(flag_from_env_value(Some("maybe".into())).is_err());
    }
}
