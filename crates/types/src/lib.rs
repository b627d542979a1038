//! Validated primitives shared across the homecare crates.
//!
//! Each type here can only be constructed through a checking constructor, so code that
//! receives one can rely on its invariant without re-validating.

use chrono::{NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input is not a usable phone number
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// The input is not a time of day in `HH:MM` or `HH:MM:SS` form
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A patient phone number.
///
/// Formatting characters (spaces, `-`, `.`, parentheses) are stripped on construction, so the
/// stored value is an optional leading `+` followed by digits only. Country-code handling is
/// left to the caller: a number without `+` is stored as entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 3;
    const MAX_DIGITS: usize = 15;

    /// Parses and normalises a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidPhone`] if the input contains letters or other
    /// unexpected characters, has a `+` anywhere but the start, or has fewer than 3 or more
    /// than 15 digits (the E.164 ceiling).
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let raw = input.as_ref().trim();
        let (plus, rest) = match raw.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(TextError::InvalidPhone(raw.to_owned())),
            }
        }

        if digits.len() < Self::MIN_DIGITS || digits.len() > Self::MAX_DIGITS {
            return Err(TextError::InvalidPhone(raw.to_owned()));
        }

        if plus {
            digits.insert(0, '+');
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the number already carries an international `+` prefix.
    pub fn is_international(&self) -> bool {
        self.0.starts_with('+')
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhoneNumber::new(s)
    }
}

impl serde::Serialize for PhoneNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PhoneNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PhoneNumber::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A time of day with no date or timezone attached, as stored in a medication schedule.
///
/// Schedules have minute precision and are written as `HH:MM`. Seconds and anything finer are
/// dropped on construction from a [`NaiveTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    /// Builds a schedule time from hour and minute, or `None` if out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parses `HH:MM`. `HH:MM:00` is also accepted; a non-zero seconds field is rejected.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let time = parse_time_of_day(input)?;
        if time.second() != 0 {
            return Err(TextError::InvalidTime(input.trim().to_owned()));
        }
        Ok(Self::from(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

/// Parses a wall-clock instant as `HH:MM` or `HH:MM:SS`.
///
/// Used for evaluation times, which unlike [`ScheduleTime`] may carry seconds.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, TextError> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .map_err(|_| TextError::InvalidTime(input.to_owned()))
}

impl From<NaiveTime> for ScheduleTime {
    fn from(time: NaiveTime) -> Self {
        Self(
            time.with_nanosecond(0)
                .and_then(|t| t.with_second(0))
                .unwrap_or(time),
        )
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ScheduleTime {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduleTime::parse(s)
    }
}

impl serde::Serialize for ScheduleTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ScheduleTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ScheduleTime::parse(&s).map_err(serde::de::Error::custom)
    }
}
