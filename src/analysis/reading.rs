//! Panel readings
//!
//! The typed result of one frame, and the per-field parsing that fills it.
//! Every field is parsed on its own: a bad value is logged and leaves that
//! field at its default without touching the others.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::vision::layout::MODE_PREFIX;

/// Time display content meaning "no time running"
const BLANK_TIME: &str = "----";

/// Characters accepted between minutes and seconds
const TIME_SEPARATORS: [char; 2] = [':', '.'];

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("not an integer: {0:?}")]
    InvalidNumber(String),

    #[error("invalid time {0:?}")]
    InvalidTime(String),

    #[error("invalid minutes {0}")]
    InvalidMinutes(u32),

    #[error("invalid seconds {0}")]
    InvalidSeconds(u32),
}

/// Values read from one panel frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Frame name
    pub name: String,
    pub temperature: i32,
    pub profile: String,
    pub power: i32,
    pub fan: i32,
    /// Elapsed time in seconds
    pub time: u32,
    pub mode: String,
    /// Raw text per display, kept for diagnostics
    pub raw: BTreeMap<String, String>,
}

impl Reading {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Record the raw text of a display and parse it into its field
    ///
    /// Returns the validation error, if any; the field keeps its previous
    /// value in that case.
    pub fn apply(&mut self, section: &str, value: &str) -> Result<(), FieldError> {
        self.raw.insert(section.to_string(), value.to_string());

        let outcome = match section {
            "TEMPERATURE" => parse_int(value).map(|v| self.temperature = v),
            "POWER" => parse_int(value).map(|v| self.power = v),
            "FAN" => parse_int(value).map(|v| self.fan = v),
            "TIME" => parse_time(value).map(|v| self.time = v),
            "PROFILE" => {
                self.profile = value.to_string();
                Ok(())
            }
            name if name.starts_with(MODE_PREFIX) => {
                self.mode = value.to_string();
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = &outcome {
            warn!("{} - {} failed to convert result ({:?}): {}", self.name, section, value, e);
        }

        outcome
    }
}

fn parse_int(value: &str) -> Result<i32, FieldError> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(value.to_string()))
}

/// Parse a `MM:SS` / `MMSS` time display into seconds
///
/// `----` means zero. A five character value must carry a `:` or `.`
/// separator at index 2, which is removed; what remains must be four digits
/// with minutes and seconds below 60.
pub fn parse_time(value: &str) -> Result<u32, FieldError> {
    if value == BLANK_TIME {
        return Ok(0);
    }

    let chars: Vec<char> = value.chars().collect();
    let digits: String = if chars.len() == 5 {
        if !TIME_SEPARATORS.contains(&chars[2]) {
            return Err(FieldError::InvalidTime(value.to_string()));
        }
        chars
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, c)| *c)
            .collect()
    } else {
        value.to_string()
    };

    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::InvalidTime(value.to_string()));
    }

    let minutes: u32 = digits[..2]
        .parse()
        .map_err(|_| FieldError::InvalidTime(value.to_string()))?;
    let seconds: u32 = digits[2..]
        .parse()
        .map_err(|_| FieldError::InvalidTime(value.to_string()))?;

    if minutes >= 60 {
        return Err(FieldError::InvalidMinutes(minutes));
    }
    if seconds >= 60 {
        return Err(FieldError::InvalidSeconds(seconds));
    }

    Ok(minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_grammar() {
        assert_eq!(parse_time("----"), Ok(0));
        assert_eq!(parse_time("12:34"), Ok(754));
        assert_eq!(parse_time("1234"), Ok(754));
        assert_eq!(parse_time("00:00"), Ok(0));
        assert_eq!(parse_time("59:59"), Ok(3599));
    }

    #[test]
    fn test_time_separator_stripped() {
        assert_eq!(parse_time("12.34"), Ok(754));
    }

    #[test]
    fn test_time_requires_separator_at_index_two() {
        assert!(matches!(parse_time("12345"), Err(FieldError::InvalidTime(_))));
        assert!(matches!(parse_time("12a34"), Err(FieldError::InvalidTime(_))));
        assert!(matches!(parse_time("123:4"), Err(FieldError::InvalidTime(_))));
    }

    #[test]
    fn test_time_rejected() {
        assert_eq!(parse_time("99:99"), Err(FieldError::InvalidMinutes(99)));
        assert_eq!(parse_time("12:99"), Err(FieldError::InvalidSeconds(99)));
        assert!(matches!(parse_time("12"), Err(FieldError::InvalidTime(_))));
        assert!(matches!(parse_time("12a4"), Err(FieldError::InvalidTime(_))));
        assert!(matches!(parse_time("1:234"), Err(FieldError::InvalidTime(_))));
        assert!(matches!(parse_time(""), Err(FieldError::InvalidTime(_))));
    }

    #[test]
    fn test_bad_time_keeps_previous_value() {
        let mut reading = Reading::new("f");
        reading.apply("TIME", "02:00").unwrap();
        assert!(reading.apply("TIME", "99:99").is_err());
        assert_eq!(reading.time, 120);
        assert_eq!(reading.raw["TIME"], "99:99");
    }

    #[test]
    fn test_field_isolation() {
        let mut reading = Reading::new("f");
        assert!(reading.apply("TEMPERATURE", "2I5").is_err());
        reading.apply("POWER", "7").unwrap();
        reading.apply("FAN", " 3 ").unwrap();

        assert_eq!(reading.temperature, 0);
        assert_eq!(reading.power, 7);
        assert_eq!(reading.fan, 3);
        assert_eq!(reading.raw.len(), 3);
    }

    #[test]
    fn test_literal_fields() {
        let mut reading = Reading::new("f");
        reading.apply("PROFILE", "P3").unwrap();
        reading.apply("MODE_ROAST", "ROAST").unwrap();
        reading.apply("UNKNOWN", "x").unwrap();

        assert_eq!(reading.profile, "P3");
        assert_eq!(reading.mode, "ROAST");
    }

    #[test]
    fn test_reading_serializes_to_json() {
        let mut reading = Reading::new("roast_1");
        reading.apply("POWER", "9").unwrap();
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["name"], "roast_1");
        assert_eq!(json["power"], 9);
        assert_eq!(json["raw"]["POWER"], "9");
    }
}
