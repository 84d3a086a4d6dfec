//! Severity levels carried by every entry.
//!
//! Levels follow the syslog ordering: lower values are more severe, so
//! [`FemtoLevel::Emergency`] is `0` and [`FemtoLevel::Debug`] is `7`. The
//! numeric value is what travels on the wire.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A level name that matches no severity.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown level: {0}")]
pub struct ParseLevelError(String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FemtoLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
}

impl FemtoLevel {
    /// All levels from most to least severe.
    pub const ALL: [FemtoLevel; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Info,
        Self::Debug,
    ];

    /// Wire value of the level.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a wire value back to a level; values above 7 have no level.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "EMERG",
            Self::Alert => "ALERT",
            Self::Critical => "CRIT",
            Self::Error => "ERR",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for FemtoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FemtoLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMERG" | "EMERGENCY" => Ok(Self::Emergency),
            "ALERT" => Ok(Self::Alert),
            "CRIT" | "CRITICAL" => Ok(Self::Critical),
            "ERR" | "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "NOTICE" => Ok(Self::Notice),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("emerg", FemtoLevel::Emergency, 0)]
    #[case("ALERT", FemtoLevel::Alert, 1)]
    #[case("critical", FemtoLevel::Critical, 2)]
    #[case("err", FemtoLevel::Error, 3)]
    #[case("Warn", FemtoLevel::Warning, 4)]
    #[case("notice", FemtoLevel::Notice, 5)]
    #[case("info", FemtoLevel::Info, 6)]
    #[case("DEBUG", FemtoLevel::Debug, 7)]
    fn parses_names_and_maps_to_wire_values(
        #[case] name: &str,
        #[case] level: FemtoLevel,
        #[case] wire: u8,
    ) {
        assert_eq!(name.parse::<FemtoLevel>(), Ok(level));
        assert_eq!(level.as_u8(), wire);
        assert_eq!(FemtoLevel::from_u8(wire), Some(level));
    }

    #[test]
    fn rejects_out_of_range_wire_value() {
        assert_eq!(FemtoLevel::from_u8(8), None);
    }

    #[test]
    fn unknown_name_reports_the_input() {
        let err = "verbose".parse::<FemtoLevel>().expect_err("unknown level");
        assert_eq!(err, ParseLevelError("verbose".into()));
        assert_eq!(err.to_string(), "unknown level: verbose");
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(FemtoLevel::default(), FemtoLevel::Info);
    }

    #[test]
    fn lower_values_are_more_severe() {
        assert!(FemtoLevel::Emergency < FemtoLevel::Debug);
    }
}
