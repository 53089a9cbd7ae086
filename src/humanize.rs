//! Human-readable duration parsing for TOML settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

/// Duration wrapper with human-readable parsing ("500ms", "10s", "5m", "1h")
///
/// A bare integer is interpreted as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_human_readable(&self) -> String {
        let millis = self.0.as_millis() as u64;

        if millis == 0 {
            return "0s".to_string();
        }
        if millis % 3_600_000 == 0 {
            return format!("{}h", millis / 3_600_000);
        }
        if millis % 60_000 == 0 {
            return format!("{}m", millis / 60_000);
        }
        if millis % 1_000 == 0 {
            return format!("{}s", millis / 1_000);
        }
        format!("{}ms", millis)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> serde::de::Visitor<'de> for DurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter
                    .write_str("a duration as string (e.g., \"10s\", \"5m\") or integer seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v < 0 {
                    return Err(serde::de::Error::custom("duration must be non-negative"));
                }
                Ok(HumanDuration(Duration::from_secs(v as u64)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        // Plain number means seconds
        if let Ok(num) = s.parse::<u64>() {
            return Ok(HumanDuration(Duration::from_secs(num)));
        }

        let (num_str, unit) = if let Some(pos) = s.find(|c: char| !c.is_ascii_digit()) {
            (&s[..pos], &s[pos..])
        } else {
            return Err(ParseError::InvalidFormat(s.to_string()));
        };

        let num: u64 = num_str.parse()?;

        let duration = match unit.trim() {
            "ms" => Duration::from_millis(num),
            "s" | "sec" | "secs" => Duration::from_secs(num),
            "m" | "min" | "mins" => Duration::from_secs(num * 60),
            "h" | "hr" | "hrs" => Duration::from_secs(num * 3600),
            "d" => Duration::from_secs(num * 86400),
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        Ok(HumanDuration(duration))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!("10".parse::<HumanDuration>().unwrap().as_secs(), 10);
        assert_eq!("10s".parse::<HumanDuration>().unwrap().as_secs(), 10);
        assert_eq!("10sec".parse::<HumanDuration>().unwrap().as_secs(), 10);
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(
            "500ms".parse::<HumanDuration>().unwrap().as_duration(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_parse_minutes_hours() {
        assert_eq!("5m".parse::<HumanDuration>().unwrap().as_secs(), 300);
        assert_eq!("2h".parse::<HumanDuration>().unwrap().as_secs(), 7200);
        assert_eq!("1d".parse::<HumanDuration>().unwrap().as_secs(), 86400);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("abc".parse::<HumanDuration>().is_err());
        assert!("5parsecs".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(HumanDuration(Duration::from_secs(300)).to_string(), "5m");
        assert_eq!(HumanDuration(Duration::from_secs(7200)).to_string(), "2h");
        assert_eq!(
            HumanDuration(Duration::from_millis(250)).to_string(),
            "250ms"
        );
    }

    #[test]
    fn test_deserialize_string() {
        #[derive(Deserialize)]
        struct TestStruct {
            ttl: HumanDuration,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"ttl": "5m"}"#).unwrap();
        assert_eq!(parsed.ttl.as_secs(), 300);
    }

    #[test]
    fn test_deserialize_number() {
        #[derive(Deserialize)]
        struct TestStruct {
            ttl: HumanDuration,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"ttl": 60}"#).unwrap();
        assert_eq!(parsed.ttl.as_secs(), 60);
    }
}
