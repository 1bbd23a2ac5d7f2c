//! `#[serde(with = "crate::duration")]` for humantime strings such as `"30s"`
//! or `"2s 200ms"`.

use std::fmt;
use std::time::Duration;

use serde::{Deserializer, Serializer, de};

/// # Errors
/// Returns the serializer's error.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*value))
}

/// # Errors
/// Fails on anything that is not a humantime duration string.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    struct Visitor;

    impl de::Visitor<'_> for Visitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration such as \"30s\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            humantime::parse_duration(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_str(Visitor)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timers {
        #[serde(with = "crate::duration")]
        every: Duration,
    }

    #[test]
    fn parses_humantime() {
        let t: Timers = serde_json::from_str(r#"{"every":"2s 200ms"}"#).unwrap();
        assert_eq!(t.every, Duration::from_millis(2200));
    }

    #[test]
    fn formats_humantime() {
        let json = serde_json::to_string(&Timers {
            every: Duration::from_secs(30),
        })
        .unwrap();
        assert_eq!(json, r#"{"every":"30s"}"#);
    }

    #[test]
    fn rejects_numbers_and_garbage() {
        assert!(serde_json::from_str::<Timers>(r#"{"every":30}"#).is_err());
        assert!(serde_json::from_str::<Timers>(r#"{"every":"soon"}"#).is_err());
    }
}
