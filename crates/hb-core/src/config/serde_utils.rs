//! Serde helpers for the config file
//!
//! Durations are written as bare integers in one fixed unit per field, so a
//! hand-edited `config.toml` reads `open_timeout = 5` rather than a nested
//! table. Use them with `#[serde(with = "...")]`:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct BridgeTimings {
//!     #[serde(with = "hb_core::config::serde_utils::duration_secs")]
//!     open_timeout: Duration,
//!     #[serde(with = "hb_core::config::serde_utils::duration_millis")]
//!     tick_interval: Duration,
//! }
//! ```

macro_rules! duration_unit {
    ($(#[$doc:meta])* $name:ident, $from:path, $to:expr) => {
        $(#[$doc])*
        pub mod $name {
            use serde::{Deserialize, Deserializer, Serializer};
            use std::time::Duration;

            /// Serialize as a whole number of units, truncating the rest
            pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
                let units: u128 = $to(duration);
                let units = u64::try_from(units).map_err(|_| {
                    <S::Error as serde::ser::Error>::custom("duration does not fit in u64")
                })?;
                serializer.serialize_u64(units)
            }

            /// Deserialize from a whole number of units
            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
                u64::deserialize(deserializer).map($from)
            }
        }
    };
}

duration_unit!(
    /// Whole seconds; used for timeouts
    duration_secs,
    Duration::from_secs,
    |d: &Duration| u128::from(d.as_secs())
);

duration_unit!(
    /// Whole milliseconds; tick cadences sit well under a second
    duration_millis,
    Duration::from_millis,
    |d: &Duration| d.as_millis()
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timings {
        #[serde(with = "duration_secs")]
        open_timeout: Duration,
        #[serde(with = "duration_millis")]
        tick_interval: Duration,
    }

    #[test]
    fn test_units_in_toml() {
        let timings = Timings {
            open_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_millis(50),
        };
        let text = toml::to_string(&timings).unwrap();
        assert_eq!(text, "open_timeout = 5\ntick_interval = 50\n");
        assert_eq!(toml::from_str::<Timings>(&text).unwrap(), timings);
    }

    #[test]
    fn test_sub_unit_remainder_truncated() {
        let timings = Timings {
            open_timeout: Duration::from_millis(2500),
            tick_interval: Duration::from_micros(20_900),
        };
        let json = serde_json::to_string(&timings).unwrap();
        assert_eq!(json, r#"{"open_timeout":2,"tick_interval":20}"#);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(toml::from_str::<Timings>("open_timeout = -1\ntick_interval = 50\n").is_err());
    }
}
