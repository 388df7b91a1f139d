//! Helpers for parsing volumes and sample positions in mix documents.

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Convert a dB value to linear gain.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Deserialize a linear volume that may be expressed in dB (`"-6db"`).
///
/// Plain numbers keep their sign, so `-1.0` still inverts a channel.
pub fn deserialize_volume<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct VolumeVisitor;

    impl<'de> Visitor<'de> for VolumeVisitor {
        type Value = f32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a string like \"-6db\"")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            parse_volume_str(value)
                .ok_or_else(|| DeError::custom(format!("invalid volume \"{}\"", value)))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            self.visit_str(&value)
        }
    }

    deserializer.deserialize_any(VolumeVisitor)
}

/// Deserialize a fade boundary where `null`, a missing field, or any
/// negative number means "open" (start or end of the stream).
pub fn deserialize_open_bound<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let bound = Option::<i64>::deserialize(deserializer)?;
    Ok(bound.filter(|value| *value >= 0))
}

fn parse_volume_str(value: &str) -> Option<f32> {
    if let Some(db) = parse_db_suffix(value) {
        return Some(db_to_linear(db));
    }
    parse_number(value)
}

fn parse_db_suffix(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let db_part = lower.strip_suffix("db")?;
    db_part.trim().parse::<f32>().ok()
}

fn parse_number(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Volume {
        #[serde(deserialize_with = "deserialize_volume")]
        volume: f32,
    }

    #[derive(Deserialize)]
    struct Bound {
        #[serde(default, deserialize_with = "deserialize_open_bound")]
        pre: Option<i64>,
    }

    fn volume(json: &str) -> f32 {
        serde_json::from_str::<Volume>(json).expect("volume").volume
    }

    fn bound(json: &str) -> Option<i64> {
        serde_json::from_str::<Bound>(json).expect("bound").pre
    }

    #[test]
    fn volume_accepts_numbers_and_db() {
        assert_eq!(volume(r#"{"volume": 0.5}"#), 0.5);
        assert_eq!(volume(r#"{"volume": -1}"#), -1.0);
        assert_eq!(volume(r#"{"volume": "0.25"}"#), 0.25);
        assert!((volume(r#"{"volume": "-6dB"}"#) - 0.501_187).abs() < 1e-5);
        assert!((volume(r#"{"volume": "0 db"}"#) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn volume_rejects_garbage() {
        assert!(serde_json::from_str::<Volume>(r#"{"volume": "loud"}"#).is_err());
        assert!(serde_json::from_str::<Volume>(r#"{"volume": true}"#).is_err());
    }

    #[test]
    fn open_bounds() {
        assert_eq!(bound(r#"{}"#), None);
        assert_eq!(bound(r#"{"pre": null}"#), None);
        assert_eq!(bound(r#"{"pre": -1}"#), None);
        assert_eq!(bound(r#"{"pre": 0}"#), Some(0));
        assert_eq!(bound(r#"{"pre": 44100}"#), Some(44_100));
    }

    #[test]
    fn db_to_linear_reference_points() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 1e-5);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }
}
