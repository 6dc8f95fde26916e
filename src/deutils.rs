/*
 *  deutils.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Duration formatting and lenient deserialization helpers
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use arrayvec::ArrayString;
use core::fmt::Write;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::display::error::RenderError;

/// Longest string `write_duration` can produce for a u64 is well under this.
pub type DurationLabel = ArrayString<32>;

/// Writes whole seconds as `H:MM:SS` when an hour or more, else `M:SS`.
///
/// Hours and minutes in the leading position are never padded.
pub fn write_duration<W: Write>(out: &mut W, total_seconds: u64) -> core::fmt::Result {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        write!(out, "{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        write!(out, "{}:{:02}", minutes, seconds)
    }
}

/// Stack allocated duration label for the per-frame render path.
pub fn duration_label(total_seconds: u64) -> DurationLabel {
    let mut label = DurationLabel::new();
    // 32 bytes holds "5124095576030431:00:15", the u64 worst case
    let _ = write_duration(&mut label, total_seconds);
    label
}

/// Converts whole seconds into a clock string.
pub fn format_duration(total_seconds: u64) -> String {
    duration_label(total_seconds).to_string()
}

/// Checked variant for fractional input, rounds to the nearest second.
///
/// Negative or non-finite values are a caller bug and are rejected.
pub fn try_format_duration(seconds: f64) -> Result<String, RenderError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(RenderError::InvalidDuration(seconds));
    }
    Ok(format_duration(seconds.round() as u64))
}

/// Clamps untrusted player seconds onto the domain `format_duration` accepts.
pub fn clamp_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    }
}

/// Accepts a JSON number or a numeric string, players are not consistent.
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    match &v {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(|| D::Error::custom("non-numeric")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("expected seconds, got {:?}", s))),
        _ => Err(D::Error::custom("expected seconds")),
    }
}

/// Same as `deserialize_lenient_f64` for whole numbers, used for volume.
pub fn deserialize_numeric_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    let n = v
        .as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| D::Error::custom("non-integer"))?;
    u8::try_from(n).map_err(|_| D::Error::custom("overflow"))
}

/// Empty or whitespace-only strings collapse to `None`.
pub fn deserialize_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|v| !v.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(42), "0:42");
        assert_eq!(format_duration(3599), "59:59");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3661), "1:01:01");
        assert_eq!(format_duration(36000 + 59), "10:00:59");
    }

    #[test]
    fn test_duration_label_worst_case_fits() {
        assert_eq!(duration_label(u64::MAX).as_str(), "5124095576030431:00:15");
    }

    #[test]
    fn test_try_format_rejects_bad_input() {
        assert!(matches!(try_format_duration(-1.0), Err(RenderError::InvalidDuration(_))));
        assert!(try_format_duration(f64::NAN).is_err());
        assert!(try_format_duration(f64::INFINITY).is_err());
        assert_eq!(try_format_duration(59.6).unwrap(), "1:00");
    }

    #[test]
    fn test_clamp_seconds() {
        assert_eq!(clamp_seconds(-3.0), 0);
        assert_eq!(clamp_seconds(f64::NAN), 0);
        assert_eq!(clamp_seconds(12.4), 12);
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "deserialize_lenient_f64")]
        secs: f64,
        #[serde(default, deserialize_with = "deserialize_non_empty")]
        name: Option<String>,
        #[serde(default, deserialize_with = "deserialize_numeric_u8")]
        vol: u8,
    }

    #[test]
    fn test_lenient_fields() {
        let p: Probe = serde_json::from_str(r#"{"secs":"12.5","name":"  ","vol":"40"}"#).unwrap();
        assert_eq!(p.secs, 12.5);
        assert_eq!(p.name, None);
        assert_eq!(p.vol, 40);

        let p: Probe = serde_json::from_str(r#"{"secs":7,"name":"Spotify"}"#).unwrap();
        assert_eq!(p.secs, 7.0);
        assert_eq!(p.name.as_deref(), Some("Spotify"));

        assert!(serde_json::from_str::<Probe>(r#"{"secs":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"secs":1,"vol":300}"#).is_err());
    }
}
