use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Daily sun events for one city on one date of the reference year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub city: String,
    pub date: NaiveDate,
    pub morning_twilight: NaiveTime,
    pub sunrise: NaiveTime,
    #[serde(default)]
    pub solar_noon: Option<NaiveTime>,
    pub sunset: NaiveTime,
    pub evening_twilight: NaiveTime,
    /// Daylight duration in seconds, written as `H:MM:SS` in files.
    #[serde(
        rename = "day_length",
        serialize_with = "serialize_day_length",
        deserialize_with = "deserialize_day_length"
    )]
    pub day_length_secs: u32,
}

/// Parse `H:MM:SS` (hours may exceed 23 near the poles) into seconds.
pub fn parse_day_length(s: &str) -> Option<u32> {
    let mut parts = s.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

pub fn format_day_length(secs: u32) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn deserialize_day_length<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = String::deserialize(deserializer)?;
    parse_day_length(&value)
        .ok_or_else(|| D::Error::custom(format!("invalid day_length '{}'", value)))
}

fn serialize_day_length<S>(secs: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_day_length(*secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_length() {
        assert_eq!(parse_day_length("8:41:07"), Some(8 * 3600 + 41 * 60 + 7));
        assert_eq!(parse_day_length("15:02:00"), Some(15 * 3600 + 120));
        assert_eq!(parse_day_length("12:30"), Some(12 * 3600 + 30 * 60));
    }

    #[test]
    fn rejects_malformed_day_length() {
        assert_eq!(parse_day_length(""), None);
        assert_eq!(parse_day_length("8:61:00"), None);
        assert_eq!(parse_day_length("a:b:c"), None);
        assert_eq!(parse_day_length("1:2:3:4"), None);
    }

    #[test]
    fn formats_day_length() {
        assert_eq!(format_day_length(8 * 3600 + 41 * 60 + 7), "8:41:07");
        assert_eq!(format_day_length(0), "0:00:00");
    }
}
