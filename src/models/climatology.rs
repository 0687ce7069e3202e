use super::sun_times::SunTimes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Multi-year average conditions for one city on one ordinal day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologicalDay {
    pub city: String,
    pub ordinal: u32,
    pub canonical_date: NaiveDate,
    pub avg_min_temp: Option<f64>,
    pub avg_max_temp: Option<f64>,
    pub avg_shallow_soil_temp: Option<f64>,
    pub avg_deep_soil_temp: Option<f64>,
    /// Number of historical years that reported this ordinal day.
    pub years_observed: u32,
}

/// A climatological day that has matching sun times. Days without sun data
/// are not part of the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateProfileDay {
    pub climate: ClimatologicalDay,
    pub sun: SunTimes,
}

impl ClimateProfileDay {
    pub fn date(&self) -> NaiveDate {
        self.climate.canonical_date
    }
}

/// Averaged freeze dates for one city, each mapped onto the reference year.
/// A `None` means the window had no qualifying year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeStats {
    pub city: String,
    pub avg_last_freeze_all_time: Option<NaiveDate>,
    pub avg_last_freeze_10y: Option<NaiveDate>,
    pub avg_last_freeze_5y: Option<NaiveDate>,
    pub avg_first_freeze_all_time: Option<NaiveDate>,
    pub avg_first_freeze_10y: Option<NaiveDate>,
    pub avg_first_freeze_5y: Option<NaiveDate>,
}

impl FreezeStats {
    pub fn empty(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            avg_last_freeze_all_time: None,
            avg_last_freeze_10y: None,
            avg_last_freeze_5y: None,
            avg_first_freeze_all_time: None,
            avg_first_freeze_10y: None,
            avg_first_freeze_5y: None,
        }
    }

    /// Frost-free days between the all-time average last and first freeze.
    pub fn growing_season_days(&self) -> Option<i64> {
        let last = self.avg_last_freeze_all_time?;
        let first = self.avg_first_freeze_all_time?;
        Some((first - last).num_days())
    }
}
