use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One city's weather for one calendar date.
///
/// Historical rows carry air and soil temperatures; forecast rows carry air
/// temperature and precipitation. Any reading the source did not report is
/// `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub city: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default, alias = "soil_temp_0_7cm")]
    pub soil_temp_shallow: Option<f64>,
    #[serde(default, alias = "soil_temp_7_to_28cm", alias = "soil_temp_7_28cm")]
    pub soil_temp_deep: Option<f64>,
}

impl DailyObservation {
    pub fn new(city: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            city: city.into(),
            date,
            temp_max: None,
            temp_min: None,
            precipitation: None,
            soil_temp_shallow: None,
            soil_temp_deep: None,
        }
    }
}

/// Freezing point used for frost events, in °F.
pub const FREEZE_THRESHOLD_F: f64 = 32.0;

impl DailyObservation {
    /// True when the overnight low reached freezing. A missing low is not a freeze.
    pub fn is_freeze(&self) -> bool {
        self.temp_min.is_some_and(|t| t <= FREEZE_THRESHOLD_F)
    }
}

#[cfg(test)]
impl DailyObservation {
    pub fn with_temps(mut self, temp_min: f64, temp_max: f64) -> Self {
        self.temp_min = Some(temp_min);
        self.temp_max = Some(temp_max);
        self
    }

    pub fn with_precipitation(mut self, inches: f64) -> Self {
        self.precipitation = Some(inches);
        self
    }

    pub fn with_soil(mut self, shallow: f64, deep: f64) -> Self {
        self.soil_temp_shallow = Some(shallow);
        self.soil_temp_deep = Some(deep);
        self
    }
}
