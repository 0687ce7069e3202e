use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weekly water need for a garden bed, in inches.
pub const RAINFALL_NEEDED_IN: f64 = 1.0;

/// Below this weekly total a bed needs full irrigation, in inches.
pub const LIGHT_IRRIGATION_MIN_IN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrrigationStatus {
    NotNeeded,
    Light,
    Needed,
}

impl IrrigationStatus {
    /// Classify a weekly rainfall total against [`RAINFALL_NEEDED_IN`].
    pub fn classify(total_rainfall: f64) -> Self {
        if total_rainfall >= RAINFALL_NEEDED_IN {
            IrrigationStatus::NotNeeded
        } else if total_rainfall >= LIGHT_IRRIGATION_MIN_IN {
            IrrigationStatus::Light
        } else {
            IrrigationStatus::Needed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IrrigationStatus::NotNeeded => "No irrigation needed",
            IrrigationStatus::Light => "Light irrigation needed",
            IrrigationStatus::Needed => "Irrigation needed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "No irrigation needed" => Some(IrrigationStatus::NotNeeded),
            "Light irrigation needed" => Some(IrrigationStatus::Light),
            "Irrigation needed" => Some(IrrigationStatus::Needed),
            _ => None,
        }
    }
}

impl std::fmt::Display for IrrigationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationWeek {
    pub city: String,
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    pub total_rainfall: f64,
    pub rainfall_needed: f64,
    /// Signed; negative means a deficit.
    pub surplus_deficit: f64,
    pub status: IrrigationStatus,
    pub days_reported: u32,
}

impl IrrigationWeek {
    pub fn new(city: impl Into<String>, week_start: NaiveDate, total_rainfall: f64) -> Self {
        Self {
            city: city.into(),
            week_start,
            total_rainfall,
            rainfall_needed: RAINFALL_NEEDED_IN,
            surplus_deficit: total_rainfall - RAINFALL_NEEDED_IN,
            status: IrrigationStatus::classify(total_rainfall),
            days_reported: 0,
        }
    }
}
