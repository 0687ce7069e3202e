use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily average at or above which peppers can go out, in °F.
pub const PEPPERS_MIN_AVG_F: f64 = 65.0;
pub const TOMATOES_MIN_AVG_F: f64 = 60.0;
pub const BEANS_MIN_AVG_F: f64 = 50.0;
/// Below this daily average nothing should be planted.
pub const KALE_MIN_AVG_F: f64 = 40.0;

/// What a day's average temperature is warm enough to plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlantingStatus {
    TooCold,
    KaleCarrots,
    BeansZucchini,
    Tomatoes,
    Peppers,
}

impl PlantingStatus {
    /// Classify a daily average temperature; each band's lower bound is inclusive.
    pub fn classify(temp_avg: f64) -> Self {
        if temp_avg >= PEPPERS_MIN_AVG_F {
            PlantingStatus::Peppers
        } else if temp_avg >= TOMATOES_MIN_AVG_F {
            PlantingStatus::Tomatoes
        } else if temp_avg >= BEANS_MIN_AVG_F {
            PlantingStatus::BeansZucchini
        } else if temp_avg >= KALE_MIN_AVG_F {
            PlantingStatus::KaleCarrots
        } else {
            PlantingStatus::TooCold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlantingStatus::Peppers => "Safe for peppers",
            PlantingStatus::Tomatoes => "Safe for tomatoes",
            PlantingStatus::BeansZucchini => "Safe for beans/zucchini",
            PlantingStatus::KaleCarrots => "Safe for kale/carrots",
            PlantingStatus::TooCold => "Too cold to plant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Safe for peppers" => Some(PlantingStatus::Peppers),
            "Safe for tomatoes" => Some(PlantingStatus::Tomatoes),
            "Safe for beans/zucchini" => Some(PlantingStatus::BeansZucchini),
            "Safe for kale/carrots" => Some(PlantingStatus::KaleCarrots),
            "Too cold to plant" => Some(PlantingStatus::TooCold),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlantingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recent or forecast day with its average temperature band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub city: String,
    pub date: NaiveDate,
    /// Midpoint of the high and low, rounded to a tenth of a degree.
    pub temp_avg: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation: Option<f64>,
    pub status: PlantingStatus,
}
