use serde::{Deserialize, Serialize};

/// Viable days a plant needs in the coming week to be worth planting now.
pub const GOOD_WEEK_MIN_DAYS: u32 = 4;

/// How well the next forecast week suits one plant in one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantViability {
    pub city: String,
    pub common_name: String,
    pub viable_days: u32,
    pub days_scored: u32,
    pub good_week: bool,
}
