use super::plant::GrowingSeason;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived planting calendar entry for one city and plant group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantingWindow {
    pub city: String,
    pub growing_season: GrowingSeason,
    pub harvest_type: String,
    /// Indoor start; equals `outdoor_start` for direct-sow groups.
    pub planting_start: NaiveDate,
    pub outdoor_start: NaiveDate,
    pub planting_end: NaiveDate,
    pub planting_range_days: i64,
}

impl PlantingWindow {
    pub fn is_ordered(&self) -> bool {
        self.planting_start <= self.outdoor_start && self.outdoor_start <= self.planting_end
    }

    pub fn outdoor_days(&self) -> i64 {
        (self.planting_end - self.outdoor_start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.planting_start <= date && date <= self.planting_end
    }
}
