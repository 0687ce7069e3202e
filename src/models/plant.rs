use crate::error::{GardenCalError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrowingSeason {
    #[serde(rename = "Cool Season", alias = "CoolSeason", alias = "cool season")]
    CoolSeason,
    #[serde(rename = "Warm Season", alias = "WarmSeason", alias = "warm season")]
    WarmSeason,
    #[serde(rename = "Perennial", alias = "perennial")]
    Perennial,
}

impl GrowingSeason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowingSeason::CoolSeason => "Cool Season",
            GrowingSeason::WarmSeason => "Warm Season",
            GrowingSeason::Perennial => "Perennial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cool season" | "coolseason" | "cool" => Some(GrowingSeason::CoolSeason),
            "warm season" | "warmseason" | "warm" => Some(GrowingSeason::WarmSeason),
            "perennial" => Some(GrowingSeason::Perennial),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrowingSeason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static reference data for one plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSpec {
    pub common_name: String,
    #[serde(default)]
    pub plant_family: Option<String>,
    pub growing_season: GrowingSeason,
    pub harvest_type: String,
    #[serde(default)]
    pub ideal_temp_min_f: Option<f64>,
    #[serde(default)]
    pub ideal_temp_max_f: Option<f64>,
    pub min_viable_temp_f: f64,
    pub max_viable_temp_f: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub direct_sow: bool,
    #[serde(default)]
    pub weeks_indoor_before_transplant: Option<f64>,
    pub days_to_maturity: f64,
    #[serde(default)]
    pub square_feet_needed: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub attracts_pollinators: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub needs_pollinators: bool,
}

impl PlantSpec {
    /// Weeks started indoors before moving outside. Direct-sown plants start outdoors.
    pub fn effective_weeks_indoor(&self) -> f64 {
        if self.direct_sow {
            0.0
        } else {
            self.weeks_indoor_before_transplant.unwrap_or(0.0)
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            growing_season: self.growing_season,
            harvest_type: self.harvest_type.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| GardenCalError::invalid_plant(&self.common_name, reason);

        if self.common_name.trim().is_empty() {
            return Err(invalid("empty common_name".into()));
        }
        if self.harvest_type.trim().is_empty() {
            return Err(invalid("empty harvest_type".into()));
        }
        if self.min_viable_temp_f > self.max_viable_temp_f {
            return Err(invalid(format!(
                "min_viable_temp_f {} is above max_viable_temp_f {}",
                self.min_viable_temp_f, self.max_viable_temp_f
            )));
        }
        if self.days_to_maturity < 0.0 || !self.days_to_maturity.is_finite() {
            return Err(invalid(
                "days_to_maturity must be a non-negative number".into(),
            ));
        }
        if let Some(weeks) = self.weeks_indoor_before_transplant {
            if weeks < 0.0 || !weeks.is_finite() {
                return Err(invalid(
                    "weeks_indoor_before_transplant must be a non-negative number".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Validate every plant, then require common names to be unique
/// (case-insensitive). Viability rows are keyed by city and common name.
pub fn validate_plant_list(plants: &[PlantSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for plant in plants {
        plant.validate()?;
        if !seen.insert(plant.common_name.trim().to_lowercase()) {
            return Err(GardenCalError::invalid_plant(
                &plant.common_name,
                "listed more than once; give each cultivar its own common_name",
            ));
        }
    }
    Ok(())
}

/// (growing_season, harvest_type) pairing that shares one planting window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub growing_season: GrowingSeason,
    pub harvest_type: String,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.growing_season, self.harvest_type)
    }
}

/// Viability parameters averaged over every plant in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowingGroup {
    pub key: GroupKey,
    pub avg_weeks_indoor: f64,
    pub avg_days_to_maturity: f64,
    pub avg_min_viable_temp: f64,
    pub avg_max_viable_temp: f64,
    pub plant_count: usize,
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = String::deserialize(deserializer)?;
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        other => Err(D::Error::custom(format!("invalid flag '{}'", other))),
    }
}

#[cfg(test)]
pub(crate) fn sample_plant(
    name: &str,
    season: GrowingSeason,
    harvest_type: &str,
    min_viable: f64,
    max_viable: f64,
) -> PlantSpec {
    PlantSpec {
        common_name: name.to_string(),
        plant_family: None,
        growing_season: season,
        harvest_type: harvest_type.to_string(),
        ideal_temp_min_f: None,
        ideal_temp_max_f: None,
        min_viable_temp_f: min_viable,
        max_viable_temp_f: max_viable,
        direct_sow: true,
        weeks_indoor_before_transplant: None,
        days_to_maturity: 60.0,
        square_feet_needed: None,
        attracts_pollinators: false,
        needs_pollinators: false,
    }
}
