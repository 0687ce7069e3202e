use super::calculations::{first_match, round_half_up, RunningMean};
use crate::models::{
    ClimateProfileDay, FreezeStats, GroupKey, GrowingGroup, PlantSpec, PlantingWindow,
};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct GroupAccumulator {
    weeks_indoor: RunningMean,
    days_to_maturity: RunningMean,
    min_viable: RunningMean,
    max_viable: RunningMean,
}

/// Average viability parameters per (growing_season, harvest_type).
pub fn group_plants(plants: &[PlantSpec]) -> Vec<GrowingGroup> {
    let mut groups: BTreeMap<GroupKey, GroupAccumulator> = BTreeMap::new();

    for plant in plants {
        let acc = groups.entry(plant.group_key()).or_default();
        acc.weeks_indoor.push(plant.effective_weeks_indoor());
        acc.days_to_maturity.push(plant.days_to_maturity);
        acc.min_viable.push(plant.min_viable_temp_f);
        acc.max_viable.push(plant.max_viable_temp_f);
    }

    groups
        .into_iter()
        .map(|(key, acc)| GrowingGroup {
            key,
            avg_weeks_indoor: acc.weeks_indoor.value().unwrap_or(0.0),
            avg_days_to_maturity: acc.days_to_maturity.value().unwrap_or(0.0),
            avg_min_viable_temp: acc.min_viable.value().unwrap_or(0.0),
            avg_max_viable_temp: acc.max_viable.value().unwrap_or(0.0),
            plant_count: acc.weeks_indoor.count() as usize,
        })
        .collect()
}

/// Why a (city, group) pair has no planting window. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoWindowReason {
    /// The city never recorded a spring freeze.
    NoLastFreeze,
    /// The city has no joined climatology profile.
    NoProfile,
    /// Shallow soil never warms past the group's minimum after the last freeze.
    SoilNeverWarm,
}

impl NoWindowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoWindowReason::NoLastFreeze => "no average last freeze",
            NoWindowReason::NoProfile => "no climatology profile",
            NoWindowReason::SoilNeverWarm => "soil never reaches minimum viable temperature",
        }
    }
}

impl std::fmt::Display for NoWindowReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingWindow {
    pub city: String,
    pub group: GroupKey,
    pub reason: NoWindowReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantingOutcome {
    pub windows: Vec<PlantingWindow>,
    pub missing: Vec<MissingWindow>,
}

/// First day strictly after the last freeze whose average shallow soil
/// temperature is above the group's minimum viable temperature.
pub fn outdoor_start(
    group: &GrowingGroup,
    last_freeze: NaiveDate,
    profile: &[ClimateProfileDay],
) -> Option<NaiveDate> {
    first_match(profile, |day| {
        day.date() > last_freeze
            && day
                .climate
                .avg_shallow_soil_temp
                .is_some_and(|t| t > group.avg_min_viable_temp)
    })
    .map(ClimateProfileDay::date)
}

/// First day on or after `outdoor_start` whose average high is above the
/// group's maximum viable temperature.
pub fn ceiling_date(
    group: &GrowingGroup,
    outdoor_start: NaiveDate,
    profile: &[ClimateProfileDay],
) -> Option<NaiveDate> {
    first_match(profile, |day| {
        day.date() >= outdoor_start
            && day
                .climate
                .avg_max_temp
                .is_some_and(|t| t > group.avg_max_viable_temp)
    })
    .map(ClimateProfileDay::date)
}

/// Solve one group's window for one city. `profile` must be that city's days
/// ordered by canonical date.
pub fn solve_window(
    city: &str,
    group: &GrowingGroup,
    last_freeze: NaiveDate,
    profile: &[ClimateProfileDay],
) -> Result<PlantingWindow, NoWindowReason> {
    let outdoor =
        outdoor_start(group, last_freeze, profile).ok_or(NoWindowReason::SoilNeverWarm)?;

    let indoor_days = day_count(group.avg_weeks_indoor * 7.0);
    let maturity_days = day_count(group.avg_days_to_maturity);

    // only out of range for absurd parameters
    let planting_start = outdoor
        .checked_sub_days(indoor_days)
        .ok_or(NoWindowReason::SoilNeverWarm)?;
    let maturity_end = outdoor
        .checked_add_days(maturity_days)
        .ok_or(NoWindowReason::SoilNeverWarm)?;

    let planting_end = match ceiling_date(group, outdoor, profile) {
        Some(ceiling) => ceiling.min(maturity_end),
        None => maturity_end,
    };

    Ok(PlantingWindow {
        city: city.to_string(),
        growing_season: group.key.growing_season,
        harvest_type: group.key.harvest_type.clone(),
        planting_start,
        outdoor_start: outdoor,
        planting_end,
        planting_range_days: (planting_end - planting_start).num_days(),
    })
}

fn day_count(value: f64) -> Days {
    Days::new(round_half_up(value).max(0) as u64)
}

/// Solve every group for every city that has freeze statistics.
pub fn solve_all(
    groups: &[GrowingGroup],
    freeze_stats: &[FreezeStats],
    profiles: &BTreeMap<String, Vec<ClimateProfileDay>>,
) -> PlantingOutcome {
    let mut outcome = PlantingOutcome::default();

    for stats in freeze_stats {
        let city = stats.city.as_str();
        let profile = profiles.get(city).map(Vec::as_slice).unwrap_or(&[]);

        for group in groups {
            let result = match stats.avg_last_freeze_all_time {
                None => Err(NoWindowReason::NoLastFreeze),
                Some(_) if profile.is_empty() => Err(NoWindowReason::NoProfile),
                Some(last_freeze) => solve_window(city, group, last_freeze, profile),
            };

            match result {
                Ok(window) if window.is_ordered() => outcome.windows.push(window),
                Ok(window) => {
                    tracing::warn!(
                        city,
                        group = %group.key,
                        start = %window.planting_start,
                        outdoor = %window.outdoor_start,
                        end = %window.planting_end,
                        "Discarding out-of-order planting window"
                    );
                }
                Err(reason) => {
                    tracing::debug!(city, group = %group.key, %reason, "No planting window");
                    outcome.missing.push(MissingWindow {
                        city: city.to_string(),
                        group: group.key.clone(),
                        reason,
                    });
                }
            }
        }
    }

    outcome
}
