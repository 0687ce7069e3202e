use super::calculations::RunningMean;
use super::calendar::CanonicalCalendar;
use crate::models::{ClimateProfileDay, ClimatologicalDay, DailyObservation, SunTimes};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default)]
struct DayAccumulator {
    temp_min: RunningMean,
    temp_max: RunningMean,
    soil_shallow: RunningMean,
    soil_deep: RunningMean,
    years: BTreeSet<i32>,
}

/// Average every historical year onto one canonical year per city.
///
/// Rows come back ordered by city and then ordinal day. A field that no year
/// reported for a day is `None`. A repeated (city, date) row is ignored, so
/// each year contributes at most once per day.
pub fn aggregate_climatology(
    calendar: &CanonicalCalendar,
    observations: &[DailyObservation],
) -> Vec<ClimatologicalDay> {
    let mut groups: BTreeMap<(String, NaiveDate), DayAccumulator> = BTreeMap::new();
    let mut repeated = 0usize;

    for obs in observations {
        let acc = groups
            .entry((obs.city.clone(), calendar.normalize(obs.date)))
            .or_default();
        if !acc.years.insert(obs.date.year()) {
            repeated += 1;
            continue;
        }
        acc.temp_min.push_present(obs.temp_min);
        acc.temp_max.push_present(obs.temp_max);
        acc.soil_shallow.push_present(obs.soil_temp_shallow);
        acc.soil_deep.push_present(obs.soil_temp_deep);
    }

    if repeated > 0 {
        tracing::warn!(repeated, "Repeated historical rows ignored");
    }

    groups
        .into_iter()
        .filter_map(|((city, canonical_date), acc)| {
            let day = calendar.day_of(canonical_date)?;
            Some(ClimatologicalDay {
                city,
                ordinal: day.ordinal(),
                canonical_date,
                avg_min_temp: acc.temp_min.value(),
                avg_max_temp: acc.temp_max.value(),
                avg_shallow_soil_temp: acc.soil_shallow.value(),
                avg_deep_soil_temp: acc.soil_deep.value(),
                years_observed: acc.years.len() as u32,
            })
        })
        .collect()
}

/// Attach sun times to each climatological day (inner join on city and date).
///
/// Days with no sun record are dropped rather than null-filled: a profile day
/// without daylight data is incomplete. With a non-leap reference year this
/// always drops ordinal 366, whose canonical date falls in the next year.
pub fn join_sun_times(
    climatology: &[ClimatologicalDay],
    sun_times: &[SunTimes],
) -> Vec<ClimateProfileDay> {
    let sun_index: HashMap<(&str, NaiveDate), &SunTimes> = sun_times
        .iter()
        .map(|s| ((s.city.as_str(), s.date), s))
        .collect();

    let profile: Vec<ClimateProfileDay> = climatology
        .iter()
        .filter_map(|day| {
            sun_index
                .get(&(day.city.as_str(), day.canonical_date))
                .map(|sun| ClimateProfileDay {
                    climate: day.clone(),
                    sun: (*sun).clone(),
                })
        })
        .collect();

    let dropped = climatology.len() - profile.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Climatology days without sun times left out of profile");
    }

    profile
}

/// Split a joined profile into per-city sequences ordered by canonical date.
pub fn profiles_by_city(profile: &[ClimateProfileDay]) -> BTreeMap<String, Vec<ClimateProfileDay>> {
    let mut by_city: BTreeMap<String, Vec<ClimateProfileDay>> = BTreeMap::new();
    for day in profile {
        by_city
            .entry(day.climate.city.clone())
            .or_default()
            .push(day.clone());
    }
    for days in by_city.values_mut() {
        days.sort_by_key(|d| d.date());
    }
    by_city
}

#[cfg(test)]
pub(crate) fn sample_sun(city: &str, date: NaiveDate) -> SunTimes {
    use chrono::NaiveTime;
    let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    SunTimes {
        city: city.to_string(),
        date,
        morning_twilight: t(5, 10),
        sunrise: t(6, 20),
        solar_noon: Some(t(13, 5)),
        sunset: t(19, 50),
        evening_twilight: t(21, 0),
        day_length_secs: 13 * 3600 + 30 * 60,
    }
}
