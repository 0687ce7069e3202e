use super::calculations::round_to_tenth;
use crate::models::{DailyObservation, DailyTemperature, PlantingStatus};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Daily average temperature and planting band for every recent and forecast day.
///
/// A day needs both a high and a low to be banded; days missing either are
/// left out. When a (city, date) repeats, the first row wins. Rows are ordered
/// by city then date.
pub fn daily_temperatures(observations: &[DailyObservation]) -> Vec<DailyTemperature> {
    let mut days: BTreeMap<(String, NaiveDate), DailyTemperature> = BTreeMap::new();
    let mut unbanded = 0usize;

    for obs in observations {
        let (Some(temp_max), Some(temp_min)) = (obs.temp_max, obs.temp_min) else {
            unbanded += 1;
            continue;
        };
        let temp_avg = round_to_tenth((temp_max + temp_min) / 2.0);
        days.entry((obs.city.clone(), obs.date))
            .or_insert_with(|| DailyTemperature {
                city: obs.city.clone(),
                date: obs.date,
                temp_avg,
                temp_max,
                temp_min,
                precipitation: obs.precipitation,
                status: PlantingStatus::classify(temp_avg),
            });
    }

    if unbanded > 0 {
        tracing::debug!(unbanded, "Forecast days without both a high and a low");
    }

    days.into_values().collect()
}
