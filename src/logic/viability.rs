use crate::models::{DailyObservation, PlantSpec, PlantViability, GOOD_WEEK_MIN_DAYS};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Days scored per forecast window.
pub const FORECAST_WINDOW_DAYS: usize = 7;

/// Count days whose high falls inside the plant's viable band, bounds inclusive.
pub fn viable_days<I>(plant: &PlantSpec, max_temps: I) -> u32
where
    I: IntoIterator<Item = f64>,
{
    max_temps
        .into_iter()
        .filter(|t| (plant.min_viable_temp_f..=plant.max_viable_temp_f).contains(t))
        .count() as u32
}

pub fn is_good_week(viable_days: u32) -> bool {
    viable_days >= GOOD_WEEK_MIN_DAYS
}

/// The first [`FORECAST_WINDOW_DAYS`] days on or after `today`, per city, in date order.
pub fn next_forecast_days(
    forecast: &[DailyObservation],
    today: NaiveDate,
) -> BTreeMap<String, Vec<&DailyObservation>> {
    let mut by_city: BTreeMap<String, Vec<&DailyObservation>> = BTreeMap::new();
    for obs in forecast.iter().filter(|o| o.date >= today) {
        by_city.entry(obs.city.clone()).or_default().push(obs);
    }
    for days in by_city.values_mut() {
        days.sort_by_key(|o| o.date);
        days.dedup_by_key(|o| o.date);
        days.truncate(FORECAST_WINDOW_DAYS);
    }
    by_city
}

/// Score one plant against one city's forecast window.
pub fn score_plant(city: &str, plant: &PlantSpec, window: &[&DailyObservation]) -> PlantViability {
    // a day without a forecast high can't be judged viable
    let viable = viable_days(plant, window.iter().filter_map(|o| o.temp_max));
    PlantViability {
        city: city.to_string(),
        common_name: plant.common_name.clone(),
        viable_days: viable,
        days_scored: window.len() as u32,
        good_week: is_good_week(viable),
    }
}

/// Score every plant for every forecast city. Rows are ordered by city, then
/// most viable days first, then by name.
pub fn rank_plants(
    plants: &[PlantSpec],
    forecast: &[DailyObservation],
    today: NaiveDate,
) -> Vec<PlantViability> {
    let windows = next_forecast_days(forecast, today);
    let mut ranked = Vec::with_capacity(windows.len() * plants.len());

    for (city, window) in &windows {
        if window.len() < FORECAST_WINDOW_DAYS {
            tracing::info!(
                city = %city,
                days = window.len(),
                "Forecast window is shorter than a week"
            );
        }
        let mut scores: Vec<PlantViability> = plants
            .iter()
            .map(|plant| score_plant(city, plant, window))
            .collect();
        scores.sort_by(|a, b| {
            b.viable_days
                .cmp(&a.viable_days)
                .then_with(|| a.common_name.cmp(&b.common_name))
        });
        ranked.extend(scores);
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_plant, GrowingSeason};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn forecast(city: &str, start: NaiveDate, highs: &[f64]) -> Vec<DailyObservation> {
        start
            .iter_days()
            .zip(highs)
            .map(|(d, high)| DailyObservation::new(city, d).with_temps(high - 20.0, *high))
            .collect()
    }

    #[test]
    fn counts_days_inside_band() {
        let plant = sample_plant("Lettuce", GrowingSeason::CoolSeason, "Leaf", 40.0, 75.0);
        let days = viable_days(&plant, [38.0, 45.0, 50.0, 60.0, 70.0, 76.0, 80.0]);
        assert_eq!(days, 4);
        assert!(is_good_week(days));
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let plant = sample_plant("Lettuce", GrowingSeason::CoolSeason, "Leaf", 40.0, 75.0);
        assert_eq!(viable_days(&plant, [40.0, 75.0, 39.9, 75.1]), 2);
        assert_eq!(viable_days(&plant, Vec::<f64>::new()), 0);
    }

    #[test]
    fn good_week_threshold() {
        assert!(!is_good_week(3));
        assert!(is_good_week(4));
        assert!(is_good_week(7));
    }

    #[test]
    fn window_starts_today_and_holds_a_week() {
        let mut obs = forecast("Eugene", date(5, 1), &[60.0; 20]);
        obs.extend(forecast("Bend", date(5, 9), &[55.0; 3]));

        let windows = next_forecast_days(&obs, date(5, 10));
        let eugene = &windows["Eugene"];
        assert_eq!(eugene.len(), 7);
        assert_eq!(eugene[0].date, date(5, 10));
        assert_eq!(eugene[6].date, date(5, 16));

        let bend = &windows["Bend"];
        assert_eq!(bend.len(), 2);
        assert_eq!(bend[0].date, date(5, 10));
    }

    #[test]
    fn missing_high_is_not_viable() {
        let plant = sample_plant("Bean", GrowingSeason::WarmSeason, "Pod", 50.0, 90.0);
        let mut obs = forecast("Medford", date(7, 1), &[70.0, 70.0]);
        obs.push(DailyObservation::new("Medford", date(7, 3)));

        let windows = next_forecast_days(&obs, date(7, 1));
        let score = score_plant("Medford", &plant, &windows["Medford"]);
        assert_eq!(score.viable_days, 2);
        assert_eq!(score.days_scored, 3);
        assert!(!score.good_week);
    }

    #[test]
    fn ranking_orders_by_days_then_name() {
        let plants = vec![
            sample_plant("Tomato", GrowingSeason::WarmSeason, "Fruit", 60.0, 95.0),
            sample_plant("Kale", GrowingSeason::CoolSeason, "Leaf", 35.0, 75.0),
            sample_plant("Chard", GrowingSeason::CoolSeason, "Leaf", 35.0, 75.0),
            sample_plant("Okra", GrowingSeason::WarmSeason, "Pod", 85.0, 100.0),
        ];
        let obs = forecast("Portland", date(6, 1), &[38.0, 45.0, 50.0, 60.0, 70.0, 76.0, 80.0]);

        let ranked = rank_plants(&plants, &obs, date(6, 1));
        let names: Vec<(&str, u32)> = ranked
            .iter()
            .map(|v| (v.common_name.as_str(), v.viable_days))
            .collect();
        assert_eq!(
            names,
            vec![("Chard", 5), ("Kale", 5), ("Tomato", 4), ("Okra", 0)]
        );
        assert!(ranked[0].good_week);
        assert!(!ranked[3].good_week);
    }
}
