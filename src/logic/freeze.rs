use super::calculations::RunningMean;
use super::calendar::{CanonicalCalendar, CanonicalDay};
use crate::models::{DailyObservation, FreezeStats};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// Freeze events found in one city's calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyFreeze {
    pub city: String,
    pub year: i32,
    /// Latest freeze in January through June.
    pub last_spring: Option<NaiveDate>,
    /// Earliest freeze in July through December.
    pub first_autumn: Option<NaiveDate>,
}

/// Trailing window of years a freeze average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeWindow {
    AllTime,
    /// The N most recent calendar years, counting the reference year.
    RecentYears(i32),
}

impl FreezeWindow {
    pub const ALL: [FreezeWindow; 3] = [
        FreezeWindow::AllTime,
        FreezeWindow::RecentYears(10),
        FreezeWindow::RecentYears(5),
    ];

    pub fn includes(self, year: i32, reference_year: i32) -> bool {
        match self {
            FreezeWindow::AllTime => true,
            FreezeWindow::RecentYears(n) => year > reference_year - n && year <= reference_year,
        }
    }
}

/// Find the last spring and first autumn freeze for every (city, year).
/// Years without any freeze are omitted.
pub fn yearly_freeze_events(observations: &[DailyObservation]) -> Vec<YearlyFreeze> {
    let mut by_year: BTreeMap<(String, i32), YearlyFreeze> = BTreeMap::new();

    for obs in observations.iter().filter(|o| o.is_freeze()) {
        let year = obs.date.year();
        let entry = by_year
            .entry((obs.city.clone(), year))
            .or_insert_with(|| YearlyFreeze {
                city: obs.city.clone(),
                year,
                last_spring: None,
                first_autumn: None,
            });

        if obs.date.month() <= 6 {
            entry.last_spring = entry.last_spring.max(Some(obs.date));
        } else {
            entry.first_autumn = Some(match entry.first_autumn {
                Some(existing) => existing.min(obs.date),
                None => obs.date,
            });
        }
    }

    by_year.into_values().collect()
}

#[derive(Debug, Default)]
struct CityFreezeAccumulator {
    last_spring: [RunningMean; 3],
    first_autumn: [RunningMean; 3],
}

fn ordinal_of(date: NaiveDate) -> f64 {
    f64::from(CanonicalDay::of(date).ordinal())
}

fn mean_date(mean: &RunningMean, calendar: &CanonicalCalendar) -> Option<NaiveDate> {
    mean.value().and_then(|ordinal| calendar.date_from_mean_ordinal(ordinal))
}

/// Average freeze dates per city over the all-time, 10-year and 5-year windows.
///
/// Each (city, year) event is computed once and then fanned out to every
/// window that contains its year. Every city present in `observations` gets a
/// row, with `None` for windows that saw no freeze.
pub fn freeze_stats(
    calendar: &CanonicalCalendar,
    observations: &[DailyObservation],
) -> Vec<FreezeStats> {
    let reference_year = calendar.reference_year();
    let cities: BTreeSet<&str> = observations.iter().map(|o| o.city.as_str()).collect();

    let mut accumulators: BTreeMap<String, CityFreezeAccumulator> = cities
        .into_iter()
        .map(|c| (c.to_string(), CityFreezeAccumulator::default()))
        .collect();

    for event in yearly_freeze_events(observations) {
        let acc = accumulators.entry(event.city.clone()).or_default();
        for (i, window) in FreezeWindow::ALL.iter().enumerate() {
            if !window.includes(event.year, reference_year) {
                continue;
            }
            if let Some(date) = event.last_spring {
                acc.last_spring[i].push(ordinal_of(date));
            }
            if let Some(date) = event.first_autumn {
                acc.first_autumn[i].push(ordinal_of(date));
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(city, acc)| {
            let mut stats = FreezeStats::empty(city);
            stats.avg_last_freeze_all_time = mean_date(&acc.last_spring[0], calendar);
            stats.avg_last_freeze_10y = mean_date(&acc.last_spring[1], calendar);
            stats.avg_last_freeze_5y = mean_date(&acc.last_spring[2], calendar);
            stats.avg_first_freeze_all_time = mean_date(&acc.first_autumn[0], calendar);
            stats.avg_first_freeze_10y = mean_date(&acc.first_autumn[1], calendar);
            stats.avg_first_freeze_5y = mean_date(&acc.first_autumn[2], calendar);
            if stats.avg_last_freeze_all_time.is_none() {
                tracing::debug!(city = %stats.city, "No spring freeze on record");
            }
            stats
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn low(city: &str, d: NaiveDate, temp_min: f64) -> DailyObservation {
        DailyObservation::new(city, d).with_temps(temp_min, temp_min + 20.0)
    }

    #[test]
    fn finds_last_spring_and_first_autumn_freeze() {
        let obs = vec![
            low("Bend", date(2020, 2, 10), 20.0),
            low("Bend", date(2020, 5, 3), 31.0),
            low("Bend", date(2020, 5, 20), 40.0),
            low("Bend", date(2020, 6, 30), 32.0),
            low("Bend", date(2020, 7, 1), 30.0),
            low("Bend", date(2020, 9, 28), 29.0),
            low("Bend", date(2020, 11, 2), 15.0),
        ];
        let events = yearly_freeze_events(&obs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].last_spring, Some(date(2020, 6, 30)));
        assert_eq!(events[0].first_autumn, Some(date(2020, 7, 1)));
    }

    #[test]
    fn missing_low_is_ignored() {
        let obs = vec![DailyObservation::new("Bend", date(2020, 3, 1))];
        assert!(yearly_freeze_events(&obs).is_empty());
    }

    #[test]
    fn average_is_rounded_mean_of_ordinals() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        // ordinals 99, 100 (2021 and 2022 are not leap years) -> mean 99.5 -> 100
        let obs = vec![
            low("Eugene", date(2021, 4, 9), 30.0),
            low("Eugene", date(2022, 4, 10), 30.0),
        ];
        let stats = freeze_stats(&cal, &obs);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].avg_last_freeze_all_time, Some(date(2025, 4, 10)));
    }

    #[test]
    fn average_is_independent_of_input_order() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let mut obs = vec![
            low("Medford", date(1990, 3, 28), 28.0),
            low("Medford", date(2001, 4, 15), 30.0),
            low("Medford", date(2012, 4, 2), 31.0),
            low("Medford", date(2012, 10, 30), 31.0),
            low("Medford", date(2018, 5, 1), 25.0),
        ];
        let forward = freeze_stats(&cal, &obs);
        obs.reverse();
        let reversed = freeze_stats(&cal, &obs);
        obs.swap(0, 3);
        let shuffled = freeze_stats(&cal, &obs);

        assert_eq!(forward, reversed);
        assert_eq!(forward, shuffled);

        // 87, 105, 93 (2012 is leap), 121 -> mean 101.5 -> 102
        let expected: f64 = [87.0, 105.0, 93.0, 121.0].iter().sum::<f64>() / 4.0;
        assert_eq!(expected, 101.5);
        assert_eq!(forward[0].avg_last_freeze_all_time, Some(date(2025, 4, 12)));
    }

    #[test]
    fn years_without_freeze_are_excluded_not_zero() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let obs = vec![
            low("Astoria", date(2019, 3, 1), 30.0),
            // 2020 has data but never freezes
            low("Astoria", date(2020, 3, 1), 40.0),
            low("Astoria", date(2021, 3, 1), 30.0),
        ];
        let stats = freeze_stats(&cal, &obs);
        assert_eq!(stats[0].avg_last_freeze_all_time, Some(date(2025, 3, 1)));
        assert_eq!(stats[0].avg_first_freeze_all_time, None);
    }

    #[test]
    fn trailing_windows_use_recent_years() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let obs = vec![
            // outside both windows
            low("Portland", date(2000, 5, 1), 30.0),
            // inside the 10-year window only (2016..=2025)
            low("Portland", date(2017, 3, 1), 30.0),
            // inside both (2021..=2025)
            low("Portland", date(2023, 3, 3), 30.0),
        ];
        let stats = &freeze_stats(&cal, &obs)[0];

        assert_eq!(stats.avg_last_freeze_5y, Some(date(2025, 3, 3)));
        // ordinals 60 and 62 -> 61
        assert_eq!(stats.avg_last_freeze_10y, Some(date(2025, 3, 2)));
        // ordinals 122 (2000 is leap), 60, 62 -> 81
        assert_eq!(stats.avg_last_freeze_all_time, Some(date(2025, 3, 22)));
    }

    #[test]
    fn empty_window_is_none_not_a_sentinel() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let obs = vec![
            low("Hood River", date(1995, 4, 1), 30.0),
            low("Hood River", date(2024, 6, 1), 50.0),
        ];
        let stats = &freeze_stats(&cal, &obs)[0];
        assert!(stats.avg_last_freeze_all_time.is_some());
        assert_eq!(stats.avg_last_freeze_10y, None);
        assert_eq!(stats.avg_last_freeze_5y, None);
    }

    #[test]
    fn city_without_any_freeze_gets_empty_row() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let obs = vec![low("Sunnydale", date(2024, 1, 15), 45.0)];
        let stats = freeze_stats(&cal, &obs);
        assert_eq!(stats, vec![FreezeStats::empty("Sunnydale")]);
    }

    #[test]
    fn cities_are_kept_apart() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let obs = vec![
            low("Bend", date(2020, 5, 30), 25.0),
            low("Astoria", date(2020, 2, 1), 31.0),
        ];
        let stats = freeze_stats(&cal, &obs);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].city, "Astoria");
        assert_eq!(stats[0].avg_last_freeze_all_time, Some(date(2025, 2, 1)));
        // 2020-05-30 is ordinal 151 -> 2025-05-31
        assert_eq!(stats[1].avg_last_freeze_all_time, Some(date(2025, 5, 31)));
    }

    #[test]
    fn window_membership() {
        assert!(FreezeWindow::AllTime.includes(1940, 2025));
        assert!(FreezeWindow::RecentYears(5).includes(2021, 2025));
        assert!(FreezeWindow::RecentYears(5).includes(2025, 2025));
        assert!(!FreezeWindow::RecentYears(5).includes(2020, 2025));
        assert!(!FreezeWindow::RecentYears(5).includes(2026, 2025));
    }
}
