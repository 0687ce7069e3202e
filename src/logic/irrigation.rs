use crate::models::{DailyObservation, IrrigationWeek};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

/// Monday of the ISO week containing `date`.
pub fn iso_week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

#[derive(Debug, Default)]
struct WeekTotal {
    rainfall: f64,
    days_reported: u32,
}

/// Sum precipitation per (city, ISO week) and classify each week.
///
/// Days with no precipitation reading count toward neither the total nor
/// `days_reported`; a week where nothing was reported still appears with a
/// zero total. Rows are ordered by city then week.
pub fn classify_weeks(observations: &[DailyObservation]) -> Vec<IrrigationWeek> {
    let mut weeks: BTreeMap<(String, NaiveDate), WeekTotal> = BTreeMap::new();

    for obs in observations {
        let total = weeks
            .entry((obs.city.clone(), iso_week_start(obs.date)))
            .or_default();
        if let Some(p) = obs.precipitation.filter(|p| *p >= 0.0) {
            total.rainfall += p;
            total.days_reported += 1;
        }
    }

    weeks
        .into_iter()
        .map(|((city, week_start), total)| {
            let mut week = IrrigationWeek::new(city, week_start, total.rainfall);
            week.days_reported = total.days_reported;
            week
        })
        .collect()
}
