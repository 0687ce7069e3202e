use super::calculations::round_half_up;
use crate::error::{GardenCalError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// 1-based day-of-year, 1..=366.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalDay(u32);

impl CanonicalDay {
    pub const MAX: u32 = 366;

    pub fn new(ordinal: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&ordinal).then_some(Self(ordinal))
    }

    /// Ordinal position of `date` within its own year.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.ordinal())
    }

    pub fn ordinal(self) -> u32 {
        self.0
    }
}

/// Maps observations from any year onto one reference year by ordinal day.
///
/// The only offset convention in the crate lives in [`CanonicalCalendar::date_of`]:
/// ordinal `d` becomes January 1 of the reference year plus `d - 1` days.
/// When the reference year is not a leap year, ordinal 366 lands on January 1
/// of the following year, so it never collides with ordinal 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCalendar {
    reference_year: i32,
    jan1: NaiveDate,
}

impl CanonicalCalendar {
    pub fn new(reference_year: i32) -> Result<Self> {
        // ordinal 366 may spill into the next year, which must also be representable
        let jan1 = NaiveDate::from_ymd_opt(reference_year, 1, 1)
            .filter(|_| NaiveDate::from_ymd_opt(reference_year + 1, 1, 1).is_some())
            .ok_or_else(|| {
                GardenCalError::InvalidData(format!(
                    "reference year {} is out of range",
                    reference_year
                ))
            })?;
        Ok(Self {
            reference_year,
            jan1,
        })
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn date_of(&self, day: CanonicalDay) -> NaiveDate {
        self.jan1 + Days::new(u64::from(day.ordinal() - 1))
    }

    /// Inverse of [`date_of`](Self::date_of) for dates already on the canonical calendar.
    pub fn day_of(&self, canonical_date: NaiveDate) -> Option<CanonicalDay> {
        let offset = (canonical_date - self.jan1).num_days();
        if (0..i64::from(CanonicalDay::MAX)).contains(&offset) {
            CanonicalDay::new(offset as u32 + 1)
        } else {
            None
        }
    }

    /// Canonical date for an observation taken in any year.
    pub fn normalize(&self, date: NaiveDate) -> NaiveDate {
        self.date_of(CanonicalDay::of(date))
    }

    /// Canonical date for a fractional mean ordinal, rounded half up.
    pub fn date_from_mean_ordinal(&self, mean_ordinal: f64) -> Option<NaiveDate> {
        let rounded = round_half_up(mean_ordinal);
        u32::try_from(rounded)
            .ok()
            .and_then(CanonicalDay::new)
            .map(|day| self.date_of(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ordinal_one_is_january_first() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        assert_eq!(cal.date_of(CanonicalDay::new(1).unwrap()), date(2025, 1, 1));
        assert_eq!(cal.date_of(CanonicalDay::new(2).unwrap()), date(2025, 1, 2));
        assert_eq!(cal.date_of(CanonicalDay::new(365).unwrap()), date(2025, 12, 31));
    }

    #[test]
    fn normalizes_by_ordinal_not_month_day() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        assert_eq!(cal.normalize(date(1987, 4, 20)), date(2025, 4, 20));
        // March 1st of a leap year is ordinal 61, which is March 2nd in 2025
        assert_eq!(cal.normalize(date(2020, 3, 1)), date(2025, 3, 2));
    }

    #[test]
    fn normalizing_canonical_dates_is_idempotent() {
        for reference_year in [2024, 2025] {
            let cal = CanonicalCalendar::new(reference_year).unwrap();
            let mut d = date(reference_year, 1, 1);
            while d.year() == reference_year {
                let once = cal.normalize(d);
                assert_eq!(once, d);
                assert_eq!(cal.normalize(once), once);
                d = d.succ_opt().unwrap();
            }
        }
    }

    #[test]
    fn every_ordinal_round_trips() {
        for reference_year in [2024, 2025] {
            let cal = CanonicalCalendar::new(reference_year).unwrap();
            for ordinal in 1..=366 {
                let day = CanonicalDay::new(ordinal).unwrap();
                assert_eq!(cal.day_of(cal.date_of(day)), Some(day));
            }
        }
    }

    #[test]
    fn leap_day_366_does_not_collide_in_non_leap_reference_year() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        let dec31_leap = cal.normalize(date(2024, 12, 31));
        let jan1_next = cal.normalize(date(2025, 1, 1));

        assert_eq!(CanonicalDay::of(date(2024, 12, 31)).ordinal(), 366);
        assert_eq!(dec31_leap, date(2026, 1, 1));
        assert_eq!(jan1_next, date(2025, 1, 1));
        assert_ne!(dec31_leap, jan1_next);

        // all 366 ordinals map to distinct dates
        let mut dates: Vec<NaiveDate> = (1..=366)
            .map(|o| cal.date_of(CanonicalDay::new(o).unwrap()))
            .collect();
        dates.dedup();
        assert_eq!(dates.len(), 366);
    }

    #[test]
    fn leap_reference_year_keeps_day_366_in_year() {
        let cal = CanonicalCalendar::new(2024).unwrap();
        assert_eq!(cal.date_of(CanonicalDay::new(366).unwrap()), date(2024, 12, 31));
        assert_eq!(cal.normalize(date(1996, 2, 29)), date(2024, 2, 29));
    }

    #[test]
    fn day_of_outside_frame_is_none() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        assert_eq!(cal.day_of(date(2024, 12, 31)), None);
        assert_eq!(cal.day_of(date(2026, 1, 2)), None);
    }

    #[test]
    fn mean_ordinal_rounds_half_up() {
        let cal = CanonicalCalendar::new(2025).unwrap();
        assert_eq!(cal.date_from_mean_ordinal(100.5), Some(date(2025, 4, 11)));
        assert_eq!(cal.date_from_mean_ordinal(100.49), Some(date(2025, 4, 10)));
        assert_eq!(cal.date_from_mean_ordinal(0.2), None);
        assert_eq!(cal.date_from_mean_ordinal(367.0), None);
    }

    #[test]
    fn canonical_day_bounds() {
        assert!(CanonicalDay::new(0).is_none());
        assert!(CanonicalDay::new(1).is_some());
        assert!(CanonicalDay::new(366).is_some());
        assert!(CanonicalDay::new(367).is_none());
    }
}
