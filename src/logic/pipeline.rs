use super::calendar::CanonicalCalendar;
use super::planting::MissingWindow;
use super::{climatology, freeze, irrigation, planting, temperature_bands, viability};
use crate::error::Result;
use crate::models::{
    validate_plant_list, ClimateProfileDay, ClimatologicalDay, DailyObservation, DailyTemperature,
    FreezeStats, IrrigationWeek, PlantSpec, PlantViability, PlantingWindow, SunTimes,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything one run reads. Loaded and validated before the run starts.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub historical: Vec<DailyObservation>,
    pub forecast: Vec<DailyObservation>,
    pub sun_times: Vec<SunTimes>,
    pub plants: Vec<PlantSpec>,
}

/// Row counts for one run, recorded alongside the published tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reference_year: i32,
    pub cities: usize,
    pub plant_groups: usize,
    pub climatology_days: usize,
    pub profile_days: usize,
    pub freeze_stats: usize,
    pub planting_windows: usize,
    pub missing_windows: usize,
    pub irrigation_weeks: usize,
    pub viability_rows: usize,
    #[serde(default)]
    pub daily_temperatures: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Reference year:    {}", self.reference_year)?;
        writeln!(f, "Cities:            {}", self.cities)?;
        writeln!(f, "Plant groups:      {}", self.plant_groups)?;
        writeln!(f, "Climatology days:  {}", self.climatology_days)?;
        writeln!(f, "Profile days:      {}", self.profile_days)?;
        writeln!(f, "Freeze stats:      {}", self.freeze_stats)?;
        writeln!(
            f,
            "Planting windows:  {} ({} without a window)",
            self.planting_windows, self.missing_windows
        )?;
        writeln!(f, "Irrigation weeks:  {}", self.irrigation_weeks)?;
        writeln!(f, "Daily temps:       {}", self.daily_temperatures)?;
        write!(f, "Viability rows:    {}", self.viability_rows)
    }
}

/// One complete generation of derived tables.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_date: NaiveDate,
    pub climatology: Vec<ClimatologicalDay>,
    pub profile: Vec<ClimateProfileDay>,
    pub freeze_stats: Vec<FreezeStats>,
    pub planting_windows: Vec<PlantingWindow>,
    pub missing_windows: Vec<MissingWindow>,
    pub irrigation_weeks: Vec<IrrigationWeek>,
    pub daily_temperatures: Vec<DailyTemperature>,
    pub viability: Vec<PlantViability>,
    pub summary: RunSummary,
}

/// Evaluates the derived tables in dependency order:
/// calendar, then freeze statistics and climatology, then planting windows.
/// Irrigation, temperature bands and viability only read the forecast and run last.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    calendar: CanonicalCalendar,
    today: NaiveDate,
}

impl Pipeline {
    pub fn new(reference_year: i32, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            calendar: CanonicalCalendar::new(reference_year)?,
            today,
        })
    }

    /// Compute every derived table. Only an invalid plant list is an error;
    /// data gaps come back as absent rows.
    pub fn run(&self, inputs: &PipelineInputs) -> Result<PipelineOutput> {
        validate_plant_list(&inputs.plants)?;

        tracing::info!(
            reference_year = self.calendar.reference_year(),
            historical = inputs.historical.len(),
            forecast = inputs.forecast.len(),
            sun_times = inputs.sun_times.len(),
            plants = inputs.plants.len(),
            "Starting pipeline run"
        );

        let off_calendar = inputs
            .sun_times
            .iter()
            .filter(|s| self.calendar.day_of(s.date).is_none())
            .count();
        if off_calendar > 0 {
            tracing::warn!(
                rows = off_calendar,
                reference_year = self.calendar.reference_year(),
                "Sun times outside the reference year will not match any climatology day"
            );
        }

        let freeze_stats = freeze::freeze_stats(&self.calendar, &inputs.historical);
        let climatology = climatology::aggregate_climatology(&self.calendar, &inputs.historical);
        let profile = climatology::join_sun_times(&climatology, &inputs.sun_times);
        let profiles = climatology::profiles_by_city(&profile);

        let groups = planting::group_plants(&inputs.plants);
        let outcome = planting::solve_all(&groups, &freeze_stats, &profiles);

        let irrigation_weeks = irrigation::classify_weeks(&inputs.forecast);
        let daily_temperatures = temperature_bands::daily_temperatures(&inputs.forecast);
        let viability = viability::rank_plants(&inputs.plants, &inputs.forecast, self.today);

        let cities: BTreeSet<&str> = inputs
            .historical
            .iter()
            .chain(inputs.forecast.iter())
            .map(|o| o.city.as_str())
            .collect();

        let summary = RunSummary {
            reference_year: self.calendar.reference_year(),
            cities: cities.len(),
            plant_groups: groups.len(),
            climatology_days: climatology.len(),
            profile_days: profile.len(),
            freeze_stats: freeze_stats.len(),
            planting_windows: outcome.windows.len(),
            missing_windows: outcome.missing.len(),
            irrigation_weeks: irrigation_weeks.len(),
            viability_rows: viability.len(),
            daily_temperatures: daily_temperatures.len(),
        };

        if summary.missing_windows > 0 {
            tracing::info!(
                missing = summary.missing_windows,
                "Some city and plant group pairs have no planting window"
            );
        }
        tracing::info!(
            windows = summary.planting_windows,
            irrigation_weeks = summary.irrigation_weeks,
            viability = summary.viability_rows,
            "Pipeline run complete"
        );

        Ok(PipelineOutput {
            run_date: self.today,
            climatology,
            profile,
            freeze_stats,
            planting_windows: outcome.windows,
            missing_windows: outcome.missing,
            irrigation_weeks,
            daily_temperatures,
            viability,
            summary,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sunnydale_inputs;
    use super::*;
    use crate::error::GardenCalError;
    use crate::logic::planting::NoWindowReason;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn sunnydale_end_to_end() {
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        let output = pipeline.run(&sunnydale_inputs()).unwrap();

        let stats = &output.freeze_stats[0];
        assert_eq!(stats.avg_last_freeze_all_time, Some(date(4, 10)));
        assert_eq!(stats.avg_first_freeze_all_time, None);

        assert_eq!(output.planting_windows.len(), 1);
        let w = &output.planting_windows[0];
        assert_eq!(w.harvest_type, "Direct Sow");
        assert_eq!(w.outdoor_start, date(4, 20));
        assert_eq!(w.planting_start, date(4, 20));
        assert_eq!(w.planting_end, date(6, 19));

        assert_eq!(output.missing_windows.len(), 1);
        assert_eq!(output.missing_windows[0].reason, NoWindowReason::SoilNeverWarm);
    }

    #[test]
    fn summary_counts_rows() {
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        let output = pipeline.run(&sunnydale_inputs()).unwrap();
        let s = &output.summary;

        assert_eq!(s.reference_year, 2025);
        assert_eq!(s.cities, 1);
        assert_eq!(s.plant_groups, 2);
        assert_eq!(s.climatology_days, 365);
        assert_eq!(s.profile_days, 365);
        assert_eq!(s.planting_windows, 1);
        assert_eq!(s.missing_windows, 1);
        assert_eq!(s.irrigation_weeks, 2);
        assert_eq!(s.viability_rows, 2);
        assert_eq!(s.daily_temperatures, 14);
    }

    #[test]
    fn forecast_feeds_irrigation_and_viability() {
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        let output = pipeline.run(&sunnydale_inputs()).unwrap();

        let week = &output.irrigation_weeks[0];
        assert_eq!(week.week_start, date(6, 2));
        assert!((week.total_rainfall - 0.7).abs() < 1e-9);

        let squash = output
            .viability
            .iter()
            .find(|v| v.common_name == "Squash")
            .unwrap();
        assert_eq!(squash.viable_days, 7);

        // highs of 72 and lows of 50 average 61.0
        let first_day = &output.daily_temperatures[0];
        assert_eq!(first_day.date, date(6, 2));
        assert_eq!(first_day.temp_avg, 61.0);
        assert_eq!(first_day.status, crate::models::PlantingStatus::Tomatoes);
        assert!(squash.good_week);
        assert_eq!(output.viability[0].common_name, "Squash");
    }

    #[test]
    fn empty_inputs_are_not_an_error() {
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        let output = pipeline.run(&PipelineInputs::default()).unwrap();
        assert!(output.planting_windows.is_empty());
        assert_eq!(output.summary.cities, 0);
    }

    #[test]
    fn invalid_plant_aborts_before_computing() {
        let mut inputs = sunnydale_inputs();
        inputs.plants[0].min_viable_temp_f = 120.0;
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        assert!(matches!(
            pipeline.run(&inputs),
            Err(GardenCalError::InvalidPlant { .. })
        ));
    }

    #[test]
    fn repeated_plant_name_is_rejected_before_publish() {
        let mut inputs = sunnydale_inputs();
        let mut fruit = inputs.plants[0].clone();
        fruit.harvest_type = "Fruit".into();
        inputs.plants.push(fruit);

        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        match pipeline.run(&inputs) {
            Err(GardenCalError::InvalidPlant { plant, reason }) => {
                assert_eq!(plant, "Squash");
                assert!(reason.contains("more than once"));
            }
            other => panic!("expected InvalidPlant, got {:?}", other.map(|o| o.summary)),
        }
    }

    #[test]
    fn results_do_not_depend_on_input_order() {
        let pipeline = Pipeline::new(2025, date(6, 2)).unwrap();
        let inputs = sunnydale_inputs();
        let mut reversed = inputs.clone();
        reversed.historical.reverse();
        reversed.sun_times.reverse();
        reversed.forecast.reverse();

        let a = pipeline.run(&inputs).unwrap();
        let b = pipeline.run(&reversed).unwrap();
        assert_eq!(a.freeze_stats, b.freeze_stats);
        assert_eq!(a.climatology, b.climatology);
        assert_eq!(a.planting_windows, b.planting_windows);
        assert_eq!(a.irrigation_weeks, b.irrigation_weeks);
        assert_eq!(a.daily_temperatures, b.daily_temperatures);
    }
}
