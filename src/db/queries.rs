use crate::db::Database;
use crate::error::Result;
use crate::logic::pipeline::{PipelineOutput, RunSummary};
use crate::models::{
    DailyTemperature, FreezeStats, GrowingSeason, IrrigationStatus, IrrigationWeek, PlantViability,
    PlantingStatus, PlantingWindow,
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Row, Transaction};
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// One recorded pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub id: i64,
    pub reference_year: i32,
    pub run_date: NaiveDate,
    pub summary: RunSummary,
    pub completed_at: String,
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn fmt_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn conversion_error(
    row: &Row,
    column: &str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

fn date_column(row: &Row, column: &str) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(column)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(row, column, e))
}

fn optional_date_column(row: &Row, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| NaiveDate::parse_from_str(&t, DATE_FORMAT))
        .transpose()
        .map_err(|e| conversion_error(row, column, e))
}

// Publishing

impl Database {
    /// Replace every derived table with `output` as one generation.
    ///
    /// Runs inside a single transaction: if any insert fails the transaction
    /// is rolled back and readers keep seeing the previous generation.
    pub fn publish(&mut self, output: &PipelineOutput) -> Result<i64> {
        let run_id = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            clear_derived_tables(&tx)?;
            insert_climatology(&tx, output)?;
            insert_profile(&tx, output)?;
            insert_freeze_stats(&tx, output)?;
            insert_planting_windows(&tx, output)?;
            insert_irrigation_weeks(&tx, output)?;
            insert_daily_temperatures(&tx, output)?;
            insert_viability(&tx, output)?;

            tx.execute(
                "INSERT INTO pipeline_runs (reference_year, run_date, summary) VALUES (?1, ?2, ?3)",
                params![
                    output.summary.reference_year,
                    fmt_date(output.run_date),
                    serde_json::to_string(&output.summary)?,
                ],
            )?;
            let run_id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(run_id)
        })?;

        tracing::info!(run_id, "Published derived tables");
        Ok(run_id)
    }
}

fn clear_derived_tables(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        r#"
        DELETE FROM climatology_daily;
        DELETE FROM climate_profile;
        DELETE FROM freeze_stats;
        DELETE FROM planting_windows;
        DELETE FROM irrigation_weeks;
        DELETE FROM daily_temperatures;
        DELETE FROM plant_viability;
        "#,
    )?;
    Ok(())
}

fn insert_climatology(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO climatology_daily
            (city, ordinal, canonical_date, avg_min_temp, avg_max_temp,
             avg_shallow_soil_temp, avg_deep_soil_temp, years_observed)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )?;
    for day in &output.climatology {
        stmt.execute(params![
            day.city,
            day.ordinal,
            fmt_date(day.canonical_date),
            day.avg_min_temp,
            day.avg_max_temp,
            day.avg_shallow_soil_temp,
            day.avg_deep_soil_temp,
            day.years_observed,
        ])?;
    }
    Ok(())
}

fn insert_profile(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO climate_profile
            (city, canonical_date, ordinal, avg_min_temp, avg_max_temp,
             avg_shallow_soil_temp, avg_deep_soil_temp, morning_twilight, sunrise,
             solar_noon, sunset, evening_twilight, day_length_secs)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )?;
    for day in &output.profile {
        let c = &day.climate;
        let s = &day.sun;
        stmt.execute(params![
            c.city,
            fmt_date(c.canonical_date),
            c.ordinal,
            c.avg_min_temp,
            c.avg_max_temp,
            c.avg_shallow_soil_temp,
            c.avg_deep_soil_temp,
            fmt_time(s.morning_twilight),
            fmt_time(s.sunrise),
            s.solar_noon.map(fmt_time),
            fmt_time(s.sunset),
            fmt_time(s.evening_twilight),
            s.day_length_secs,
        ])?;
    }
    Ok(())
}

fn insert_freeze_stats(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO freeze_stats
            (city, avg_last_freeze_all_time, avg_last_freeze_10y, avg_last_freeze_5y,
             avg_first_freeze_all_time, avg_first_freeze_10y, avg_first_freeze_5y)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for stats in &output.freeze_stats {
        stmt.execute(params![
            stats.city,
            stats.avg_last_freeze_all_time.map(fmt_date),
            stats.avg_last_freeze_10y.map(fmt_date),
            stats.avg_last_freeze_5y.map(fmt_date),
            stats.avg_first_freeze_all_time.map(fmt_date),
            stats.avg_first_freeze_10y.map(fmt_date),
            stats.avg_first_freeze_5y.map(fmt_date),
        ])?;
    }
    Ok(())
}

fn insert_planting_windows(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO planting_windows
            (city, growing_season, harvest_type, planting_start, outdoor_start,
             planting_end, planting_range_days)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for w in &output.planting_windows {
        stmt.execute(params![
            w.city,
            w.growing_season.as_str(),
            w.harvest_type,
            fmt_date(w.planting_start),
            fmt_date(w.outdoor_start),
            fmt_date(w.planting_end),
            w.planting_range_days,
        ])?;
    }
    Ok(())
}

fn insert_irrigation_weeks(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO irrigation_weeks
            (city, week_start, total_rainfall, rainfall_needed, surplus_deficit,
             status, days_reported)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for week in &output.irrigation_weeks {
        stmt.execute(params![
            week.city,
            fmt_date(week.week_start),
            week.total_rainfall,
            week.rainfall_needed,
            week.surplus_deficit,
            week.status.as_str(),
            week.days_reported,
        ])?;
    }
    Ok(())
}

fn insert_daily_temperatures(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO daily_temperatures
            (city, date, temp_avg, temp_max, temp_min, precipitation, planting_status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for day in &output.daily_temperatures {
        stmt.execute(params![
            day.city,
            fmt_date(day.date),
            day.temp_avg,
            day.temp_max,
            day.temp_min,
            day.precipitation,
            day.status.as_str(),
        ])?;
    }
    Ok(())
}

fn insert_viability(tx: &Transaction, output: &PipelineOutput) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO plant_viability
            (city, common_name, viable_days, days_scored, good_week)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )?;
    for v in &output.viability {
        stmt.execute(params![
            v.city,
            v.common_name,
            v.viable_days,
            v.days_scored,
            v.good_week,
        ])?;
    }
    Ok(())
}

// Read queries

impl Database {
    /// Every city with published freeze statistics or forecast-derived rows.
    pub fn cities(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT city FROM freeze_stats
                UNION
                SELECT city FROM irrigation_weeks
                UNION
                SELECT city FROM daily_temperatures
                ORDER BY city
                "#,
            )?;
            let cities = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(cities)
        })
    }

    pub fn planting_windows_for_city(&self, city: &str) -> Result<Vec<PlantingWindow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM planting_windows
                WHERE city = ?1
                ORDER BY planting_start, growing_season, harvest_type
                "#,
            )?;
            let windows = stmt
                .query_map([city], row_to_planting_window)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(windows)
        })
    }

    pub fn freeze_stats_for_city(&self, city: &str) -> Result<Option<FreezeStats>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM freeze_stats WHERE city = ?1",
                [city],
                row_to_freeze_stats,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn irrigation_weeks_for_city(&self, city: &str) -> Result<Vec<IrrigationWeek>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM irrigation_weeks WHERE city = ?1 ORDER BY week_start",
            )?;
            let weeks = stmt
                .query_map([city], row_to_irrigation_week)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(weeks)
        })
    }

    /// Banded days for `city` on or after `from`, in date order.
    pub fn daily_temperatures_for_city(
        &self,
        city: &str,
        from: NaiveDate,
    ) -> Result<Vec<DailyTemperature>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM daily_temperatures WHERE city = ?1 AND date >= ?2 ORDER BY date",
            )?;
            let days = stmt
                .query_map(params![city, fmt_date(from)], row_to_daily_temperature)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(days)
        })
    }

    pub fn viability_for_city(&self, city: &str) -> Result<Vec<PlantViability>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM plant_viability
                WHERE city = ?1
                ORDER BY viable_days DESC, common_name
                "#,
            )?;
            let rows = stmt
                .query_map([city], row_to_viability)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn latest_run(&self) -> Result<Option<PipelineRun>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM pipeline_runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_pipeline_run,
            )
            .optional()
            .map_err(Into::into)
        })
    }
}

fn row_to_planting_window(row: &Row) -> rusqlite::Result<PlantingWindow> {
    let season_str: String = row.get("growing_season")?;
    let growing_season = GrowingSeason::from_str(&season_str).ok_or_else(|| {
        conversion_error(
            row,
            "growing_season",
            crate::error::GardenCalError::InvalidData(format!(
                "unknown growing_season '{}'",
                season_str
            )),
        )
    })?;

    Ok(PlantingWindow {
        city: row.get("city")?,
        growing_season,
        harvest_type: row.get("harvest_type")?,
        planting_start: date_column(row, "planting_start")?,
        outdoor_start: date_column(row, "outdoor_start")?,
        planting_end: date_column(row, "planting_end")?,
        planting_range_days: row.get("planting_range_days")?,
    })
}

fn row_to_freeze_stats(row: &Row) -> rusqlite::Result<FreezeStats> {
    Ok(FreezeStats {
        city: row.get("city")?,
        avg_last_freeze_all_time: optional_date_column(row, "avg_last_freeze_all_time")?,
        avg_last_freeze_10y: optional_date_column(row, "avg_last_freeze_10y")?,
        avg_last_freeze_5y: optional_date_column(row, "avg_last_freeze_5y")?,
        avg_first_freeze_all_time: optional_date_column(row, "avg_first_freeze_all_time")?,
        avg_first_freeze_10y: optional_date_column(row, "avg_first_freeze_10y")?,
        avg_first_freeze_5y: optional_date_column(row, "avg_first_freeze_5y")?,
    })
}

fn row_to_irrigation_week(row: &Row) -> rusqlite::Result<IrrigationWeek> {
    let total_rainfall: f64 = row.get("total_rainfall")?;
    let status_str: String = row.get("status")?;
    let status = IrrigationStatus::from_str(&status_str).unwrap_or_else(|| {
        warn!(
            status = %status_str,
            "Unknown irrigation status in database, reclassifying from rainfall"
        );
        IrrigationStatus::classify(total_rainfall)
    });

    Ok(IrrigationWeek {
        city: row.get("city")?,
        week_start: date_column(row, "week_start")?,
        total_rainfall,
        rainfall_needed: row.get("rainfall_needed")?,
        surplus_deficit: row.get("surplus_deficit")?,
        status,
        days_reported: row.get("days_reported")?,
    })
}

fn row_to_daily_temperature(row: &Row) -> rusqlite::Result<DailyTemperature> {
    let temp_avg: f64 = row.get("temp_avg")?;
    let status_str: String = row.get("planting_status")?;
    let status = PlantingStatus::from_str(&status_str).unwrap_or_else(|| {
        warn!(
            status = %status_str,
            "Unknown planting status in database, reclassifying from average"
        );
        PlantingStatus::classify(temp_avg)
    });

    Ok(DailyTemperature {
        city: row.get("city")?,
        date: date_column(row, "date")?,
        temp_avg,
        temp_max: row.get("temp_max")?,
        temp_min: row.get("temp_min")?,
        precipitation: row.get("precipitation")?,
        status,
    })
}

fn row_to_viability(row: &Row) -> rusqlite::Result<PlantViability> {
    Ok(PlantViability {
        city: row.get("city")?,
        common_name: row.get("common_name")?,
        viable_days: row.get("viable_days")?,
        days_scored: row.get("days_scored")?,
        good_week: row.get("good_week")?,
    })
}

fn row_to_pipeline_run(row: &Row) -> rusqlite::Result<PipelineRun> {
    let summary_json: String = row.get("summary")?;
    let summary: RunSummary = serde_json::from_str(&summary_json).unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable run summary in database");
        RunSummary::default()
    });

    Ok(PipelineRun {
        id: row.get("id")?,
        reference_year: row.get("reference_year")?,
        run_date: date_column(row, "run_date")?,
        summary,
        completed_at: row.get("completed_at")?,
    })
}

trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pipeline::fixtures::sunnydale_inputs;
    use crate::logic::pipeline::Pipeline;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn sunnydale_output() -> PipelineOutput {
        Pipeline::new(2025, date(6, 2))
            .unwrap()
            .run(&sunnydale_inputs())
            .unwrap()
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
    }

    #[test]
    fn publish_then_read_back() {
        let mut db = Database::open_in_memory().unwrap();
        let output = sunnydale_output();
        db.publish(&output).unwrap();

        assert_eq!(count(&db, "climatology_daily"), 365);
        assert_eq!(count(&db, "climate_profile"), 365);
        assert_eq!(db.cities().unwrap(), vec!["Sunnydale".to_string()]);

        let windows = db.planting_windows_for_city("Sunnydale").unwrap();
        assert_eq!(windows, output.planting_windows);

        let stats = db.freeze_stats_for_city("Sunnydale").unwrap().unwrap();
        assert_eq!(stats.avg_last_freeze_all_time, Some(date(4, 10)));
        assert_eq!(stats.avg_first_freeze_all_time, None);

        let weeks = db.irrigation_weeks_for_city("Sunnydale").unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].status, output.irrigation_weeks[0].status);

        let viability = db.viability_for_city("Sunnydale").unwrap();
        assert_eq!(viability[0].common_name, "Squash");
        assert!(viability[0].good_week);

        let run = db.latest_run().unwrap().unwrap();
        assert_eq!(run.reference_year, 2025);
        assert_eq!(run.run_date, date(6, 2));
        assert_eq!(run.summary, output.summary);
    }

    #[test]
    fn daily_temperatures_read_back_from_a_date() {
        let mut db = Database::open_in_memory().unwrap();
        let output = sunnydale_output();
        db.publish(&output).unwrap();

        assert_eq!(count(&db, "daily_temperatures"), 14);
        let all = db.daily_temperatures_for_city("Sunnydale", date(6, 2)).unwrap();
        assert_eq!(all, output.daily_temperatures);

        let later = db.daily_temperatures_for_city("Sunnydale", date(6, 10)).unwrap();
        assert_eq!(later.len(), 6);
        assert_eq!(later[0].date, date(6, 10));
        assert_eq!(later[0].status, PlantingStatus::Tomatoes);
        assert_eq!(later[0].precipitation, Some(0.1));
    }

    #[test]
    fn unknown_planting_status_is_reclassified() {
        let mut db = Database::open_in_memory().unwrap();
        db.publish(&sunnydale_output()).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE daily_temperatures SET planting_status = 'Safe for okra'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let days = db.daily_temperatures_for_city("Sunnydale", date(6, 2)).unwrap();
        assert!(days.iter().all(|d| d.status == PlantingStatus::Tomatoes));
    }

    #[test]
    fn unknown_city_reads_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.planting_windows_for_city("Nowhere").unwrap().is_empty());
        assert!(db.freeze_stats_for_city("Nowhere").unwrap().is_none());
        assert!(db.latest_run().unwrap().is_none());
    }

    #[test]
    fn republish_replaces_previous_generation() {
        let mut db = Database::open_in_memory().unwrap();
        let output = sunnydale_output();
        db.publish(&output).unwrap();

        let mut smaller = output.clone();
        smaller.climatology.truncate(10);
        smaller.profile.truncate(10);
        let second = db.publish(&smaller).unwrap();

        assert_eq!(count(&db, "climatology_daily"), 10);
        assert_eq!(count(&db, "climate_profile"), 10);
        assert_eq!(count(&db, "pipeline_runs"), 2);
        assert_eq!(db.latest_run().unwrap().unwrap().id, second);
    }

    #[test]
    fn failed_publish_keeps_previous_generation() {
        let mut db = Database::open_in_memory().unwrap();
        let output = sunnydale_output();
        let first = db.publish(&output).unwrap();

        // a duplicate key fails partway through the inserts
        let mut broken = output.clone();
        broken.climatology.truncate(5);
        let dup = broken.irrigation_weeks[0].clone();
        broken.irrigation_weeks.push(dup);

        assert!(db.publish(&broken).is_err());

        assert_eq!(count(&db, "climatology_daily"), 365);
        assert_eq!(count(&db, "irrigation_weeks"), 2);
        assert_eq!(
            db.planting_windows_for_city("Sunnydale").unwrap(),
            output.planting_windows
        );
        assert_eq!(db.latest_run().unwrap().unwrap().id, first);
    }

    #[test]
    fn store_rejects_out_of_order_window() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = sunnydale_output();
        let w = &mut output.planting_windows[0];
        w.planting_start = w.planting_end + chrono::Days::new(1);

        assert!(db.publish(&output).is_err());
        assert_eq!(count(&db, "climatology_daily"), 0);
    }

    #[test]
    fn opens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gardencal.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.publish(&sunnydale_output()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.path(), path.as_path());
        assert_eq!(db.planting_windows_for_city("Sunnydale").unwrap().len(), 1);
    }
}
