use crate::db::Database;
use crate::error::Result;

const MIGRATIONS: &[&str] = &[
    // Migration 1: derived tables
    r#"
    CREATE TABLE IF NOT EXISTS climatology_daily (
        city TEXT NOT NULL,
        ordinal INTEGER NOT NULL CHECK (ordinal BETWEEN 1 AND 366),
        canonical_date TEXT NOT NULL,
        avg_min_temp REAL,
        avg_max_temp REAL,
        avg_shallow_soil_temp REAL,
        avg_deep_soil_temp REAL,
        years_observed INTEGER NOT NULL,
        PRIMARY KEY (city, ordinal)
    );

    CREATE TABLE IF NOT EXISTS climate_profile (
        city TEXT NOT NULL,
        canonical_date TEXT NOT NULL,
        ordinal INTEGER NOT NULL,
        avg_min_temp REAL,
        avg_max_temp REAL,
        avg_shallow_soil_temp REAL,
        avg_deep_soil_temp REAL,
        morning_twilight TEXT NOT NULL,
        sunrise TEXT NOT NULL,
        solar_noon TEXT,
        sunset TEXT NOT NULL,
        evening_twilight TEXT NOT NULL,
        day_length_secs INTEGER NOT NULL,
        PRIMARY KEY (city, canonical_date)
    );

    CREATE TABLE IF NOT EXISTS freeze_stats (
        city TEXT PRIMARY KEY,
        avg_last_freeze_all_time TEXT,
        avg_last_freeze_10y TEXT,
        avg_last_freeze_5y TEXT,
        avg_first_freeze_all_time TEXT,
        avg_first_freeze_10y TEXT,
        avg_first_freeze_5y TEXT
    );

    CREATE TABLE IF NOT EXISTS planting_windows (
        city TEXT NOT NULL,
        growing_season TEXT NOT NULL,
        harvest_type TEXT NOT NULL,
        planting_start TEXT NOT NULL,
        outdoor_start TEXT NOT NULL,
        planting_end TEXT NOT NULL,
        planting_range_days INTEGER NOT NULL,
        PRIMARY KEY (city, growing_season, harvest_type),
        CHECK (planting_start <= outdoor_start AND outdoor_start <= planting_end)
    );

    CREATE TABLE IF NOT EXISTS irrigation_weeks (
        city TEXT NOT NULL,
        week_start TEXT NOT NULL,
        total_rainfall REAL NOT NULL,
        rainfall_needed REAL NOT NULL,
        surplus_deficit REAL NOT NULL,
        status TEXT NOT NULL,
        days_reported INTEGER NOT NULL,
        PRIMARY KEY (city, week_start)
    );

    CREATE TABLE IF NOT EXISTS plant_viability (
        city TEXT NOT NULL,
        common_name TEXT NOT NULL,
        viable_days INTEGER NOT NULL,
        days_scored INTEGER NOT NULL,
        good_week INTEGER NOT NULL,
        PRIMARY KEY (city, common_name)
    );

    CREATE TABLE IF NOT EXISTS pipeline_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reference_year INTEGER NOT NULL,
        run_date TEXT NOT NULL,
        summary TEXT NOT NULL,
        completed_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: lookup indexes for report queries
    r#"
    CREATE INDEX IF NOT EXISTS idx_climate_profile_city
        ON climate_profile(city);
    CREATE INDEX IF NOT EXISTS idx_irrigation_weeks_week_start
        ON irrigation_weeks(week_start);
    CREATE INDEX IF NOT EXISTS idx_plant_viability_city
        ON plant_viability(city, viable_days);
    "#,
    // Migration 3: daily temperature bands from the recent and forecast days
    r#"
    CREATE TABLE IF NOT EXISTS daily_temperatures (
        city TEXT NOT NULL,
        date TEXT NOT NULL,
        temp_avg REAL NOT NULL,
        temp_max REAL NOT NULL,
        temp_min REAL NOT NULL,
        precipitation REAL,
        planting_status TEXT NOT NULL,
        PRIMARY KEY (city, date)
    );
    "#,
];

pub fn run(db: &mut Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                tracing::info!(version, "Applying migration");
                let tx = conn.transaction()?;
                tx.execute_batch(migration)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version) VALUES (?1)",
                    [version],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_once() {
        let mut db = Database::open_in_memory().unwrap();
        run(&mut db).unwrap();

        let versions: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(versions, MIGRATIONS.len() as i64);
    }

    #[test]
    fn rerun_applies_nothing_new() {
        let mut db = Database::open_in_memory().unwrap();
        run(&mut db).unwrap();
        run(&mut db).unwrap();

        let latest: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(latest, MIGRATIONS.len() as i64);

        let banded: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'daily_temperatures'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(banded, 1);
    }
}
