use crate::config::{CityConfig, Config, InputsConfig};
use crate::datasources::{csv_files, OpenMeteoClient, SunTimesClient};
use crate::error::{GardenCalError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    Recent,
    Historical,
    SunTimes,
}

impl IngestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestKind::Recent => "recent weather",
            IngestKind::Historical => "historical weather",
            IngestKind::SunTimes => "sun times",
        }
    }
}

impl std::fmt::Display for IngestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one ingest across every configured city.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub kind: IngestKind,
    pub path: PathBuf,
    pub rows: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl IngestReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Merge per-city fetch results. Failed cities are logged and skipped;
/// if none succeeded the whole ingest fails and nothing should be written.
pub fn combine_city_results<T>(
    kind: IngestKind,
    results: Vec<(String, Result<Vec<T>>)>,
) -> Result<(Vec<T>, Vec<String>, Vec<String>)> {
    let mut rows = Vec::new();
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    let mut last_error = None;

    for (city, result) in results {
        match result {
            Ok(mut city_rows) => {
                rows.append(&mut city_rows);
                succeeded.push(city);
            }
            Err(e) => {
                tracing::warn!(city = %city, kind = %kind, error = %e, "City fetch failed, skipping");
                last_error = Some(e.to_string());
                failed.push(city);
            }
        }
    }

    if succeeded.is_empty() {
        return Err(GardenCalError::DataSourceUnavailable(format!(
            "every city failed to fetch {}{}",
            kind,
            last_error
                .map(|e| format!(" (last error: {})", e))
                .unwrap_or_default()
        )));
    }

    Ok((rows, succeeded, failed))
}

/// Refreshes the CSV inputs from the external providers.
pub struct IngestService {
    config: Config,
    inputs: InputsConfig,
    open_meteo: OpenMeteoClient,
    sun_times: SunTimesClient,
}

impl IngestService {
    pub fn new(config: Config, data_dir: &Path) -> Result<Self> {
        let open_meteo = OpenMeteoClient::new(&config.ingest, &config.timezone)?;
        let sun_times = SunTimesClient::new(&config.ingest, &config.timezone)?;
        let inputs = config.inputs.resolve(data_dir);

        Ok(Self {
            config,
            inputs,
            open_meteo,
            sun_times,
        })
    }

    pub fn inputs(&self) -> &InputsConfig {
        &self.inputs
    }

    fn cities(&self) -> &[CityConfig] {
        &self.config.cities
    }

    async fn pause_between_cities(&self, index: usize) {
        let pause = self.config.ingest.city_pause();
        if index > 0 && !pause.is_zero() {
            tracing::debug!(secs = pause.as_secs(), "Pausing between cities");
            tokio::time::sleep(pause).await;
        }
    }

    fn write<T: Serialize>(
        &self,
        kind: IngestKind,
        path: &Path,
        results: Vec<(String, Result<Vec<T>>)>,
    ) -> Result<IngestReport> {
        let (rows, succeeded, failed) = combine_city_results(kind, results)?;
        csv_files::write_records_atomically(path, &rows)?;

        let report = IngestReport {
            kind,
            path: path.to_path_buf(),
            rows: rows.len(),
            succeeded,
            failed,
        };
        tracing::info!(
            kind = %kind,
            rows = report.rows,
            failed = report.failed.len(),
            "Ingest complete"
        );
        Ok(report)
    }

    /// Trailing and forecast days for every city, written to the forecast input.
    pub async fn ingest_recent(&self) -> Result<IngestReport> {
        let mut results = Vec::with_capacity(self.cities().len());
        for city in self.cities() {
            let fetched = self.open_meteo.fetch_recent(city).await;
            results.push((city.name.clone(), fetched));
        }
        self.write(IngestKind::Recent, &self.inputs.forecast, results)
    }

    /// Daily archive from the configured start date through `end`.
    pub async fn ingest_historical(&self, end: NaiveDate) -> Result<IngestReport> {
        let start = self.config.ingest.historical_start;
        if start > end {
            return Err(GardenCalError::Config(format!(
                "ingest.historical_start {} is after {}",
                start, end
            )));
        }

        let mut results = Vec::with_capacity(self.cities().len());
        for (i, city) in self.cities().iter().enumerate() {
            self.pause_between_cities(i).await;
            let fetched = self.open_meteo.fetch_historical(city, start, end).await;
            results.push((city.name.clone(), fetched));
        }
        self.write(IngestKind::Historical, &self.inputs.historical, results)
    }

    /// Sun events for every day of `year`.
    pub async fn ingest_sun_times(&self, year: i32) -> Result<IngestReport> {
        let mut results = Vec::with_capacity(self.cities().len());
        for (i, city) in self.cities().iter().enumerate() {
            self.pause_between_cities(i).await;
            let fetched = self.sun_times.fetch_year(city, year).await;
            results.push((city.name.clone(), fetched));
        }
        self.write(IngestKind::SunTimes, &self.inputs.sun_times, results)
    }

    /// Probe Open-Meteo with the first configured city.
    pub async fn check_connection(&self) -> bool {
        match self.cities().first() {
            Some(city) => self
                .open_meteo
                .test_connection(city)
                .await
                .unwrap_or(false),
            None => false,
        }
    }
}
