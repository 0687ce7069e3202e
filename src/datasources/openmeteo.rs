use super::retry::{get_with_retry, RetryPolicy};
use crate::config::{CityConfig, IngestConfig};
use crate::error::{GardenCalError, Result};
use crate::models::DailyObservation;
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const RECENT_DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum";
const HISTORICAL_DAILY_FIELDS: &str = "temperature_2m_min,temperature_2m_max,soil_temperature_0_to_7cm_mean,soil_temperature_7_to_28cm_mean";

/// Open-Meteo forecast and archive client.
pub struct OpenMeteoClient {
    client: reqwest::Client,
    retry: RetryPolicy,
    forecast_url: String,
    archive_url: String,
    timezone: String,
    past_days: u32,
    forecast_days: u32,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    daily: OmDaily,
}

#[derive(Debug, Default, Deserialize)]
struct OmDaily {
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    temperature_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    soil_temperature_0_to_7cm_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    soil_temperature_7_to_28cm_mean: Option<Vec<Option<f64>>>,
}

impl OmDaily {
    /// Turn the column arrays into one observation per day. Columns the
    /// request did not ask for are left `None`; a column whose length does
    /// not match `time` is rejected.
    fn into_observations(self, city: &str) -> Result<Vec<DailyObservation>> {
        let days = self.time.len();
        let column = |name: &str, values: Option<Vec<Option<f64>>>| -> Result<Vec<Option<f64>>> {
            match values {
                None => Ok(vec![None; days]),
                Some(v) if v.len() == days => Ok(v),
                Some(v) => Err(GardenCalError::InvalidData(format!(
                    "Open-Meteo {} has {} values for {} days",
                    name,
                    v.len(),
                    days
                ))),
            }
        };

        let temp_max = column("temperature_2m_max", self.temperature_2m_max)?;
        let temp_min = column("temperature_2m_min", self.temperature_2m_min)?;
        let precipitation = column("precipitation_sum", self.precipitation_sum)?;
        let soil_shallow = column(
            "soil_temperature_0_to_7cm_mean",
            self.soil_temperature_0_to_7cm_mean,
        )?;
        let soil_deep = column(
            "soil_temperature_7_to_28cm_mean",
            self.soil_temperature_7_to_28cm_mean,
        )?;

        Ok(self
            .time
            .into_iter()
            .enumerate()
            .map(|(i, date)| DailyObservation {
                temp_max: temp_max[i],
                temp_min: temp_min[i],
                precipitation: precipitation[i],
                soil_temp_shallow: soil_shallow[i],
                soil_temp_deep: soil_deep[i],
                ..DailyObservation::new(city, date)
            })
            .collect())
    }
}

impl OpenMeteoClient {
    pub fn new(ingest: &IngestConfig, timezone: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ingest.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            retry: ingest.retry_policy(),
            forecast_url: ingest.forecast_url.clone(),
            archive_url: ingest.archive_url.clone(),
            timezone: timezone.to_string(),
            past_days: ingest.past_days,
            forecast_days: ingest.forecast_days,
            api_key: ingest.open_meteo_api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn build_url(&self, base: &str, mut params: Vec<(&str, String)>) -> Result<Url> {
        params.push(("temperature_unit", "fahrenheit".into()));
        params.push(("timezone", self.timezone.clone()));
        if let Some(ref key) = self.api_key {
            params.push(("apikey", key.clone()));
        }
        Url::parse_with_params(base, &params)
            .map_err(|e| GardenCalError::Config(format!("Invalid Open-Meteo URL {}: {}", base, e)))
    }

    /// Trailing days plus the forecast, with precipitation in inches.
    pub fn recent_url(&self, city: &CityConfig) -> Result<Url> {
        self.build_url(
            &self.forecast_url,
            vec![
                ("latitude", city.latitude.to_string()),
                ("longitude", city.longitude.to_string()),
                ("daily", RECENT_DAILY_FIELDS.into()),
                ("precipitation_unit", "inch".into()),
                ("past_days", self.past_days.to_string()),
                ("forecast_days", self.forecast_days.to_string()),
            ],
        )
    }

    pub fn historical_url(&self, city: &CityConfig, start: NaiveDate, end: NaiveDate) -> Result<Url> {
        self.build_url(
            &self.archive_url,
            vec![
                ("latitude", city.latitude.to_string()),
                ("longitude", city.longitude.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", HISTORICAL_DAILY_FIELDS.into()),
            ],
        )
    }

    async fn fetch_daily(&self, url: Url, city: &CityConfig) -> Result<Vec<DailyObservation>> {
        let source = format!("Open-Meteo ({})", city.name);
        let response = get_with_retry(&self.client, url.as_str(), self.retry, &source).await?;

        let body: OmResponse = response.json().await.map_err(|e| {
            GardenCalError::DataSourceUnavailable(format!(
                "Failed to parse {} response: {}",
                source, e
            ))
        })?;

        body.daily.into_observations(&city.name)
    }

    pub async fn fetch_recent(&self, city: &CityConfig) -> Result<Vec<DailyObservation>> {
        let url = self.recent_url(city)?;
        let rows = self.fetch_daily(url, city).await?;
        tracing::debug!(city = %city.name, rows = rows.len(), "Fetched recent weather");
        Ok(rows)
    }

    pub async fn fetch_historical(
        &self,
        city: &CityConfig,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>> {
        let url = self.historical_url(city, start, end)?;
        let rows = self.fetch_daily(url, city).await?;
        tracing::debug!(city = %city.name, rows = rows.len(), "Fetched historical weather");
        Ok(rows)
    }

    /// Single-attempt reachability probe.
    pub async fn test_connection(&self, city: &CityConfig) -> Result<bool> {
        let url = self.recent_url(city)?;
        let response = self.client.get(url).send().await.map_err(|e| {
            GardenCalError::DataSourceUnavailable(format!("Open-Meteo: {}", e))
        })?;
        Ok(response.status().is_success())
    }
}
