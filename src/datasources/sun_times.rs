use super::retry::{get_with_retry, RetryPolicy};
use crate::config::{CityConfig, IngestConfig};
use crate::error::{GardenCalError, Result};
use crate::models::{parse_day_length, SunTimes};
use chrono::{NaiveDate, NaiveTime};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// sunrisesunset.io client for a full year of daily sun events.
pub struct SunTimesClient {
    client: reqwest::Client,
    retry: RetryPolicy,
    base_url: String,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct SunResponse {
    results: Vec<SunResult>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SunResult {
    date: NaiveDate,
    nautical_twilight_begin: String,
    sunrise: String,
    #[serde(default)]
    solar_noon: Option<String>,
    sunset: String,
    nautical_twilight_end: String,
    day_length: String,
}

/// Parse a 12-hour clock string such as `5:21:40 AM`.
pub fn parse_clock_12h(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%I:%M:%S %p").ok()
}

impl SunResult {
    fn into_sun_times(self, city: &str) -> Result<SunTimes> {
        let date = self.date;
        let time = |field: &str, value: &str| {
            parse_clock_12h(value).ok_or_else(|| {
                GardenCalError::InvalidData(format!(
                    "{} {}: unreadable {} '{}'",
                    city, date, field, value
                ))
            })
        };

        Ok(SunTimes {
            city: city.to_string(),
            date,
            morning_twilight: time("nautical_twilight_begin", &self.nautical_twilight_begin)?,
            sunrise: time("sunrise", &self.sunrise)?,
            solar_noon: self.solar_noon.as_deref().and_then(parse_clock_12h),
            sunset: time("sunset", &self.sunset)?,
            evening_twilight: time("nautical_twilight_end", &self.nautical_twilight_end)?,
            day_length_secs: parse_day_length(&self.day_length).ok_or_else(|| {
                GardenCalError::InvalidData(format!(
                    "{} {}: unreadable day_length '{}'",
                    city, date, self.day_length
                ))
            })?,
        })
    }
}

impl SunTimesClient {
    pub fn new(ingest: &IngestConfig, timezone: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ingest.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            retry: ingest.retry_policy(),
            base_url: ingest.sun_times_url.clone(),
            timezone: timezone.to_string(),
        })
    }

    pub fn year_url(&self, city: &CityConfig, year: i32) -> Result<Url> {
        let params = [
            ("lat", city.latitude.to_string()),
            ("lng", city.longitude.to_string()),
            ("timezone", self.timezone.clone()),
            ("date_start", format!("{}-01-01", year)),
            ("date_end", format!("{}-12-31", year)),
        ];
        Url::parse_with_params(&self.base_url, &params).map_err(|e| {
            GardenCalError::Config(format!("Invalid sun times URL {}: {}", self.base_url, e))
        })
    }

    /// Every day of `year` for one city.
    pub async fn fetch_year(&self, city: &CityConfig, year: i32) -> Result<Vec<SunTimes>> {
        let url = self.year_url(city, year)?;
        let source = format!("sunrisesunset.io ({})", city.name);
        let response = get_with_retry(&self.client, url.as_str(), self.retry, &source).await?;

        let body: SunResponse = response.json().await.map_err(|e| {
            GardenCalError::DataSourceUnavailable(format!(
                "Failed to parse {} response: {}",
                source, e
            ))
        })?;

        let rows = parse_results(body, &city.name)?;
        tracing::debug!(city = %city.name, year, rows = rows.len(), "Fetched sun times");
        Ok(rows)
    }
}

fn parse_results(body: SunResponse, city: &str) -> Result<Vec<SunTimes>> {
    if let Some(status) = body.status.as_deref().filter(|s| *s != "OK") {
        return Err(GardenCalError::DataSourceUnavailable(format!(
            "sunrisesunset.io ({}) returned status {}",
            city, status
        )));
    }
    body.results
        .into_iter()
        .map(|r| r.into_sun_times(city))
        .collect()
}
