use crate::datasources::retry::RetryPolicy;
use crate::error::{GardenCalError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DATA_DIR_ENV: &str = "GARDENCAL_DATA_DIR";
const DB_FILE_NAME: &str = "gardencal.db";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CityConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CityConfig {
    fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

fn default_cities() -> Vec<CityConfig> {
    vec![
        CityConfig::new("Portland", 45.5051, -122.6750),
        CityConfig::new("Eugene", 44.0521, -123.0868),
        CityConfig::new("Medford", 42.3265, -122.8756),
        CityConfig::new("Bend", 44.0582, -121.3153),
        CityConfig::new("Astoria", 46.1879, -123.8313),
        CityConfig::new("Hood River", 45.7054, -121.5217),
    ]
}

fn default_timezone() -> String {
    "America/Los_Angeles".into()
}

/// CSV inputs. Relative paths are resolved against the data directory.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputsConfig {
    pub historical: PathBuf,
    pub forecast: PathBuf,
    pub sun_times: PathBuf,
    pub plants: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            historical: PathBuf::from("historical_weather.csv"),
            forecast: PathBuf::from("forecast.csv"),
            sun_times: PathBuf::from("sun_times.csv"),
            plants: PathBuf::from("plants.csv"),
        }
    }
}

impl InputsConfig {
    pub fn resolve(&self, data_dir: &Path) -> InputsConfig {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                data_dir.join(p)
            }
        };
        InputsConfig {
            historical: join(&self.historical),
            forecast: join(&self.forecast),
            sun_times: join(&self.sun_times),
            plants: join(&self.plants),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub historical_start: NaiveDate,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    /// Pause between cities, for provider rate limits.
    pub city_pause_secs: u64,
    pub timeout_secs: u64,
    pub past_days: u32,
    pub forecast_days: u32,
    pub forecast_url: String,
    pub archive_url: String,
    pub sun_times_url: String,
    /// Only needed for Open-Meteo's commercial endpoints.
    pub open_meteo_api_key: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            historical_start: NaiveDate::from_ymd_opt(1940, 1, 1).unwrap_or(NaiveDate::MIN),
            max_attempts: 3,
            initial_backoff_ms: 2000,
            city_pause_secs: 60,
            timeout_secs: 30,
            past_days: 30,
            forecast_days: 7,
            forecast_url: "https://api.open-meteo.com/v1/forecast".into(),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".into(),
            sun_times_url: "https://api.sunrisesunset.io/json".into(),
            open_meteo_api_key: None,
        }
    }
}

impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("historical_start", &self.historical_start)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("city_pause_secs", &self.city_pause_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("past_days", &self.past_days)
            .field("forecast_days", &self.forecast_days)
            .field("forecast_url", &self.forecast_url)
            .field("archive_url", &self.archive_url)
            .field("sun_times_url", &self.sun_times_url)
            .field(
                "open_meteo_api_key",
                &self.open_meteo_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl IngestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }

    pub fn city_pause(&self) -> Duration {
        Duration::from_secs(self.city_pause_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Canonical year for climatology; the current year when unset.
    pub reference_year: Option<i32>,
}

impl Config {
    pub fn load(config_override: Option<&PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p.clone(),
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(GardenCalError::Config(format!(
                "Config file not found at {:?}. Run `gardencal init` to set up.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| GardenCalError::Config(format!("Failed to read config: {}", e)))?;

        let config = Self::from_yaml(&config_str)?;
        tracing::debug!(path = %config_path.display(), cities = config.cities.len(), "Loaded config");
        Ok(config)
    }

    /// Parse YAML after `${VAR}` substitution, then validate.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| GardenCalError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            return Err(GardenCalError::Config("No cities configured".into()));
        }

        let mut seen = HashSet::new();
        for city in &self.cities {
            let name = city.name.trim();
            if name.is_empty() {
                return Err(GardenCalError::Config("City with an empty name".into()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(GardenCalError::Config(format!(
                    "City '{}' is listed more than once",
                    name
                )));
            }
            if !(-90.0..=90.0).contains(&city.latitude) {
                return Err(GardenCalError::Config(format!(
                    "{}: latitude {} is out of range",
                    name, city.latitude
                )));
            }
            if !(-180.0..=180.0).contains(&city.longitude) {
                return Err(GardenCalError::Config(format!(
                    "{}: longitude {} is out of range",
                    name, city.longitude
                )));
            }
        }

        if self.timezone.trim().is_empty() {
            return Err(GardenCalError::Config("timezone must not be empty".into()));
        }
        if let Some(year) = self.pipeline.reference_year {
            if !(1900..=9999).contains(&year) {
                return Err(GardenCalError::Config(format!(
                    "pipeline.reference_year {} is out of range",
                    year
                )));
            }
        }

        Ok(())
    }

    pub fn city(&self, name: &str) -> Option<&CityConfig> {
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let default_path = Self::default_config_path()?;
        Ok(default_path)
    }

    /// Default path for writing new config files (~/.config/gardencal/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GardenCalError::Config("Cannot determine config directory".into()))?
            .join("gardencal");
        Ok(config_dir.join("config.yaml"))
    }

    /// Write this config as YAML with a header comment.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| GardenCalError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# gardencal configuration\n# Generated by `gardencal init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(path, content)?;
        Ok(())
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return result,
        };

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| GardenCalError::Config("Cannot determine data directory".into()))?
            .join("gardencal");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    /// SQLite store inside an already resolved data directory.
    pub fn db_file(data_dir: &Path) -> PathBuf {
        data_dir.join(DB_FILE_NAME)
    }

    /// Reference year for a run on `today`.
    pub fn reference_year(&self, today: NaiveDate) -> i32 {
        use chrono::Datelike;
        self.pipeline.reference_year.unwrap_or_else(|| today.year())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cities: default_cities(),
            timezone: default_timezone(),
            inputs: InputsConfig::default(),
            ingest: IngestConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_six_oregon_cities() {
        let config = Config::default();
        assert_eq!(config.cities.len(), 6);
        assert!(config.validate().is_ok());
        assert_eq!(config.city("hood river").map(|c| c.latitude), Some(45.7054));
        assert_eq!(config.timezone, "America/Los_Angeles");
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.cities.len(), 6);
        assert_eq!(config.ingest.max_attempts, 3);
        assert_eq!(config.inputs.plants, PathBuf::from("plants.csv"));
        assert_eq!(config.pipeline.reference_year, None);
    }

    #[test]
    fn parses_sections() {
        let yaml = r#"
cities:
  - name: Sunnydale
    latitude: 37.0
    longitude: -120.5
timezone: America/Denver
inputs:
  plants: /srv/garden/plants.csv
ingest:
  max_attempts: 5
  historical_start: 1990-01-01
pipeline:
  reference_year: 2024
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.cities.len(), 1);
        assert_eq!(config.timezone, "America/Denver");
        assert_eq!(config.ingest.max_attempts, 5);
        assert_eq!(config.ingest.timeout_secs, 30);
        assert_eq!(
            config.ingest.historical_start,
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
        );
        assert_eq!(config.reference_year(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()), 2024);

        let resolved = config.inputs.resolve(Path::new("/data"));
        assert_eq!(resolved.plants, PathBuf::from("/srv/garden/plants.csv"));
        assert_eq!(resolved.forecast, PathBuf::from("/data/forecast.csv"));
    }

    #[test]
    fn example_config_parses() {
        let config = Config::from_yaml(include_str!("../config/config.yaml.example")).unwrap();
        assert_eq!(config.cities, Config::default().cities);
        assert_eq!(config.ingest.city_pause_secs, 60);
        assert_eq!(config.pipeline.reference_year, None);
    }

    #[test]
    fn reference_year_defaults_to_today() {
        let config = Config::default();
        assert_eq!(config.reference_year(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()), 2026);
    }

    #[test]
    fn substitutes_environment_variables() {
        std::env::set_var("GARDENCAL_TEST_API_KEY", "secret-key");
        let yaml = "ingest:\n  open_meteo_api_key: ${GARDENCAL_TEST_API_KEY}\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.ingest.open_meteo_api_key.as_deref(),
            Some("secret-key")
        );

        let debug = format!("{:?}", config.ingest);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn unset_variables_are_left_alone() {
        let out = Config::substitute_env_vars("key: ${GARDENCAL_TEST_SURELY_UNSET_VAR}");
        assert_eq!(out, "key: ${GARDENCAL_TEST_SURELY_UNSET_VAR}");
    }

    #[test]
    fn rejects_bad_city_lists() {
        assert!(matches!(
            Config::from_yaml("cities: []"),
            Err(GardenCalError::Config(_))
        ));

        let dup = "cities:\n  - {name: Bend, latitude: 44.0, longitude: -121.3}\n  - {name: bend, latitude: 44.1, longitude: -121.2}\n";
        assert!(Config::from_yaml(dup).is_err());

        let bad_lat = "cities:\n  - {name: Bend, latitude: 144.0, longitude: -121.3}\n";
        assert!(Config::from_yaml(bad_lat).is_err());

        let bad_lon = "cities:\n  - {name: Bend, latitude: 44.0, longitude: -221.3}\n";
        assert!(Config::from_yaml(bad_lon).is_err());
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        Config::default().write_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.cities, Config::default().cities);
    }

    #[test]
    fn data_dir_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let override_dir = dir.path().join("store");
        let resolved = Config::data_dir(Some(&override_dir)).unwrap();
        assert_eq!(resolved, override_dir);
        assert!(override_dir.exists());
        assert_eq!(Config::db_file(&resolved), override_dir.join("gardencal.db"));
    }
}
