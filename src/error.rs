use thiserror::Error;

#[derive(Error, Debug)]
pub enum GardenCalError {
    /// The derived-table store failed to open, migrate or publish.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// An input file could not be parsed into typed rows.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A weather provider stayed unreachable after retries, or every city failed.
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// A row in the plant list that cannot take part in a run.
    #[error("Invalid plant '{plant}': {reason}")]
    InvalidPlant { plant: String, reason: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GardenCalError {
    pub fn invalid_plant(plant: &str, reason: impl Into<String>) -> Self {
        GardenCalError::InvalidPlant {
            plant: plant.trim().to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GardenCalError>;
