use crate::error::{GardenCalError, Result};
use crate::models::{validate_plant_list, DailyObservation, PlantSpec, SunTimes};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(GardenCalError::NotFound(format!(
            "input file {}",
            path.display()
        )));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let records = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    tracing::debug!(path = %path.display(), rows = records.len(), "Read input file");
    Ok(records)
}

/// Daily weather rows. Reads both the historical schema (soil temperatures)
/// and the forecast schema (precipitation).
pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<DailyObservation>> {
    read_records(path.as_ref())
}

pub fn read_sun_times(path: impl AsRef<Path>) -> Result<Vec<SunTimes>> {
    read_records(path.as_ref())
}

/// Plant reference rows. Every row is validated and common names must be
/// unique; the first bad plant fails the whole file.
pub fn read_plants(path: impl AsRef<Path>) -> Result<Vec<PlantSpec>> {
    let plants: Vec<PlantSpec> = read_records(path.as_ref())?;
    validate_plant_list(&plants)?;
    Ok(plants)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `records` to `<path>.tmp`, then rename over `path`.
///
/// The existing file is only replaced once the new one is fully written.
pub fn write_records_atomically<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let written = (|| -> Result<()> {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        for record in records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path)?;
    tracing::info!(path = %path.display(), rows = records.len(), "Wrote input file");
    Ok(())
}
