pub mod calculations;
pub mod calendar;
pub mod climatology;
pub mod data_sync;
pub mod freeze;
pub mod irrigation;
pub mod pipeline;
pub mod planting;
pub mod temperature_bands;
pub mod viability;

pub use data_sync::IngestService;
pub use pipeline::{Pipeline, PipelineInputs, RunSummary};
