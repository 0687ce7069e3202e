pub mod csv_files;
pub mod openmeteo;
pub mod retry;
pub mod sun_times;

pub use openmeteo::OpenMeteoClient;
pub use sun_times::SunTimesClient;
