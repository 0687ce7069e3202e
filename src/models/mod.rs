pub mod climatology;
pub mod daily_temperature;
pub mod irrigation;
pub mod observation;
pub mod plant;
pub mod planting_window;
pub mod sun_times;
pub mod viability;

pub use climatology::*;
pub use daily_temperature::*;
pub use irrigation::*;
pub use observation::*;
pub use plant::*;
pub use planting_window::*;
pub use sun_times::*;
pub use viability::*;
