pub mod api;
pub mod config;
pub mod constants;
pub mod distribution;
pub mod extreme;
pub mod io;
pub mod precipitation;
pub mod record;
pub mod runtime;
pub mod sort;
pub mod stats;
pub mod temperature;
pub mod utils;
pub mod writer;

pub use api::{Accumulator, Job};
pub use config::{AnalysisConfig, Granularity};
pub use record::{Season, WeatherRecord};
pub use runtime::JobRuntime;
pub use stats::JobSummary;
