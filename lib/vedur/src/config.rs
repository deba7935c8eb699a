use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Key composition for the temperature pipeline. Affects only how groups are
/// keyed, never which statistics are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    All,
    Seasonal,
    Monthly,
}

/// Recognized analysis options with their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum daily precipitation (mm) for a day to count as rainy.
    pub min_precipitation: f64,
    /// Minimum daily precipitation (mm) for an extreme precipitation event.
    pub precip_extreme_threshold: f64,
    /// Minimum daily max windspeed (km/h) for an extreme wind event.
    pub wind_extreme_threshold: f64,
    pub granularity: Granularity,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_precipitation: 1.0,
            precip_extreme_threshold: 50.0,
            wind_extreme_threshold: 25.0,
            granularity: Granularity::All,
        }
    }
}
