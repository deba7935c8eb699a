//! Temperature statistics by climate zone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::api::{Accumulator, Job};
use crate::config::Granularity;
use crate::distribution::Distribution;
use crate::record::WeatherRecord;
use crate::utils::round2;

/// Group identity: climate zone, optionally composed with the record's season
/// or month depending on the configured granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemperatureKey {
    pub climate_zone: String,
    pub granularity: Granularity,
    pub season: String,
    pub month: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAcc {
    pub temp_max: Distribution,
    pub temp_min: Distribution,
    pub temp_mean: Distribution,
    pub temp_range: Distribution,
    pub countries: BTreeSet<String>,
    pub record_count: u64,
}

impl Accumulator for TemperatureAcc {
    fn merge(&mut self, other: Self) {
        self.temp_max.merge(other.temp_max);
        self.temp_min.merge(other.temp_min);
        self.temp_mean.merge(other.temp_mean);
        self.temp_range.merge(other.temp_range);
        self.countries.extend(other.countries);
        self.record_count += other.record_count;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureSummary {
    pub mean_temperature: f64,
    pub max_temperature_overall: f64,
    pub min_temperature_overall: f64,
    pub avg_daily_max: f64,
    pub avg_daily_min: f64,
    pub avg_daily_range: f64,
    pub temperature_variability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureDistribution {
    pub q1_temp: f64,
    pub median_temp: f64,
    pub q3_temp: f64,
    pub extreme_temp_range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComfortAnalysis {
    pub comfortable_days: u64,
    pub comfort_percentage: f64,
    pub hot_days: u64,
    pub cold_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub climate_zone: String,
    pub analysis_type: Granularity,
    pub season: String,
    pub month: u32,
    pub record_count: u64,
    pub countries: Vec<String>,
    pub temperature_stats: TemperatureSummary,
    pub distribution: TemperatureDistribution,
    pub comfort_analysis: ComfortAnalysis,
}

pub struct TemperatureJob {
    granularity: Granularity,
}

impl TemperatureJob {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }
}

impl Job for TemperatureJob {
    type Key = TemperatureKey;
    type Acc = TemperatureAcc;
    type Stats = TemperatureStats;

    fn classify<F>(&self, record: &WeatherRecord, emit: &mut F)
    where
        F: FnMut(Self::Key, Self::Acc),
    {
        let key = TemperatureKey {
            climate_zone: record.climate_zone.clone(),
            granularity: self.granularity,
            season: match self.granularity {
                Granularity::Seasonal => record.season().as_str().to_string(),
                _ => "all".to_string(),
            },
            month: match self.granularity {
                Granularity::Monthly => record.month(),
                _ => 0,
            },
        };

        let mut acc = TemperatureAcc::default();
        acc.temp_max.observe(record.temperature_max);
        acc.temp_min.observe(record.temperature_min);
        acc.temp_mean.observe(record.temperature_mean());
        acc.temp_range.observe(record.temperature_range());
        acc.countries.insert(record.country.clone());
        acc.record_count = 1;
        emit(key, acc);
    }

    fn finalize(&self, key: &Self::Key, acc: Self::Acc) -> Option<Self::Stats> {
        if acc.record_count == 0 || acc.temp_mean.is_empty() {
            return None;
        }
        let (q1, median, q3) = acc.temp_mean.quartiles();
        let daily_means = acc.temp_mean.values();
        let comfortable_days = daily_means
            .iter()
            .filter(|&&t| (18.0..=26.0).contains(&t))
            .count() as u64;
        let hot_days = daily_means.iter().filter(|&&t| t > 30.0).count() as u64;
        let cold_days = daily_means.iter().filter(|&&t| t < 10.0).count() as u64;
        let n = daily_means.len() as f64;

        Some(TemperatureStats {
            climate_zone: key.climate_zone.clone(),
            analysis_type: key.granularity,
            season: key.season.clone(),
            month: key.month,
            record_count: acc.record_count,
            countries: acc.countries.iter().cloned().collect(),
            temperature_stats: TemperatureSummary {
                mean_temperature: round2(acc.temp_mean.mean()),
                max_temperature_overall: round2(acc.temp_max.max()),
                min_temperature_overall: round2(acc.temp_min.min()),
                avg_daily_max: round2(acc.temp_max.mean()),
                avg_daily_min: round2(acc.temp_min.mean()),
                avg_daily_range: round2(acc.temp_range.mean()),
                temperature_variability: round2(acc.temp_mean.sample_stdev()),
            },
            distribution: TemperatureDistribution {
                q1_temp: round2(q1),
                median_temp: round2(median),
                q3_temp: round2(q3),
                extreme_temp_range: round2(acc.temp_max.max() - acc.temp_min.min()),
            },
            comfort_analysis: ComfortAnalysis {
                comfortable_days,
                comfort_percentage: round2(comfortable_days as f64 / n * 100.0),
                hot_days,
                cold_days,
            },
        })
    }
}
