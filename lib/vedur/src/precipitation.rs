//! Precipitation statistics by country.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::api::{Accumulator, Job};
use crate::distribution::Distribution;
use crate::record::WeatherRecord;
use crate::utils::round2;

/// Additive per-bucket sub-aggregate (season, month or year). Only sums and
/// counts are carried so the bucket folds identically under any partitioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketAcc {
    pub total_precip: f64,
    pub days: u64,
}

impl BucketAcc {
    fn observe(&mut self, precip: f64) {
        self.total_precip += precip;
        self.days += 1;
    }

    fn merge(&mut self, other: BucketAcc) {
        self.total_precip += other.total_precip;
        self.days += other.days;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationAcc {
    pub precipitation: Distribution,
    pub rainy_days: u64,
    pub total_days: u64,
    pub seasonal: BTreeMap<String, BucketAcc>,
    pub monthly: BTreeMap<u32, BucketAcc>,
    pub yearly: BTreeMap<i32, BucketAcc>,
    pub climate_zones: BTreeSet<String>,
}

impl Accumulator for PrecipitationAcc {
    fn merge(&mut self, other: Self) {
        self.precipitation.merge(other.precipitation);
        self.rainy_days += other.rainy_days;
        self.total_days += other.total_days;
        for (season, bucket) in other.seasonal {
            self.seasonal.entry(season).or_default().merge(bucket);
        }
        for (month, bucket) in other.monthly {
            self.monthly.entry(month).or_default().merge(bucket);
        }
        for (year, bucket) in other.yearly {
            self.yearly.entry(year).or_default().merge(bucket);
        }
        self.climate_zones.extend(other.climate_zones);
    }
}

/// Mean-daily-precipitation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumidityClass {
    VeryHumid,
    Humid,
    Moderate,
    Arid,
}

impl HumidityClass {
    pub fn from_mean_daily(avg: f64) -> Self {
        if avg > 5.0 {
            HumidityClass::VeryHumid
        } else if avg > 2.0 {
            HumidityClass::Humid
        } else if avg > 0.5 {
            HumidityClass::Moderate
        } else {
            HumidityClass::Arid
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecipitationSummary {
    pub total_precipitation_mm: f64,
    pub average_daily_precipitation: f64,
    pub median_daily_precipitation: f64,
    pub max_daily_precipitation: f64,
    pub humidity_classification: HumidityClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAnalysis {
    pub total_rainy_days: u64,
    pub total_dry_days: u64,
    pub rainy_days_percentage: f64,
    pub avg_precip_on_rainy_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketStats {
    pub total_precipitation: f64,
    pub total_days: u64,
    pub avg_daily_precip: f64,
}

impl BucketStats {
    fn from_acc(acc: &BucketAcc) -> Self {
        Self {
            total_precipitation: round2(acc.total_precip),
            total_days: acc.days,
            avg_daily_precip: round2(acc.total_precip / acc.days as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecipitationStats {
    pub country: String,
    pub climate_zones: Vec<String>,
    pub total_days_analyzed: u64,
    pub precipitation_summary: PrecipitationSummary,
    pub day_analysis: DayAnalysis,
    pub seasonal_analysis: BTreeMap<String, BucketStats>,
    pub monthly_analysis: BTreeMap<String, BucketStats>,
    pub yearly_analysis: BTreeMap<String, BucketStats>,
}

pub struct PrecipitationJob {
    min_precipitation: f64,
}

impl PrecipitationJob {
    pub fn new(min_precipitation: f64) -> Self {
        Self { min_precipitation }
    }
}

impl Job for PrecipitationJob {
    type Key = String;
    type Acc = PrecipitationAcc;
    type Stats = PrecipitationStats;

    fn classify<F>(&self, record: &WeatherRecord, emit: &mut F)
    where
        F: FnMut(Self::Key, Self::Acc),
    {
        let precip = record.precipitation();
        let mut acc = PrecipitationAcc::default();
        acc.precipitation.observe(precip);
        // A day exactly at the threshold counts as rainy.
        if precip >= self.min_precipitation {
            acc.rainy_days = 1;
        }
        acc.total_days = 1;
        acc.seasonal
            .entry(record.season().as_str().to_string())
            .or_default()
            .observe(precip);
        acc.monthly.entry(record.month()).or_default().observe(precip);
        acc.yearly.entry(record.year()).or_default().observe(precip);
        acc.climate_zones.insert(record.climate_zone.clone());
        emit(record.country.clone(), acc);
    }

    fn finalize(&self, key: &Self::Key, acc: Self::Acc) -> Option<Self::Stats> {
        if acc.total_days == 0 || acc.precipitation.is_empty() {
            return None;
        }
        let total = acc.precipitation.sum();
        let avg = acc.precipitation.mean();
        let dry_days = acc.total_days - acc.rainy_days;
        let avg_on_rainy = if acc.rainy_days > 0 {
            total / acc.rainy_days as f64
        } else {
            0.0
        };

        Some(PrecipitationStats {
            country: key.clone(),
            climate_zones: acc.climate_zones.iter().cloned().collect(),
            total_days_analyzed: acc.total_days,
            precipitation_summary: PrecipitationSummary {
                total_precipitation_mm: round2(total),
                average_daily_precipitation: round2(avg),
                median_daily_precipitation: round2(acc.precipitation.median()),
                max_daily_precipitation: round2(acc.precipitation.max()),
                humidity_classification: HumidityClass::from_mean_daily(avg),
            },
            day_analysis: DayAnalysis {
                total_rainy_days: acc.rainy_days,
                total_dry_days: dry_days,
                rainy_days_percentage: round2(acc.rainy_days as f64 / acc.total_days as f64 * 100.0),
                avg_precip_on_rainy_days: round2(avg_on_rainy),
            },
            seasonal_analysis: acc
                .seasonal
                .iter()
                .map(|(season, bucket)| (season.clone(), BucketStats::from_acc(bucket)))
                .collect(),
            monthly_analysis: acc
                .monthly
                .iter()
                .map(|(month, bucket)| (month.to_string(), BucketStats::from_acc(bucket)))
                .collect(),
            yearly_analysis: acc
                .yearly
                .iter()
                .map(|(year, bucket)| (year.to_string(), BucketStats::from_acc(bucket)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Accumulator;
    use chrono::NaiveDate;

    fn record(date: (i32, u32, u32), precip: f64) -> WeatherRecord {
        WeatherRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            location_key: "bogota_co".into(),
            country: "Colombia".into(),
            climate_zone: "tropical_mountain".into(),
            temperature_max: 21.0,
            temperature_min: 10.0,
            temperature_mean: None,
            precipitation_sum: Some(precip),
            windspeed_max: None,
            humidity_max: None,
        }
    }

    fn fold(job: &PrecipitationJob, records: &[WeatherRecord]) -> (String, PrecipitationAcc) {
        let mut acc = PrecipitationAcc::default();
        let mut country = String::new();
        for r in records {
            job.classify(r, &mut |k, a| {
                country = k;
                acc.merge(a);
            });
        }
        (country, acc)
    }

    #[test]
    fn known_value_scenario() {
        let job = PrecipitationJob::new(1.0);
        let records = [
            record((2023, 4, 1), 0.0),
            record((2023, 4, 2), 5.0),
            record((2023, 4, 3), 0.0),
        ];
        let (country, acc) = fold(&job, &records);
        let stats = job.finalize(&country, acc).unwrap();
        assert_eq!(stats.country, "Colombia");
        assert_eq!(stats.total_days_analyzed, 3);
        assert_eq!(stats.precipitation_summary.total_precipitation_mm, 5.0);
        assert_eq!(stats.precipitation_summary.average_daily_precipitation, 1.67);
        assert_eq!(stats.day_analysis.total_rainy_days, 1);
        assert_eq!(stats.day_analysis.total_dry_days, 2);
        assert_eq!(stats.day_analysis.rainy_days_percentage, 33.33);
        assert_eq!(stats.day_analysis.avg_precip_on_rainy_days, 5.0);
        // mean 1.67 mm/day falls in the moderate tier (> 0.5, <= 2)
        assert_eq!(
            stats.precipitation_summary.humidity_classification,
            HumidityClass::Moderate
        );
    }

    #[test]
    fn day_at_threshold_counts_as_rainy() {
        let job = PrecipitationJob::new(1.0);
        let (country, acc) = fold(&job, &[record((2023, 4, 1), 1.0)]);
        let stats = job.finalize(&country, acc).unwrap();
        assert_eq!(stats.day_analysis.total_rainy_days, 1);
    }

    #[test]
    fn seasonal_monthly_yearly_breakdowns() {
        let job = PrecipitationJob::new(1.0);
        let records = [
            record((2022, 12, 30), 10.0), // winter, Dec 2022
            record((2023, 1, 5), 2.0),    // winter, Jan 2023
            record((2023, 7, 5), 0.0),    // summer, Jul 2023
        ];
        let (country, acc) = fold(&job, &records);
        let stats = job.finalize(&country, acc).unwrap();

        let winter = &stats.seasonal_analysis["winter"];
        assert_eq!(winter.total_precipitation, 12.0);
        assert_eq!(winter.total_days, 2);
        assert_eq!(winter.avg_daily_precip, 6.0);
        assert_eq!(stats.seasonal_analysis["summer"].total_days, 1);

        assert_eq!(stats.monthly_analysis["12"].total_precipitation, 10.0);
        assert_eq!(stats.monthly_analysis["1"].total_days, 1);
        assert_eq!(stats.yearly_analysis["2022"].total_precipitation, 10.0);
        assert_eq!(stats.yearly_analysis["2023"].total_days, 2);
    }

    #[test]
    fn humidity_tiers() {
        assert_eq!(HumidityClass::from_mean_daily(5.1), HumidityClass::VeryHumid);
        assert_eq!(HumidityClass::from_mean_daily(5.0), HumidityClass::Humid);
        assert_eq!(HumidityClass::from_mean_daily(2.0), HumidityClass::Moderate);
        assert_eq!(HumidityClass::from_mean_daily(0.5), HumidityClass::Arid);
        assert_eq!(HumidityClass::from_mean_daily(0.0), HumidityClass::Arid);
    }

    #[test]
    fn merge_with_identity_is_noop() {
        let job = PrecipitationJob::new(1.0);
        let (_, mut acc) = fold(&job, &[record((2023, 4, 1), 3.0)]);
        let before = acc.clone();
        acc.merge(PrecipitationAcc::default());
        assert_eq!(acc, before);
    }

    #[test]
    fn empty_accumulator_is_suppressed() {
        let job = PrecipitationJob::new(1.0);
        assert!(job
            .finalize(&"Nowhere".to_string(), PrecipitationAcc::default())
            .is_none());
    }
}
