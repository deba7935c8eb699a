//! Extreme-weather event detection and risk scoring by location.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::api::{Accumulator, Job};
use crate::record::WeatherRecord;
use crate::utils::round2;

/// Event types in canonical classification order. The derived `Ord` on this
/// order also breaks frequency ties when ranking primary threats, keeping the
/// ranking independent of how the input was partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ExtremeHeat,
    ExtremeCold,
    ExtremePrecipitation,
    ExtremeWind,
    DroughtDay,
    ExtremeHumidity,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ExtremeHeat => "extreme_heat",
            EventType::ExtremeCold => "extreme_cold",
            EventType::ExtremePrecipitation => "extreme_precipitation",
            EventType::ExtremeWind => "extreme_wind",
            EventType::DroughtDay => "drought_day",
            EventType::ExtremeHumidity => "extreme_humidity",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            EventType::ExtremeHeat => 2.0,
            EventType::ExtremeCold => 1.5,
            EventType::ExtremePrecipitation => 2.5,
            EventType::ExtremeWind => 2.0,
            EventType::ExtremeHumidity => 1.0,
            EventType::DroughtDay => 0.1,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            EventType::ExtremeHeat => "Dangerously high temperatures that can cause heat stress",
            EventType::ExtremeCold => "Sub-zero temperatures that can harm agriculture and health",
            EventType::ExtremePrecipitation => "Intense rainfall with flooding risk",
            EventType::ExtremeWind => "Strong winds that can cause structural damage",
            EventType::ExtremeHumidity => "Very high humidity reducing comfort and affecting health",
            EventType::DroughtDay => "Days without precipitation contributing to drought",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn multiplier(&self) -> f64 {
        match self {
            Severity::High => 3.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl RiskLevel {
    fn from_score(score: f64) -> Self {
        if score > 7.0 {
            RiskLevel::VeryHigh
        } else if score > 5.0 {
            RiskLevel::High
        } else if score > 3.0 {
            RiskLevel::Medium
        } else if score > 1.0 {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }
}

/// Location + climate zone composite group identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtremeWeatherKey {
    pub location_key: String,
    pub climate_zone: String,
}

/// Event-count accumulator. `total_days` counts emitted events, not input
/// records: a single day can contribute several events, and each emission
/// advances the denominator, exactly as the upstream analysis did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremeWeatherAcc {
    pub event_counts: BTreeMap<EventType, u64>,
    pub severity_counts: BTreeMap<(EventType, Severity), u64>,
    pub extreme_values: BTreeMap<EventType, Vec<f64>>,
    pub normal_days: u64,
    pub total_days: u64,
    pub countries: BTreeSet<String>,
}

impl Accumulator for ExtremeWeatherAcc {
    fn merge(&mut self, other: Self) {
        for (event, count) in other.event_counts {
            *self.event_counts.entry(event).or_insert(0) += count;
        }
        for (key, count) in other.severity_counts {
            *self.severity_counts.entry(key).or_insert(0) += count;
        }
        for (event, mut values) in other.extreme_values {
            self.extreme_values.entry(event).or_default().append(&mut values);
        }
        self.normal_days += other.normal_days;
        self.total_days += other.total_days;
        self.countries.extend(other.countries);
    }
}

impl ExtremeWeatherAcc {
    fn record_event(&mut self, event: EventType, severity: Severity, magnitude: f64) {
        *self.event_counts.entry(event).or_insert(0) += 1;
        *self.severity_counts.entry((event, severity)).or_insert(0) += 1;
        self.extreme_values.entry(event).or_default().push(magnitude);
        self.total_days += 1;
    }

    fn record_normal_day(&mut self) {
        self.normal_days += 1;
        self.total_days += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub total_days_analyzed: u64,
    pub normal_days: u64,
    pub extreme_days: u64,
    pub extreme_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremeValues {
    pub maximum_recorded: BTreeMap<String, f64>,
    pub average_when_extreme: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub threat_type: String,
    pub frequency: u64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub primary_threats: Vec<Threat>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremeWeatherStats {
    pub location_key: String,
    pub climate_zone: String,
    pub country: Option<String>,
    pub analysis_period: AnalysisPeriod,
    pub extreme_events_summary: BTreeMap<String, u64>,
    pub severity_breakdown: BTreeMap<String, u64>,
    pub extreme_values: ExtremeValues,
    pub risk_assessment: RiskAssessment,
}

pub struct ExtremeWeatherJob {
    precip_extreme_threshold: f64,
    wind_extreme_threshold: f64,
}

impl ExtremeWeatherJob {
    pub fn new(precip_extreme_threshold: f64, wind_extreme_threshold: f64) -> Self {
        Self { precip_extreme_threshold, wind_extreme_threshold }
    }

    /// Evaluate every extreme condition independently; a record may match
    /// zero, one or several. Returns (event, severity, triggering magnitude).
    fn detect_events(&self, record: &WeatherRecord) -> (Vec<(EventType, Severity, f64)>, bool) {
        let mut events = Vec::new();
        let precip = record.precipitation();

        if record.temperature_max > 40.0 {
            let severity = if record.temperature_max > 45.0 { Severity::High } else { Severity::Medium };
            events.push((EventType::ExtremeHeat, severity, record.temperature_max));
        }
        if record.temperature_min < 0.0 {
            let severity = if record.temperature_min < -10.0 { Severity::High } else { Severity::Medium };
            events.push((EventType::ExtremeCold, severity, record.temperature_min));
        }
        if precip >= self.precip_extreme_threshold {
            let severity = if precip > 100.0 { Severity::High } else { Severity::Medium };
            events.push((EventType::ExtremePrecipitation, severity, precip));
        }
        if let Some(wind) = record.windspeed_max {
            if wind >= self.wind_extreme_threshold {
                let severity = if wind > 50.0 { Severity::High } else { Severity::Medium };
                events.push((EventType::ExtremeWind, severity, wind));
            }
        }
        // A normal day is one with none of the four conditions above; drought
        // and humidity below are informational and do not suppress it.
        let normal = events.is_empty();

        if precip == 0.0 {
            events.push((EventType::DroughtDay, Severity::Low, precip));
        }
        if let Some(humidity) = record.humidity_max {
            if humidity > 95.0 {
                events.push((EventType::ExtremeHumidity, Severity::Medium, humidity));
            }
        }
        (events, normal)
    }

    fn risk_score(acc: &ExtremeWeatherAcc) -> f64 {
        let total = acc.total_days as f64;
        let mut score = 0.0;
        for ((event, severity), count) in &acc.severity_counts {
            let share = *count as f64 / total * 100.0;
            score += event.weight() * share * severity.multiplier() * 0.01;
        }
        round2(score)
    }

    fn primary_threats(acc: &ExtremeWeatherAcc) -> Vec<Threat> {
        let mut ranked: Vec<(EventType, u64)> = acc
            .event_counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&event, &count)| (event, count))
            .collect();
        // BTreeMap iteration gives canonical order; the stable sort keeps it
        // as the tie-break within equal frequencies.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(3)
            .map(|(event, count)| Threat {
                threat_type: event.as_str().to_string(),
                frequency: count,
                description: event.description().to_string(),
            })
            .collect()
    }

    fn recommendations(acc: &ExtremeWeatherAcc, risk_level: RiskLevel) -> Vec<String> {
        let count = |event: EventType| acc.event_counts.get(&event).copied().unwrap_or(0);
        let mut recs = Vec::new();
        if count(EventType::ExtremeHeat) > 10 {
            recs.push("Deploy early-warning systems for heat waves".to_string());
            recs.push("Provide cooled public spaces during heat peaks".to_string());
        }
        if count(EventType::ExtremePrecipitation) > 5 {
            recs.push("Improve drainage and flood-control systems".to_string());
            recs.push("Issue alerts for extreme precipitation".to_string());
        }
        if count(EventType::ExtremeWind) > 5 {
            recs.push("Reinforce critical infrastructure against strong winds".to_string());
            recs.push("Establish evacuation protocols for extreme winds".to_string());
        }
        if matches!(risk_level, RiskLevel::High | RiskLevel::VeryHigh) {
            recs.push("Develop a comprehensive climate adaptation plan".to_string());
            recs.push("Set up continuous climate monitoring".to_string());
        }
        recs
    }
}

impl Job for ExtremeWeatherJob {
    type Key = ExtremeWeatherKey;
    type Acc = ExtremeWeatherAcc;
    type Stats = ExtremeWeatherStats;

    fn classify<F>(&self, record: &WeatherRecord, emit: &mut F)
    where
        F: FnMut(Self::Key, Self::Acc),
    {
        let key = ExtremeWeatherKey {
            location_key: record.location_key.clone(),
            climate_zone: record.climate_zone.clone(),
        };
        let (events, normal) = self.detect_events(record);
        let mut acc = ExtremeWeatherAcc::default();
        for (event, severity, magnitude) in events {
            acc.record_event(event, severity, magnitude);
        }
        if normal {
            acc.record_normal_day();
        }
        acc.countries.insert(record.country.clone());
        emit(key, acc);
    }

    fn finalize(&self, key: &Self::Key, acc: Self::Acc) -> Option<Self::Stats> {
        if acc.total_days == 0 {
            return None;
        }
        let extreme_days: u64 = acc.event_counts.values().sum();
        let score = Self::risk_score(&acc);
        let risk_level = RiskLevel::from_score(score);

        let mut maximum_recorded = BTreeMap::new();
        let mut average_when_extreme = BTreeMap::new();
        for (event, values) in &acc.extreme_values {
            if values.is_empty() {
                continue;
            }
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            maximum_recorded.insert(event.as_str().to_string(), round2(max));
            average_when_extreme.insert(event.as_str().to_string(), round2(avg));
        }

        Some(ExtremeWeatherStats {
            location_key: key.location_key.clone(),
            climate_zone: key.climate_zone.clone(),
            country: acc.countries.iter().next().cloned(),
            analysis_period: AnalysisPeriod {
                total_days_analyzed: acc.total_days,
                normal_days: acc.normal_days,
                extreme_days,
                extreme_percentage: round2(extreme_days as f64 / acc.total_days as f64 * 100.0),
            },
            extreme_events_summary: acc
                .event_counts
                .iter()
                .map(|(event, &count)| (event.as_str().to_string(), count))
                .collect(),
            severity_breakdown: acc
                .severity_counts
                .iter()
                .map(|((event, severity), &count)| {
                    (format!("{}_{}", event.as_str(), severity.as_str()), count)
                })
                .collect(),
            extreme_values: ExtremeValues { maximum_recorded, average_when_extreme },
            risk_assessment: RiskAssessment {
                overall_risk_score: score,
                risk_level,
                primary_threats: Self::primary_threats(&acc),
                recommendations: Self::recommendations(&acc, risk_level),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Accumulator;
    use chrono::NaiveDate;

    fn record(temp_max: f64, temp_min: f64, precip: f64) -> WeatherRecord {
        WeatherRecord {
            date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
            location_key: "cartagena_co".into(),
            country: "Colombia".into(),
            climate_zone: "tropical_coastal".into(),
            temperature_max: temp_max,
            temperature_min: temp_min,
            temperature_mean: None,
            precipitation_sum: Some(precip),
            windspeed_max: None,
            humidity_max: None,
        }
    }

    fn fold(job: &ExtremeWeatherJob, records: &[WeatherRecord]) -> (ExtremeWeatherKey, ExtremeWeatherAcc) {
        let mut acc = ExtremeWeatherAcc::default();
        let mut key = None;
        for r in records {
            job.classify(r, &mut |k, a| {
                key = Some(k);
                acc.merge(a);
            });
        }
        (key.unwrap(), acc)
    }

    fn default_job() -> ExtremeWeatherJob {
        ExtremeWeatherJob::new(50.0, 25.0)
    }

    #[test]
    fn classifier_table() {
        let job = default_job();
        // heat, high tier
        let (events, normal) = job.detect_events(&record(46.0, 20.0, 5.0));
        assert!(!normal);
        assert_eq!(events, vec![(EventType::ExtremeHeat, Severity::High, 46.0)]);
        // heat, medium tier at 41
        let (events, _) = job.detect_events(&record(41.0, 20.0, 5.0));
        assert_eq!(events[0].1, Severity::Medium);
        // cold tiers
        let (events, _) = job.detect_events(&record(5.0, -11.0, 5.0));
        assert_eq!(events, vec![(EventType::ExtremeCold, Severity::High, -11.0)]);
        let (events, _) = job.detect_events(&record(5.0, -1.0, 5.0));
        assert_eq!(events[0].1, Severity::Medium);
        // precipitation at and above thresholds
        let (events, _) = job.detect_events(&record(20.0, 10.0, 50.0));
        assert_eq!(events, vec![(EventType::ExtremePrecipitation, Severity::Medium, 50.0)]);
        let (events, _) = job.detect_events(&record(20.0, 10.0, 120.0));
        assert_eq!(events[0].1, Severity::High);
        // wind, only when present
        let mut windy = record(20.0, 10.0, 5.0);
        windy.windspeed_max = Some(60.0);
        let (events, normal) = job.detect_events(&windy);
        assert!(!normal);
        assert_eq!(events, vec![(EventType::ExtremeWind, Severity::High, 60.0)]);
        // humidity does not suppress a normal day
        let mut humid = record(20.0, 10.0, 5.0);
        humid.humidity_max = Some(96.0);
        let (events, normal) = job.detect_events(&humid);
        assert!(normal);
        assert_eq!(events, vec![(EventType::ExtremeHumidity, Severity::Medium, 96.0)]);
        // fully unremarkable day
        let (events, normal) = job.detect_events(&record(20.0, 10.0, 5.0));
        assert!(normal);
        assert!(events.is_empty());
    }

    #[test]
    fn known_value_scenario() {
        // One record with max temperature 46 and zero precipitation emits
        // extreme_heat/high and drought_day/low; total_days counts both.
        let job = default_job();
        let (key, acc) = fold(&job, &[record(46.0, 20.0, 0.0)]);
        assert_eq!(acc.total_days, 2);
        assert_eq!(acc.normal_days, 0);

        let stats = job.finalize(&key, acc).unwrap();
        assert_eq!(stats.extreme_events_summary["extreme_heat"], 1);
        assert_eq!(stats.extreme_events_summary["drought_day"], 1);
        assert_eq!(stats.severity_breakdown["extreme_heat_high"], 1);
        assert_eq!(stats.severity_breakdown["drought_day_low"], 1);
        // heat: 2.0 * 50 * 3.0 * 0.01 = 3.0; drought: 0.1 * 50 * 1.0 * 0.01 = 0.05
        assert_eq!(stats.risk_assessment.overall_risk_score, 3.05);
        assert_eq!(stats.risk_assessment.risk_level, RiskLevel::Medium);
        assert_eq!(stats.analysis_period.extreme_days, 2);
        assert_eq!(stats.analysis_period.extreme_percentage, 100.0);
        assert_eq!(stats.extreme_values.maximum_recorded["extreme_heat"], 46.0);
        assert_eq!(stats.country.as_deref(), Some("Colombia"));
    }

    #[test]
    fn mixed_severities_score_separately() {
        let job = default_job();
        // Two heat days: one high (46), one medium (42), plus enough normal
        // days to dilute frequency. 4 records -> 4 events (no drought: precip > 0).
        let records = [
            record(46.0, 20.0, 5.0),
            record(42.0, 20.0, 5.0),
            record(20.0, 10.0, 5.0),
            record(20.0, 10.0, 5.0),
        ];
        let (key, acc) = fold(&job, &records);
        assert_eq!(acc.total_days, 4);
        assert_eq!(acc.normal_days, 2);
        let stats = job.finalize(&key, acc).unwrap();
        // high: 2.0 * 25 * 3.0 * 0.01 = 1.5; medium: 2.0 * 25 * 2.0 * 0.01 = 1.0
        assert_eq!(stats.risk_assessment.overall_risk_score, 2.5);
        assert_eq!(stats.risk_assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn primary_threats_ranked_with_deterministic_ties() {
        let job = default_job();
        let mut records = Vec::new();
        // 2x wind, 1x heat, 1x cold (tie broken by classification order)
        for _ in 0..2 {
            let mut r = record(20.0, 10.0, 5.0);
            r.windspeed_max = Some(30.0);
            records.push(r);
        }
        records.push(record(46.0, 20.0, 5.0));
        records.push(record(5.0, -5.0, 5.0));
        let (key, acc) = fold(&job, &records);
        let stats = job.finalize(&key, acc).unwrap();
        let threats: Vec<&str> = stats
            .risk_assessment
            .primary_threats
            .iter()
            .map(|t| t.threat_type.as_str())
            .collect();
        assert_eq!(threats, vec!["extreme_wind", "extreme_heat", "extreme_cold"]);
        assert_eq!(stats.risk_assessment.primary_threats[0].frequency, 2);
    }

    #[test]
    fn recommendations_follow_thresholds() {
        let job = default_job();
        let mut records = Vec::new();
        for _ in 0..11 {
            records.push(record(47.0, 20.0, 5.0));
        }
        let (key, acc) = fold(&job, &records);
        let stats = job.finalize(&key, acc).unwrap();
        // 11 high-severity heat events out of 11 days: weight 2.0 * 100 * 3.0 * 0.01 = 6.0
        assert_eq!(stats.risk_assessment.risk_level, RiskLevel::High);
        let recs = &stats.risk_assessment.recommendations;
        assert!(recs.iter().any(|r| r.contains("heat waves")));
        assert!(recs.iter().any(|r| r.contains("adaptation plan")));
        assert!(!recs.iter().any(|r| r.contains("drainage")));
    }

    #[test]
    fn merge_with_identity_is_noop() {
        let job = default_job();
        let (_, mut acc) = fold(&job, &[record(46.0, 20.0, 0.0)]);
        let before = acc.clone();
        acc.merge(ExtremeWeatherAcc::default());
        assert_eq!(acc, before);
    }

    #[test]
    fn empty_accumulator_is_suppressed() {
        let job = default_job();
        let key = ExtremeWeatherKey { location_key: "x".into(), climate_zone: "arid".into() };
        assert!(job.finalize(&key, ExtremeWeatherAcc::default()).is_none());
    }
}
