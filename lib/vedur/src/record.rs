use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One daily observation for one location, as produced by the upstream
/// weather archive extractor. Field aliases accept the archive's original
/// `*_2m_*` / `*_10m_*` names so its output is ingestible unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub location_key: String,
    pub country: String,
    pub climate_zone: String,
    #[serde(alias = "temperature_2m_max")]
    pub temperature_max: f64,
    #[serde(alias = "temperature_2m_min")]
    pub temperature_min: f64,
    #[serde(default, alias = "temperature_2m_mean")]
    pub temperature_mean: Option<f64>,
    #[serde(default)]
    pub precipitation_sum: Option<f64>,
    #[serde(default, alias = "windspeed_10m_max")]
    pub windspeed_max: Option<f64>,
    #[serde(default, alias = "humidity_2m_max")]
    pub humidity_max: Option<f64>,
}

impl WeatherRecord {
    /// Parse and validate one input line. Malformed input is a normal
    /// occurrence at this best-effort ingestion boundary: anything that fails
    /// to parse, is missing a required field, or carries an empty identifier
    /// is dropped here and never enters a pipeline.
    pub fn from_json_line(line: &str) -> Option<Self> {
        let record: WeatherRecord = serde_json::from_str(line.trim()).ok()?;
        if record.location_key.is_empty()
            || record.country.is_empty()
            || record.climate_zone.is_empty()
        {
            return None;
        }
        Some(record)
    }

    /// Daily mean temperature, derived from the bounds when not observed.
    pub fn temperature_mean(&self) -> f64 {
        self.temperature_mean
            .unwrap_or((self.temperature_max + self.temperature_min) / 2.0)
    }

    pub fn temperature_range(&self) -> f64 {
        self.temperature_max - self.temperature_min
    }

    /// Daily precipitation, defaulting to 0 when the archive has no reading.
    pub fn precipitation(&self) -> f64 {
        self.precipitation_sum.unwrap_or(0.0)
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn season(&self) -> Season {
        Season::from_month(self.date.month())
    }
}

/// Meteorological season. The month mapping is fixed to the Northern
/// Hemisphere for every location, including southern ones; the upstream data
/// carries no hemisphere correction and none is applied here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3 | 4 | 5 => Season::Spring,
            6 | 7 | 8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_field_names() {
        let line = r#"{"date":"2023-07-14","location_key":"bogota_co","country":"Colombia",
            "climate_zone":"tropical_mountain","temperature_max":21.5,"temperature_min":9.1,
            "precipitation_sum":4.2,"windspeed_max":12.0}"#;
        let r = WeatherRecord::from_json_line(line).unwrap();
        assert_eq!(r.month(), 7);
        assert_eq!(r.year(), 2023);
        assert_eq!(r.season(), Season::Summer);
        assert_eq!(r.temperature_mean(), (21.5 + 9.1) / 2.0);
        assert_eq!(r.precipitation(), 4.2);
    }

    #[test]
    fn parses_archive_field_aliases() {
        let line = r#"{"date":"2023-01-02","location_key":"madrid_es","country":"Spain",
            "climate_zone":"continental","temperature_2m_max":8.0,"temperature_2m_min":-2.0,
            "temperature_2m_mean":3.5,"windspeed_10m_max":30.0,"humidity_2m_max":97.0}"#;
        let r = WeatherRecord::from_json_line(line).unwrap();
        assert_eq!(r.temperature_mean(), 3.5);
        assert_eq!(r.windspeed_max, Some(30.0));
        assert_eq!(r.humidity_max, Some(97.0));
        // precipitation absent entirely: defaults to 0
        assert_eq!(r.precipitation(), 0.0);
    }

    #[test]
    fn rejects_missing_required_fields() {
        // no temperature bounds
        assert!(WeatherRecord::from_json_line(
            r#"{"date":"2023-01-02","location_key":"x","country":"Spain","climate_zone":"arid"}"#
        )
        .is_none());
        // empty identifier
        assert!(WeatherRecord::from_json_line(
            r#"{"date":"2023-01-02","location_key":"","country":"Spain","climate_zone":"arid",
                "temperature_max":1.0,"temperature_min":0.0}"#
        )
        .is_none());
        // unparseable date
        assert!(WeatherRecord::from_json_line(
            r#"{"date":"not-a-date","location_key":"x","country":"Spain","climate_zone":"arid",
                "temperature_max":1.0,"temperature_min":0.0}"#
        )
        .is_none());
        // numeric field that is not a number
        assert!(WeatherRecord::from_json_line(
            r#"{"date":"2023-01-02","location_key":"x","country":"Spain","climate_zone":"arid",
                "temperature_max":"hot","temperature_min":0.0}"#
        )
        .is_none());
        assert!(WeatherRecord::from_json_line("not json at all").is_none());
    }

    #[test]
    fn seasons_are_northern_hemisphere_for_every_location() {
        // Known limitation carried from the source data: January is winter
        // even for a southern-hemisphere location such as Buenos Aires.
        let line = r#"{"date":"2023-01-15","location_key":"buenos_aires_ar","country":"Argentina",
            "climate_zone":"pampa","temperature_max":33.0,"temperature_min":21.0}"#;
        let r = WeatherRecord::from_json_line(line).unwrap();
        assert_eq!(r.season(), Season::Winter);
    }

    #[test]
    fn season_month_mapping() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Autumn);
        assert_eq!(Season::from_month(11), Season::Autumn);
    }
}
