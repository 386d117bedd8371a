//! Aggregated health snapshot data model
//!
//! This module defines the structures that make up one complete, atomic
//! health-data payload for the monitored metropolitan area. A snapshot is
//! only ever replaced wholesale: either a poll yields a fully valid
//! snapshot, or the poll is treated as failed upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// One complete health-data payload for the monitored region
///
/// Snapshots arrive from a loosely-schema'd external source, so they are
/// validated strictly on deserialization; a payload that does not match
/// this shape never reaches the threshold evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// When the snapshot was assembled by the source
    pub timestamp: Timestamp,
    /// Air, water, noise and sensor readings
    pub environmental_data: EnvironmentalData,
    /// Current disease outbreak records
    pub disease_outbreaks: Vec<DiseaseOutbreak>,
    /// Area-level mental health reports
    pub mental_health_reports: Vec<MentalHealthReport>,
    /// Flood forecast, present only when a flood is predicted
    #[serde(default)]
    pub flood_forecast: Option<FloodForecast>,
}

/// Environmental readings section of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalData {
    pub air_quality: AirQuality,
    pub water_quality: WaterQuality,
    pub noise_level: NoiseLevel,
    pub sensors: Vec<SensorReading>,
    /// Attribution for the environmental section, when the source names one
    #[serde(default)]
    pub source: Option<SourceAttribution>,
}

/// Air quality readings on the US AQI scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
}

/// Drinking water quality readings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaterQuality {
    pub ph: f64,
    pub turbidity: f64,
    pub dissolved_oxygen: f64,
    pub conductivity: f64,
    pub temperature: f64,
}

/// Ambient noise readings in decibels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoiseLevel {
    pub average: f64,
    pub peak: f64,
    /// Time of the peak reading as reported by the source (HH:MM:SS)
    pub time_of_peak: String,
}

/// A single sensor reading with its location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub location: GeoLocation,
    pub reading: f64,
    pub unit: String,
    pub last_updated: Timestamp,
}

impl SensorReading {
    /// Whether this sensor reports a temperature in degrees Celsius
    pub fn reports_celsius(&self) -> bool {
        matches!(self.unit.trim(), "°C" | "C" | "c" | "celsius" | "Celsius")
    }
}

/// Kind of environmental sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Air,
    Water,
    Noise,
}

/// Geographic coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A disease outbreak record
///
/// Outbreaks are identified by a stable string id; the poll pipeline never
/// mutates them in place, it only sees them replaced with each snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseOutbreak {
    pub id: String,
    pub disease: String,
    pub severity: Severity,
    pub affected_areas: Vec<AffectedArea>,
    /// Start date as reported by the source (ISO date string)
    pub start_date: String,
    pub status: OutbreakStatus,
    pub symptoms: Vec<String>,
    pub prevention_measures: Vec<String>,
    #[serde(default)]
    pub source: Option<SourceAttribution>,
    #[serde(default)]
    pub expert_verified: Option<bool>,
}

impl DiseaseOutbreak {
    /// Comma-separated names of the affected areas, for alert messages
    pub fn area_names(&self) -> String {
        self.affected_areas
            .iter()
            .map(|area| area.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Severity scale shared by outbreaks and flood forecasts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of an outbreak
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutbreakStatus {
    Active,
    Contained,
    Resolved,
}

/// A neighbourhood affected by an outbreak
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AffectedArea {
    pub name: String,
    pub location: GeoLocation,
    pub case_count: u64,
}

/// Area-level mental health report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentalHealthReport {
    pub id: String,
    pub area: String,
    pub location: GeoLocation,
    /// 1-10 scale
    pub stress_level: f64,
    /// 1-10 scale
    pub anxiety_level: f64,
    /// 1-10 scale
    pub depression_level: f64,
    pub report_count: u64,
    pub timestamp: Timestamp,
    pub sentiment_analysis: SentimentAnalysis,
    #[serde(default)]
    pub source: Option<SourceAttribution>,
}

/// Sentiment breakdown in percentages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Flood forecast for the monitored region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloodForecast {
    pub location: GeoLocation,
    pub severity: Severity,
    pub forecast_time: Timestamp,
}

/// Name and URL of the upstream data source for a section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    pub name: String,
    pub url: String,
}
