//! Threshold evaluation for health snapshots
//!
//! The evaluator is a pure function: given one snapshot and the fixed
//! thresholds it computes the full set of alert conditions currently true,
//! from scratch, with no I/O and no mutation of external state. Whether a
//! condition has already been notified is the deduplicator's concern, not
//! the evaluator's.

use crate::config::Thresholds;
use crate::snapshot::{HealthSnapshot, SensorKind, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of alert condition, in evaluation order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    CriticalOutbreak,
    HighAqi,
    WaterPhOutOfRange,
    HighNoise,
    Heatwave,
    FloodForecast,
}

impl AlertKind {
    /// Stable slug used as the fixed identity of singleton conditions
    pub fn slug(&self) -> &'static str {
        match self {
            AlertKind::CriticalOutbreak => "critical-outbreak",
            AlertKind::HighAqi => "high-aqi",
            AlertKind::WaterPhOutOfRange => "water-ph-out-of-range",
            AlertKind::HighNoise => "high-noise",
            AlertKind::Heatwave => "heatwave",
            AlertKind::FloodForecast => "flood-forecast",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A derived fact computed from a snapshot that may warrant a notification
///
/// Two conditions with the same `(kind, identity)` are the same occurrence
/// even when their message text differs across polls: the current AQI
/// condition is "the" AQI condition, not one per reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub identity: String,
    pub message: String,
}

impl AlertCondition {
    fn singleton(kind: AlertKind, message: String) -> Self {
        Self {
            kind,
            identity: kind.slug().to_string(),
            message,
        }
    }

    /// The deduplication key for this condition
    pub fn key(&self) -> (AlertKind, &str) {
        (self.kind, self.identity.as_str())
    }
}

/// Compute the set of alert conditions currently true for a snapshot
///
/// The returned order is stable: critical outbreaks first (in snapshot
/// order), then the scalar conditions in kind-declaration order.
pub fn evaluate(snapshot: &HealthSnapshot, thresholds: &Thresholds) -> Vec<AlertCondition> {
    let mut conditions = Vec::new();

    for outbreak in &snapshot.disease_outbreaks {
        if outbreak.severity == Severity::Critical {
            conditions.push(AlertCondition {
                kind: AlertKind::CriticalOutbreak,
                identity: outbreak.id.clone(),
                message: format!(
                    "Critical outbreak detected: {} in {}",
                    outbreak.disease,
                    outbreak.area_names()
                ),
            });
        }
    }

    let air = &snapshot.environmental_data.air_quality;
    if air.aqi > thresholds.aqi_threshold {
        conditions.push(AlertCondition::singleton(
            AlertKind::HighAqi,
            format!("Poor air quality alert: AQI is {:.0}", air.aqi),
        ));
    }

    let water = &snapshot.environmental_data.water_quality;
    if water.ph < thresholds.ph_low || water.ph > thresholds.ph_high {
        conditions.push(AlertCondition::singleton(
            AlertKind::WaterPhOutOfRange,
            format!("Water quality alert: pH level {:.1} is abnormal", water.ph),
        ));
    }

    let noise = &snapshot.environmental_data.noise_level;
    if noise.average > thresholds.noise_threshold {
        conditions.push(AlertCondition::singleton(
            AlertKind::HighNoise,
            format!(
                "High ambient noise level detected: average {:.0} dB",
                noise.average
            ),
        ));
    }

    let hot_sensor = snapshot
        .environmental_data
        .sensors
        .iter()
        .find(|sensor| {
            sensor.kind == SensorKind::Air
                && sensor.reports_celsius()
                && sensor.reading >= thresholds.heatwave_temp_c
        });
    if let Some(sensor) = hot_sensor {
        conditions.push(AlertCondition::singleton(
            AlertKind::Heatwave,
            format!(
                "Heatwave conditions: {:.1}°C recorded at sensor {}",
                sensor.reading, sensor.id
            ),
        ));
    }

    if let Some(forecast) = &snapshot.flood_forecast {
        conditions.push(AlertCondition::singleton(
            AlertKind::FloodForecast,
            format!(
                "Flood forecast: {:?} severity expected at ({:.3}, {:.3}) around {}",
                forecast.severity,
                forecast.location.latitude,
                forecast.location.longitude,
                forecast.forecast_time.to_rfc3339()
            ),
        ));
    }

    conditions
}
