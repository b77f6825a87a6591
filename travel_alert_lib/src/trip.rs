use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::Coordinate;

pub const DEFAULT_ALERT_DISTANCE_KM: f64 = 5.0;
pub const DEFAULT_ALERT_MINUTES_BEFORE: i64 = 10;

/// Where the trip ends. Set once at trip creation, immutable for the
/// lifetime of a tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub coordinates: Coordinate,
}

impl Destination {
    pub fn new(name: impl Into<String>, coordinates: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}

/// How the alert rule is evaluated. `Route` is an approximation of
/// `Distance`, not true route-following. Values the backend might add
/// later deserialize as `Unknown` and never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Distance,
    Route,
    Eta,
    #[serde(other)]
    Unknown,
}

/// Alert thresholds as stored on the trip record. Missing or
/// non-positive fields mean "use the default", never zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_before: Option<i64>,
}

impl AlertConfig {
    pub fn distance_threshold_km(&self) -> f64 {
        self.distance_km
            .filter(|km| *km > 0.0)
            .unwrap_or(DEFAULT_ALERT_DISTANCE_KM)
    }

    pub fn minutes_threshold(&self) -> i64 {
        self.minutes_before
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_ALERT_MINUTES_BEFORE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

/// A trip record as served by the backend REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(rename = "_id")]
    pub id: String,
    pub destination: Destination,
    pub alert_type: AlertType,
    #[serde(default)]
    pub alert_config: AlertConfig,
    pub status: TripStatus,
    #[serde(default)]
    pub alert_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Trip {
    pub fn new(id: impl Into<String>, destination: Destination, alert_type: AlertType, alert_config: AlertConfig) -> Self {
        Self {
            id: id.into(),
            destination,
            alert_type,
            alert_config,
            status: TripStatus::Pending,
            alert_triggered: false,
            triggered_at: None,
            started_at: None,
            completed_at: None,
            notes: None,
        }
    }
}
