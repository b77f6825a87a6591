use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use travel_alert_lib::trip::{Trip, TripStatus};

use crate::TrackingError;

/// The persistence collaborator for trip records. Called as side effects
/// of lifecycle transitions; never retried on failure.
pub trait TripStore: Send + Sync {
    fn get_trip(&self, id: &str) -> BoxFuture<'static, Result<Trip, TrackingError>>;

    fn set_status(&self, id: &str, status: TripStatus) -> BoxFuture<'static, Result<Trip, TrackingError>>;

    /// Record that the alert fired; returns the persisted trigger time.
    fn mark_alert_triggered(&self, id: &str) -> BoxFuture<'static, Result<DateTime<Utc>, TrackingError>>;
}

// Client for the backend REST API. The bearer credential is attached
// opaquely, never inspected.
#[derive(Clone)]
pub struct RestTripStore {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl RestTripStore {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    fn trip_url(&self, id: &str, suffix: &str) -> String {
        format!("{}/api/trips/{}{}", self.base_url, id, suffix)
    }
}

impl TripStore for RestTripStore {
    fn get_trip(&self, id: &str) -> BoxFuture<'static, Result<Trip, TrackingError>> {
        let request = self.client.get(self.trip_url(id, "")).bearer_auth(&self.api_token);
        Box::pin(async move {
            let response = request
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|err| TrackingError::Persistence(format!("Failed to get trip: {err}")))?;
            response
                .json::<Trip>()
                .await
                .map_err(|err| TrackingError::Persistence(format!("Failed to decode trip: {err}")))
        })
    }

    fn set_status(&self, id: &str, status: TripStatus) -> BoxFuture<'static, Result<Trip, TrackingError>> {
        // Start and complete are dedicated transitions on the backend;
        // anything else goes through the generic update route.
        let request = match status {
            TripStatus::Active => self.client.put(self.trip_url(id, "/start")),
            TripStatus::Completed => self.client.put(self.trip_url(id, "/complete")),
            other => self
                .client
                .put(self.trip_url(id, ""))
                .json(&serde_json::json!({ "status": other })),
        };
        let request = request.bearer_auth(&self.api_token);

        Box::pin(async move {
            let response = request
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|err| TrackingError::Persistence(format!("Failed to set trip status: {err}")))?;
            response
                .json::<Trip>()
                .await
                .map_err(|err| TrackingError::Persistence(format!("Failed to decode trip: {err}")))
        })
    }

    fn mark_alert_triggered(&self, id: &str) -> BoxFuture<'static, Result<DateTime<Utc>, TrackingError>> {
        let request = self.client.put(self.trip_url(id, "/alert")).bearer_auth(&self.api_token);
        Box::pin(async move {
            let response = request
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|err| TrackingError::Persistence(format!("Failed to mark alert: {err}")))?;
            let trip = response
                .json::<Trip>()
                .await
                .map_err(|err| TrackingError::Persistence(format!("Failed to decode trip: {err}")))?;
            trip.triggered_at
                .ok_or_else(|| TrackingError::Persistence("Backend returned no trigger time".to_string()))
        })
    }
}

// In-process store mirroring the backend's transition side effects.
#[derive(Clone, Default)]
pub struct InMemoryTripStore {
    trips: Arc<Mutex<HashMap<String, Trip>>>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, trip: Trip) {
        self.trips.lock().unwrap().insert(trip.id.clone(), trip);
    }

    fn with_trip<T>(&self, id: &str, f: impl FnOnce(&mut Trip) -> T) -> Result<T, TrackingError> {
        let mut trips = self.trips.lock().unwrap();
        let trip = trips
            .get_mut(id)
            .ok_or_else(|| TrackingError::Persistence(format!("Trip {id} not found")))?;
        Ok(f(trip))
    }
}

impl TripStore for InMemoryTripStore {
    fn get_trip(&self, id: &str) -> BoxFuture<'static, Result<Trip, TrackingError>> {
        let result = self.with_trip(id, |trip| trip.clone());
        Box::pin(async move { result })
    }

    fn set_status(&self, id: &str, status: TripStatus) -> BoxFuture<'static, Result<Trip, TrackingError>> {
        let result = self.with_trip(id, |trip| {
            trip.status = status;
            match status {
                TripStatus::Active => trip.started_at = Some(Utc::now()),
                TripStatus::Completed => trip.completed_at = Some(Utc::now()),
                _ => {}
            }
            trip.clone()
        });
        Box::pin(async move { result })
    }

    fn mark_alert_triggered(&self, id: &str) -> BoxFuture<'static, Result<DateTime<Utc>, TrackingError>> {
        let result = self.with_trip(id, |trip| {
            let triggered_at = Utc::now();
            trip.alert_triggered = true;
            trip.triggered_at = Some(triggered_at);
            triggered_at
        });
        Box::pin(async move { result })
    }
}
