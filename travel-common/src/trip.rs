//! Trip itinerary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the traveller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripCriteria {
    pub country: String,
    pub number_of_days: u32,
    pub travel_style: String,
    pub interests: String,
    pub budget: String,
    pub group_type: String,
    /// Ignored by the server, which always uses the caller's account.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A generated itinerary.
///
/// Only `name` and `itinerary` are required; the model is free to omit the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_price: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub travel_style: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub group_type: String,
    #[serde(default)]
    pub best_time_to_visit: Vec<String>,
    #[serde(default)]
    pub weather_info: Vec<String>,
    #[serde(default)]
    pub location: Option<TripLocation>,
    pub itinerary: Vec<DayPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripLocation {
    pub city: String,
    /// `[latitude, longitude]`
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub open_street_map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub description: String,
}

/// Response of `POST /api/generate-trip`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTrip {
    pub trip: Trip,
    pub image_urls: Vec<String>,
}

/// Stored trip. `trip_detail` holds the itinerary as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub id: String,
    pub trip_detail: String,
    pub created_at: DateTime<Utc>,
    pub image_urls: Vec<String>,
    pub user_id: String,
}

impl TripRecord {
    /// Decode the stored itinerary. Returns `None` for rows written with a
    /// shape this version no longer understands.
    pub fn trip(&self) -> Option<Trip> {
        serde_json::from_str(&self.trip_detail).ok()
    }
}

/// Response of `GET /api/trips`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripsPage {
    pub trips: Vec<TripRecord>,
    pub total: u64,
}
