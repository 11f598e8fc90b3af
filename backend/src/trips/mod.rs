//! Trip generation: itinerary text from Gemini, photos from Unsplash.
//!
//! The itinerary is mandatory and any failure producing it fails the whole
//! call. Photos are optional: when the search fails or finds nothing, the
//! configured placeholder images are returned instead.

use travel_common::{GeneratedTrip, Trip, TripCriteria};

use crate::images::UnsplashClient;
use crate::llm::GeminiClient;

/// Photos attached to each generated trip.
const IMAGES_PER_TRIP: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Trip generation failed: {0}")]
    Upstream(String),
    #[error("Malformed itinerary: {0}")]
    Parse(String),
}

pub struct TripGenerator {
    gemini: GeminiClient,
    unsplash: UnsplashClient,
    placeholders: Vec<String>,
}

impl TripGenerator {
    pub fn new(gemini: GeminiClient, unsplash: UnsplashClient, placeholders: Vec<String>) -> Self {
        Self {
            gemini,
            unsplash,
            placeholders,
        }
    }

    pub async fn generate(&self, criteria: &TripCriteria) -> Result<GeneratedTrip, GenerateError> {
        let text = self
            .gemini
            .generate(&build_prompt(criteria))
            .await
            .map_err(|e| GenerateError::Upstream(e.to_string()))?;
        let trip = parse_trip(&text)?;

        let image_urls = self.images_for(criteria).await;

        tracing::info!(
            country = %criteria.country,
            days = criteria.number_of_days,
            images = image_urls.len(),
            "Generated trip '{}'",
            trip.name
        );

        Ok(GeneratedTrip { trip, image_urls })
    }

    async fn images_for(&self, criteria: &TripCriteria) -> Vec<String> {
        let query = format!(
            "{} {} {}",
            criteria.country, criteria.interests, criteria.travel_style
        );
        match self.unsplash.search(&query, IMAGES_PER_TRIP).await {
            Ok(urls) if !urls.is_empty() => urls,
            Ok(_) => {
                tracing::debug!("No images for '{}', using placeholders", query);
                self.placeholders.clone()
            }
            Err(e) => {
                tracing::warn!("Image search failed, using placeholders: {}", e);
                self.placeholders.clone()
            }
        }
    }
}

pub fn build_prompt(criteria: &TripCriteria) -> String {
    let days = criteria.number_of_days;
    format!(
        r#"Generate a {days}-day travel itinerary for {country} based on the following user information:
Budget: '{budget}'
Interests: '{interests}'
TravelStyle: '{style}'
GroupType: '{group}'
Return the itinerary and lowest estimated price in a clean, non-markdown JSON format with the following structure:
{{
"name": "A descriptive title for the trip",
"description": "A brief description of the trip and its highlights not exceeding 100 words",
"estimatedPrice": "Lowest average price for the trip in USD, e.g.$price",
"duration": {days},
"budget": "{budget}",
"travelStyle": "{style}",
"country": "{country}",
"interests": "{interests}",
"groupType": "{group}",
"bestTimeToVisit": [
  "Season (from month to month): reason to visit"
],
"weatherInfo": [
  "Season: temperature range in Celsius (temperature range in Fahrenheit)"
],
"location": {{
  "city": "name of the city or region",
  "coordinates": [latitude, longitude],
  "openStreetMap": "link to open street map"
}},
"itinerary": [
  {{
    "day": 1,
    "location": "City/Region Name",
    "activities": [
      {{"time": "Morning", "description": "Visit the local historic castle and enjoy a scenic walk"}},
      {{"time": "Afternoon", "description": "Explore a famous art museum with a guided tour"}},
      {{"time": "Evening", "description": "Dine at a rooftop restaurant enjoying local wine"}}
    ]
  }}
]
}}"#,
        days = days,
        country = criteria.country,
        budget = criteria.budget,
        interests = criteria.interests,
        style = criteria.travel_style,
        group = criteria.group_type,
    )
}

/// Parse model output into a [`Trip`], tolerating a Markdown code fence.
pub fn parse_trip(text: &str) -> Result<Trip, GenerateError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| GenerateError::Parse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (e.g. "json") up to the first newline.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
