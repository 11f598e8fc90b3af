use serde_json::{json, Value};
use travel_common::Trip;

/// A `generateContent` response whose single candidate carries `text`.
pub fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": text}]
            },
            "finishReason": "STOP"
        }]
    })
}

/// Itinerary JSON in the shape the trip prompt asks for.
pub fn sample_trip_json() -> String {
    json!({
        "name": "Kyoto Calm",
        "description": "Temples, gardens and tea houses at an easy pace.",
        "estimatedPrice": "$1200",
        "duration": 2,
        "budget": "Mid-range",
        "travelStyle": "Relaxed",
        "country": "Japan",
        "interests": "Culture",
        "groupType": "Couple",
        "bestTimeToVisit": ["Spring (March to May): cherry blossoms"],
        "weatherInfo": ["Spring: 10-20°C (50-68°F)"],
        "location": {
            "city": "Kyoto",
            "coordinates": [35.0116, 135.7681],
            "openStreetMap": "https://www.openstreetmap.org/#map=12/35.0116/135.7681"
        },
        "itinerary": [
            {
                "day": 1,
                "location": "Higashiyama",
                "activities": [
                    {"time": "Morning", "description": "Walk up to Kiyomizu-dera"},
                    {"time": "Evening", "description": "Dinner in Gion"}
                ]
            },
            {
                "day": 2,
                "location": "Arashiyama",
                "activities": [
                    {"time": "Morning", "description": "Bamboo grove before the crowds"}
                ]
            }
        ]
    })
    .to_string()
}

pub fn sample_trip() -> Trip {
    serde_json::from_str(&sample_trip_json()).expect("sample trip parses")
}
