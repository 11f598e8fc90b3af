use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{EnrichmentError, PhotoSource};

/// Google People API `people/me` response, photos only.
#[derive(Debug, Deserialize)]
struct PersonResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    url: String,
}

/// Client for the caller's own Google profile.
pub struct GooglePeopleClient {
    http_client: Client,
    people_url: String,
}

impl GooglePeopleClient {
    pub fn new(http_client: Client, people_url: &str) -> Self {
        Self {
            http_client,
            people_url: people_url.to_string(),
        }
    }
}

#[async_trait]
impl PhotoSource for GooglePeopleClient {
    async fn profile_photo(&self, access_token: Option<&str>) -> Result<String, EnrichmentError> {
        let token = access_token.ok_or(EnrichmentError::MissingToken)?;

        let response = self
            .http_client
            .get(&self.people_url)
            .query(&[("personFields", "photos")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| EnrichmentError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }

        let person: PersonResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Malformed(e.to_string()))?;

        person
            .photos
            .into_iter()
            .map(|p| p.url)
            .find(|url| !url.is_empty())
            .ok_or(EnrichmentError::NoPhoto)
    }
}
