use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use travel_common::{NewUser, StatusResponse, UserRecord, UserStatus, UsersPage};

use super::{Directory, DirectoryError};
use crate::auth::API_KEY_HEADER;

/// Directory backed by another instance's `/api/user*` facade.
pub struct HttpDirectory {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDirectory {
    pub fn new(
        http_client: Client,
        base_url: &str,
        api_key: Option<String>,
    ) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| DirectoryError::Upstream(format!("invalid directory URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::Upstream(format!(
                "invalid directory URL: {}",
                base_url
            )));
        }
        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// `{base}/api/<segments...>`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }
}

/// Turn a non-2xx facade response into an upstream error.
async fn upstream_error(response: Response) -> DirectoryError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    DirectoryError::Upstream(format!("{}: {}", status, body))
}

#[async_trait]
impl Directory for HttpDirectory {
    fn backend(&self) -> &'static str {
        "remote"
    }

    /// The remote instance's own `/health`.
    async fn ping(&self) -> Result<(), DirectoryError> {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("health");
        }
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        Ok(())
    }

    async fn find_user(&self, account_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let response = self
            .request(self.http_client.get(self.url(&["user", account_id])))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json().await?)),
            _ => Err(upstream_error(response).await),
        }
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        let response = self
            .request(self.http_client.post(self.url(&["user"])))
            .json(&new_user)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn promote(&self, account_id: &str) -> Result<UserRecord, DirectoryError> {
        let response = self
            .request(self.http_client.patch(self.url(&["user", account_id, "admin"])))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(account_id.to_string())),
            s if s.is_success() => Ok(response.json().await?),
            _ => Err(upstream_error(response).await),
        }
    }

    async fn user_status(&self, account_id: &str) -> Result<UserStatus, DirectoryError> {
        let response = self
            .request(self.http_client.get(self.url(&["user", account_id, "status"])))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(account_id.to_string())),
            s if s.is_success() => Ok(response.json::<StatusResponse>().await?.status),
            _ => Err(upstream_error(response).await),
        }
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<UsersPage, DirectoryError> {
        let response = self
            .request(self.http_client.get(self.url(&["users"])))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        Ok(response.json().await?)
    }
}
