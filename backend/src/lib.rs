pub mod auth;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod images;
pub mod llm;
pub mod logging;
pub mod profile;
pub mod reconcile;
pub mod routes;
pub mod test_util;
pub mod trips;

pub use auth::{ApiKeyVerifier, JwksClient, SessionContext};
pub use config::Config;
pub use directory::{Directory, DirectoryError, HttpDirectory, SqliteStore};
pub use error::{ApiError, ApiResult};
pub use reconcile::Reconciler;
pub use trips::TripGenerator;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::auth::AuthError;
use crate::images::UnsplashClient;
use crate::llm::GeminiClient;
use crate::profile::GooglePeopleClient;

/// Per-account limiter for trip generation.
pub type GenerateLimiter = DefaultKeyedRateLimiter<String>;

/// How often idle accounts are dropped from the generation limiter.
pub const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Forget accounts whose generation quota has fully replenished.
pub fn prune_generate_limiter(limiter: &GenerateLimiter) {
    let before = limiter.len();
    limiter.retain_recent();
    limiter.shrink_to_fit();
    tracing::debug!(before, after = limiter.len(), "Pruned generation limiter");
}

/// Background task running [`prune_generate_limiter`] every [`LIMITER_PRUNE_INTERVAL`].
pub fn spawn_limiter_pruning(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            prune_generate_limiter(&state.generate_limiter);
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Identity provider: {0}")]
    Auth(#[from] AuthError),
    #[error("Directory: {0}")]
    Directory(#[from] DirectoryError),
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub jwks_client: JwksClient,
    /// Accepts the facade service key, if one is configured.
    pub api_keys: ApiKeyVerifier,
    /// User records; local store or a remote facade.
    pub directory: Arc<dyn Directory>,
    /// Saved trips, always local.
    pub store: Arc<SqliteStore>,
    pub reconciler: Reconciler,
    pub trip_generator: TripGenerator,
    pub generate_limiter: GenerateLimiter,
}

/// Shared client for every outbound call, bounded by `http.timeout_secs`.
pub fn http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
}

impl AppState {
    /// Connect to the identity provider, open storage and wire the services.
    pub async fn build(config: Config, http_client: Client) -> Result<Self, StartupError> {
        let jwks_client = JwksClient::new(
            http_client.clone(),
            &config.oidc.issuer,
            config.oidc.audience.as_deref(),
        )
        .await?;

        let store = Arc::new(SqliteStore::open(&config.database.url)?);

        let directory: Arc<dyn Directory> = match &config.directory.remote_url {
            Some(url) => {
                tracing::info!("Using remote directory at {}", url);
                Arc::new(HttpDirectory::new(
                    http_client.clone(),
                    url,
                    config.directory.api_key.clone(),
                )?)
            }
            None => store.clone(),
        };

        let api_keys = ApiKeyVerifier::new(config.facade.api_key_sha256.as_deref());
        if !api_keys.is_enabled() {
            tracing::info!("No facade API key configured; service access disabled");
        }

        let photos = Arc::new(GooglePeopleClient::new(
            http_client.clone(),
            &config.profile.people_url,
        ));
        let reconciler = Reconciler::new(directory.clone(), photos);

        let trip_generator = TripGenerator::new(
            GeminiClient::new(
                http_client.clone(),
                &config.gemini.base_url,
                &config.gemini.api_key,
                &config.gemini.model,
            ),
            UnsplashClient::new(
                http_client,
                &config.unsplash.base_url,
                &config.unsplash.access_key,
            ),
            config.images.placeholders.clone(),
        );

        let per_minute =
            NonZeroU32::new(config.trips.generate_per_minute).unwrap_or(NonZeroU32::MIN);
        let generate_limiter = RateLimiter::keyed(Quota::per_minute(per_minute));

        Ok(Self {
            config,
            jwks_client,
            api_keys,
            directory,
            store,
            reconciler,
            trip_generator,
            generate_limiter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prune_drops_replenished_accounts_only() {
        let fast: GenerateLimiter =
            RateLimiter::keyed(Quota::per_second(NonZeroU32::new(1000).unwrap()));
        fast.check_key(&"acc-1".to_string()).unwrap();
        fast.check_key(&"acc-2".to_string()).unwrap();
        assert_eq!(fast.len(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        prune_generate_limiter(&fast);
        assert!(fast.is_empty());

        let slow: GenerateLimiter = RateLimiter::keyed(Quota::per_minute(NonZeroU32::MIN));
        slow.check_key(&"acc-1".to_string()).unwrap();
        prune_generate_limiter(&slow);
        assert_eq!(slow.len(), 1);
        assert!(slow.check_key(&"acc-1".to_string()).is_err());
    }
}
