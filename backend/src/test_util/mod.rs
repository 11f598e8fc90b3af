mod mock_gemini;

pub use mock_gemini::{gemini_reply, sample_trip, sample_trip_json};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use travel_common::{NewUser, Principal, RoutePolicy, UserRecord, UsersPage};

use crate::auth::SessionContext;
use crate::config::{
    Config, CorsConfig, DatabaseConfig, DirectoryConfig, FacadeConfig, GeminiConfig, HttpConfig,
    ImagesConfig, LoggingConfig, OidcConfig, ProfileConfig, PromotionConfig, TripsConfig,
    UnsplashConfig,
};
use crate::directory::{Directory, DirectoryError};
use crate::profile::{EnrichmentError, PhotoSource};

/// Key id the test JWKS publishes.
pub const TEST_KID: &str = "test-key";

const TEST_RSA_PEM: &[u8] = include_bytes!("test_rsa_key.pem");

const TEST_RSA_N: &str = "vlm3t6gOVEQfV9xJrcQSIMvjgd8OAVH5IwjM7T2kGARr4TKNzNkQmgmbsEJRgx_xCE6_CYaBpE9OS14junRhqtkesgqTVPPftcB-9QRV20kBF6GE3PZX0qCs1PgvwCxfzjhGdPgCW5Im35lay6q9dmtaKY6j0ZI7eY1g-UiB7MMkc1fvoZvRCL3SMm5e38E7sUxo_t0tVWPXRXVE7wp7pILzqZx2aDRfRIJitNqEbWWb-7-cYEhTUZo7-ygIil87LYyi_8PVp2jlbLsoS55CVjf9MgM_TON4eSiErqWA--cZyEJZKQYbIbAGSbRL9opjbK8GoGeN_dl_dzvuFYn4zw";
const TEST_RSA_E: &str = "AQAB";

/// Config pointing every upstream at `upstream` (usually a mock server).
pub fn test_config(issuer: &str, upstream: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        oidc: OidcConfig {
            issuer: issuer.to_string(),
            audience: None,
        },
        gemini: GeminiConfig {
            base_url: upstream.to_string(),
            api_key: "test-gemini-key".to_string(),
            model: "gemini-test".to_string(),
        },
        unsplash: UnsplashConfig {
            base_url: upstream.to_string(),
            access_key: "test-unsplash-key".to_string(),
        },
        images: ImagesConfig {
            placeholders: vec![
                "https://placeholder.example/1.jpg".to_string(),
                "https://placeholder.example/2.jpg".to_string(),
                "https://placeholder.example/3.jpg".to_string(),
            ],
        },
        profile: ProfileConfig {
            people_url: format!("{}/v1/people/me", upstream),
        },
        http: HttpConfig { timeout_secs: 5 },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
        facade: FacadeConfig::default(),
        directory: DirectoryConfig::default(),
        promotion: PromotionConfig::default(),
        gate: RoutePolicy::default(),
        trips: TripsConfig::default(),
    }
}

pub fn test_session(account_id: &str, access_token: Option<&str>) -> SessionContext {
    SessionContext {
        principal: Principal {
            account_id: account_id.to_string(),
            email: format!("{}@example.com", account_id),
            name: format!("User {}", account_id),
            access_token: access_token.map(String::from),
        },
    }
}

/// JWKS document publishing the test signing key under [`TEST_KID`].
pub fn test_jwks() -> Value {
    json!({
        "keys": [{
            "kid": TEST_KID,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": TEST_RSA_N,
            "e": TEST_RSA_E
        }]
    })
}

pub fn test_signing_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(TEST_RSA_PEM).expect("Failed to load test RSA key")
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    iss: String,
    email: Option<String>,
    name: Option<String>,
    exp: u64,
    iat: u64,
}

fn sign(claims: &TestClaims) -> String {
    sign_with_kid(claims, TEST_KID)
}

fn sign_with_kid(claims: &TestClaims, kid: &str) -> String {
    let header = Header {
        alg: Algorithm::RS256,
        kid: Some(kid.to_string()),
        ..Default::default()
    };
    encode(&header, claims, &test_signing_key()).expect("Failed to encode JWT")
}

pub fn generate_test_jwt(issuer: &str, account_id: &str, email: Option<&str>, name: Option<&str>) -> String {
    let now = Utc::now();
    sign(&TestClaims {
        sub: account_id.to_string(),
        iss: issuer.to_string(),
        email: email.map(String::from),
        name: name.map(String::from),
        exp: (now + Duration::hours(1)).timestamp() as u64,
        iat: now.timestamp() as u64,
    })
}

/// Valid claims signed by the test key but labelled with `kid`, which the
/// JWKS document does not publish unless `kid == TEST_KID`.
pub fn generate_jwt_with_kid(issuer: &str, account_id: &str, kid: &str) -> String {
    let now = Utc::now();
    sign_with_kid(
        &TestClaims {
            sub: account_id.to_string(),
            iss: issuer.to_string(),
            email: None,
            name: None,
            exp: (now + Duration::hours(1)).timestamp() as u64,
            iat: now.timestamp() as u64,
        },
        kid,
    )
}

pub fn generate_expired_jwt(issuer: &str, account_id: &str) -> String {
    let now = Utc::now();
    sign(&TestClaims {
        sub: account_id.to_string(),
        iss: issuer.to_string(),
        email: None,
        name: None,
        exp: (now - Duration::hours(1)).timestamp() as u64,
        iat: (now - Duration::hours(2)).timestamp() as u64,
    })
}

/// Directory whose every call fails as unreachable.
pub struct FailingDirectory;

#[async_trait]
impl Directory for FailingDirectory {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        Err(DirectoryError::Upstream("directory offline".to_string()))
    }

    async fn find_user(&self, _account_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Err(DirectoryError::Upstream("directory offline".to_string()))
    }

    async fn create_user(&self, _new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        Err(DirectoryError::Upstream("directory offline".to_string()))
    }

    async fn promote(&self, _account_id: &str) -> Result<UserRecord, DirectoryError> {
        Err(DirectoryError::Upstream("directory offline".to_string()))
    }

    async fn list_users(&self, _limit: u32, _offset: u32) -> Result<UsersPage, DirectoryError> {
        Err(DirectoryError::Upstream("directory offline".to_string()))
    }
}

/// Photo source with a canned answer.
pub struct FixedPhoto(Option<String>);

impl FixedPhoto {
    pub fn url(url: &str) -> Self {
        Self(Some(url.to_string()))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl PhotoSource for FixedPhoto {
    async fn profile_photo(&self, _access_token: Option<&str>) -> Result<String, EnrichmentError> {
        // Let concurrent reconciles interleave between lookup and create.
        tokio::task::yield_now().await;
        self.0.clone().ok_or(EnrichmentError::NoPhoto)
    }
}
