//! Configuration for the travel planner backend.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use travel_common::RoutePolicy;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub oidc: OidcConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub unsplash: UnsplashConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub facade: FacadeConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub promotion: PromotionConfig,
    #[serde(default)]
    pub gate: RoutePolicy,
    #[serde(default)]
    pub trips: TripsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path, optionally prefixed with `sqlite:`. `:memory:` for tests.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    pub issuer: String,
    /// When set, tokens must carry this audience.
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsplashConfig {
    #[serde(default = "default_unsplash_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_key: String,
}

impl Default for UnsplashConfig {
    fn default() -> Self {
        Self {
            base_url: default_unsplash_url(),
            access_key: String::new(),
        }
    }
}

/// Images served when the image search is unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { placeholders: default_placeholders() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    /// Google People API endpoint for the caller's own profile.
    #[serde(default = "default_people_url")]
    pub people_url: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { people_url: default_people_url() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for every outbound HTTP call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// `*` or a comma-separated list of origins.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { origins: default_cors_origins() }
    }
}

/// Service-to-service access to the directory facade.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FacadeConfig {
    /// SHA-256 hex digest of the accepted `X-Api-Key`. Unset disables key access.
    #[serde(default)]
    pub api_key_sha256: Option<String>,
}

/// Where user records live.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectoryConfig {
    /// Base URL of another instance's facade. Unset means the local SQLite store.
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Plain service key sent to the remote facade.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// Only existing admins (or the service key) may promote.
    #[default]
    AdminOnly,
    /// Any signed-in caller may also promote their own account.
    SelfService,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PromotionConfig {
    #[serde(default)]
    pub policy: PromotionPolicy,
    /// Accounts that may always promote themselves.
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripsConfig {
    /// Generation requests allowed per account per minute.
    #[serde(default = "default_generate_per_minute")]
    pub generate_per_minute: u32,
}

impl Default for TripsConfig {
    fn default() -> Self {
        Self { generate_per_minute: default_generate_per_minute() }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_database_url() -> String {
    "sqlite:./data/travel.db".to_string()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_unsplash_url() -> String {
    "https://api.unsplash.com".to_string()
}
fn default_placeholders() -> Vec<String> {
    vec![
        "https://images.unsplash.com/photo-1488646953014-85cb44e25828".to_string(),
        "https://images.unsplash.com/photo-1469854523086-cc02fe5d8800".to_string(),
        "https://images.unsplash.com/photo-1501785888041-af3ef285b470".to_string(),
    ]
}
fn default_people_url() -> String {
    "https://people.googleapis.com/v1/people/me".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_generate_per_minute() -> u32 {
    5
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (TRAVEL__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("TRAVEL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("images.placeholders")
                    .with_list_parse_key("promotion.bootstrap_admins")
                    .with_list_parse_key("gate.ordinary")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.placeholders.iter().all(|url| url.trim().is_empty()) {
            return Err(ConfigError::Message(
                "images.placeholders must list at least one URL".to_string(),
            ));
        }
        Ok(())
    }

    /// Origins for the CORS layer; `None` means any origin.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let origins = self.cors.origins.trim();
        if origins == "*" {
            return None;
        }
        Some(
            origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        )
    }
}
