use crate::cors::CorsMode;
use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

/// Origins the frontend is known to run on. Anything under *.vercel.app is
/// accepted as well, see `cors::OriginPolicy`.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "https://memestream-ten.vercel.app",
    "https://memestream.vercel.app",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Process-wide configuration, loaded once at startup and passed into each
/// adapter at construction. Business logic never reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub media_bucket_name: String,
    pub memes_table_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    /// Absent means the mock captioner answers caption requests.
    pub gemini_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub cors_mode: CorsMode,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let media_bucket_name = env::var("MEDIA_BUCKET_NAME")
            .map_err(|_| ConfigError::MissingVar("MEDIA_BUCKET_NAME".into()))?;

        let memes_table_name = env::var("MEMES_TABLE_NAME").unwrap_or_else(|_| "memes".to_string());

        let aws_region = env::var("AWS_DEFAULT_REGION")
            .unwrap_or_else(|_| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = env::var("AWS_ENDPOINT_URL").ok(); // Optional

        // No key means caption requests are served by the static fallback
        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        let allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let cors_mode = match env::var("CORS_MODE").as_deref() {
            Ok("enforce") => CorsMode::Enforce,
            Ok("log-only") | Err(_) => CorsMode::LogOnly,
            Ok(other) => {
                return Err(ConfigError::InvalidVar("CORS_MODE".into(), other.to_string()));
            }
        };

        Ok(Config {
            bind_address,
            media_bucket_name,
            memes_table_name,
            aws_region,
            localstack_endpoint,
            gemini_api_key,
            allowed_origins,
            cors_mode,
        })
    }

    /// Base URL under which uploaded media objects are publicly reachable.
    pub fn media_base_url(&self) -> String {
        match &self.localstack_endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.media_bucket_name),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                self.media_bucket_name, self.aws_region
            ),
        }
    }
}
