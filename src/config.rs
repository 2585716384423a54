use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub api_version: String,
    /// Upper bound on request bodies buffered for failure logs
    pub max_logged_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub instance_id: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

/// Deployment environment. Gates debug output and error detail verbosity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
        }
    }

    pub fn production() -> Self {
        Self::new("production")
    }

    pub fn local() -> Self {
        Self::new("local")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_production(&self) -> bool {
        matches!(self.name.as_str(), "production" | "prod")
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let environment = Environment::new(
            env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
        );

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment.is_production() => {
                bail!("JWT_SECRET must be set in production")
            }
            Err(_) => "local-development-secret".to_string(),
        };

        Ok(Config {
            app: AppConfig {
                environment,
                api_version: env::var("API_VERSION").unwrap_or_else(|_| "1.0".to_string()),
                max_logged_body_bytes: env::var("MAX_LOGGED_BODY_BYTES")
                    .unwrap_or_else(|_| "65536".to_string())
                    .parse()
                    .context("MAX_LOGGED_BODY_BYTES must be a valid number")?,
            },
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
                instance_id: env::var("INSTANCE_ID")
                    .or_else(|_| env::var("HOSTNAME"))
                    .unwrap_or_else(|_| "unknown".to_string()),
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "tenant-api".to_string()),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: env::var("RATE_LIMIT_PER_SECOND")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .context("RATE_LIMIT_PER_SECOND must be a valid number")?,
                burst: env::var("RATE_LIMIT_BURST")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .context("RATE_LIMIT_BURST must be a valid number")?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
