use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::leads::Role;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let weights_path = match env::var("PITCH_WEIGHTS_PATH") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => {
                let path = PathBuf::from(raw.trim());
                if !path.is_file() {
                    return Err(ConfigError::MissingWeightsFile { path });
                }
                Some(path)
            }
            Err(_) => None,
        };

        let tokens = match env::var("APP_AUTH_TOKENS") {
            Ok(raw) => parse_token_grants(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig { weights_path },
            auth: AuthConfig { tokens },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the pitch weight table comes from. `None` selects the canonical table.
#[derive(Debug, Clone, Default)]
pub struct ScoringConfig {
    pub weights_path: Option<PathBuf>,
}

/// Static bearer tokens accepted by the HTTP service.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenGrant>,
}

/// One `token=uid:role` entry from `APP_AUTH_TOKENS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    pub uid: String,
    pub role: Role,
}

/// Parses a comma separated list of `token=uid:role` entries. Blank entries are skipped.
pub fn parse_token_grants(raw: &str) -> Result<Vec<TokenGrant>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidAuthToken {
                entry: entry.to_string(),
            };
            let (token, claim) = entry.split_once('=').ok_or_else(invalid)?;
            let (uid, role) = claim.split_once(':').ok_or_else(invalid)?;
            let (token, uid) = (token.trim(), uid.trim());
            if token.is_empty() || uid.is_empty() {
                return Err(invalid());
            }
            let role = Role::parse(role).ok_or_else(invalid)?;
            Ok(TokenGrant {
                token: token.to_string(),
                uid: uid.to_string(),
                role,
            })
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingWeightsFile { path: PathBuf },
    InvalidAuthToken { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingWeightsFile { path } => write!(
                f,
                "PITCH_WEIGHTS_PATH points at '{}', which is not a readable file",
                path.display()
            ),
            ConfigError::InvalidAuthToken { entry } => write!(
                f,
                "APP_AUTH_TOKENS entry '{}' must look like token=uid:role",
                entry
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::MissingWeightsFile { .. }
            | ConfigError::InvalidAuthToken { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
