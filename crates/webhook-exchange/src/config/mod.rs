use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_WEBHOOK_PATH: &str = "/api/protobuf-receiver/";
pub const DEFAULT_TARGET_URL: &str = "http://localhost:8000/api/protobuf-receiver/";

pub const HEALTH_PATH: &str = "/health";
pub const READY_PATH: &str = "/ready";
pub const METRICS_PATH: &str = "/metrics";
pub const RECENT_DISPATCHES_PATH: &str = "/api/v1/webhooks/recent";

/// Service routes mounted next to the webhook endpoint.
pub const RESERVED_PATHS: [&str; 4] = [
    HEALTH_PATH,
    READY_PATH,
    METRICS_PATH,
    RECENT_DISPATCHES_PATH,
];

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

/// Top-level configuration shared by the receiver and the sender.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub sender: SenderConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let webhook_path =
            env::var("WEBHOOK_PATH").unwrap_or_else(|_| DEFAULT_WEBHOOK_PATH.to_string());

        let target_url =
            env::var("WEBHOOK_TARGET_URL").unwrap_or_else(|_| DEFAULT_TARGET_URL.to_string());
        let timeout_secs = parse_secs("WEBHOOK_TIMEOUT_SECS", 10)?;
        let interval_secs = parse_secs("WEBHOOK_INTERVAL_SECS", 30)?;
        let event_source = env::var("WEBHOOK_EVENT_SOURCE")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let server = ServerConfig {
            host,
            port,
            webhook_path,
        };
        server.validate()?;

        Ok(Self {
            environment,
            server,
            sender: SenderConfig {
                target_url,
                timeout: Duration::from_secs(timeout_secs),
                interval: Duration::from_secs(interval_secs),
                event_source,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_secs(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidDuration { var, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the receiver's HTTP binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub webhook_path: String,
}

impl ServerConfig {
    /// The webhook path must be absolute so it can be mounted on the router.
    /// The webhook path must be a static route that does not shadow a service
    /// route; captures and wildcards are refused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = self.webhook_path.as_str();
        let reason = if !path.starts_with('/') {
            Some("must start with '/'")
        } else if RESERVED_PATHS.contains(&path) {
            Some("collides with a service route")
        } else if path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
        {
            Some("must not contain ':' or '*' segments")
        } else if path.contains(['{', '}']) {
            Some("must not contain '{' or '}'")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidPath {
                path: path.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

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

/// Outbound webhook delivery settings.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub target_url: String,
    pub timeout: Duration,
    pub interval: Duration,
    pub event_source: Option<String>,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPath { path: String, reason: &'static str },
    InvalidDuration { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPath { path, reason } => {
                write!(f, "WEBHOOK_PATH {}, got '{}'", reason, path)
            }
            ConfigError::InvalidDuration { var, value } => {
                write!(f, "{} must be a positive number of seconds, got '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPath { .. }
            | ConfigError::InvalidDuration { .. } => None,
        }
    }
}
