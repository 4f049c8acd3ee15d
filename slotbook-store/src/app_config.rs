use serde::Deserialize;
use std::env;
use std::time::Duration;
use slotbook_core::SimulatedOutcome;
use slotbook_order::SettlementPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Rate limiting is skipped when no url is configured
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    #[serde(default)]
    pub allow_dev_tokens: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaymentConfig {
    /// Artificial latency of the simulated gateway
    pub delay_ms: u64,
    pub decline: bool,
    pub timeout_ms: u64,
    pub record_attempts: u32,
    pub record_backoff_ms: u64,
    /// How long a settlement in flight blocks another capture attempt
    pub claim_lease_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            decline: false,
            timeout_ms: 10_000,
            record_attempts: 5,
            record_backoff_ms: 200,
            claim_lease_ms: 30_000,
        }
    }
}

impl PaymentConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn outcome(&self) -> SimulatedOutcome {
        if self.decline { SimulatedOutcome::Decline } else { SimulatedOutcome::Approve }
    }

    pub fn policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            gateway_timeout: Duration::from_millis(self.timeout_ms),
            record_attempts: self.record_attempts,
            record_backoff: Duration::from_millis(self.record_backoff_ms),
            claim_lease: Duration::from_millis(self.claim_lease_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BookingConfig {
    pub currency: String,
    pub rate_limit_per_minute: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            rate_limit_per_minute: 120,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SLOTBOOK__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("SLOTBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
