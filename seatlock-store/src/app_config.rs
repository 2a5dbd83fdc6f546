use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VenueConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_cols")]
    pub cols: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_seat_hold_seconds")]
    pub seat_hold_seconds: u64,
    /// Whether the current holder may refresh a lock by locking again
    #[serde(default = "default_true")]
    pub allow_lock_extension: bool,
}

fn default_port() -> u16 { 3000 }
fn default_event_buffer() -> usize { 100 }
fn default_rows() -> u32 { 3 }
fn default_cols() -> u32 { 6 }
fn default_seat_hold_seconds() -> u64 { 60 }
fn default_true() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
        }
    }
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_seat_hold_seconds(),
            allow_lock_extension: default_true(),
        }
    }
}

impl BusinessRules {
    /// Longest hold a lock may be configured with (one day)
    pub const MAX_SEAT_HOLD_SECONDS: u64 = 86_400;

    pub fn seat_hold(&self) -> Duration {
        Duration::from_secs(self.seat_hold_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `SEATLOCK__SERVER__PORT=8080`
            .add_source(
                config::Environment::with_prefix("SEATLOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.business_rules.seat_hold_seconds == 0 {
            return Err(config::ConfigError::Message(
                "business_rules.seat_hold_seconds must be greater than zero".to_string(),
            ));
        }
        if self.business_rules.seat_hold_seconds > BusinessRules::MAX_SEAT_HOLD_SECONDS {
            return Err(config::ConfigError::Message(format!(
                "business_rules.seat_hold_seconds must be at most {}, got {}",
                BusinessRules::MAX_SEAT_HOLD_SECONDS,
                self.business_rules.seat_hold_seconds
            )));
        }
        Ok(())
    }
}
