use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub hold_rules: HoldRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Tunables of the hold lifecycle. Every field has a default so a minimal
/// config file still boots.
#[derive(Debug, Deserialize, Clone)]
pub struct HoldRules {
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: u64,
    #[serde(default = "default_extend_min")]
    pub extend_min_minutes: u32,
    #[serde(default = "default_extend_max")]
    pub extend_max_minutes: u32,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_minutes: u32,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_hold_ttl() -> u64 { 600 }
fn default_extend_min() -> u32 { 1 }
fn default_extend_max() -> u32 { 30 }
fn default_max_lifetime() -> u32 { 30 }
fn default_sweep_interval() -> u64 { 60 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of KAIROS)
            // Eg.. `KAIROS__SERVER__PORT=9090` would set the server port
            .add_source(config::Environment::with_prefix("KAIROS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
