use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use infra::persistence::{self, DbPool};

const ENV_PREFIX: &str = "KITCHEN_";

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: String,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

/// Values that may be supplied as `KITCHEN_*` environment variables, taking
/// precedence over the file.
#[derive(Deserialize, Debug, Default)]
struct EnvOverrides {
    postgres_url: Option<String>,
    postgres_pool_size: Option<u32>,
    session_cookie_secure: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    #[serde(default)]
    modules: HashMap<String, LogLevel>,
    #[serde(default)]
    timestamp_nanos: bool,
}

/// Read a TOML file into whatever shape the calling binary expects.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let config = toml::from_str(&buf).with_context(|| format!("parse {:?}", path))?;
    Ok(config)
}

impl Config {
    pub fn apply_env(&mut self) -> Result<()> {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("read KITCHEN_* environment")?;
        debug!("Environment overrides: {:?}", overrides);
        self.merge(overrides);
        Ok(())
    }

    fn merge(&mut self, overrides: EnvOverrides) {
        if let Some(url) = overrides.postgres_url {
            self.postgres.url = url;
        }
        if let Some(size) = overrides.postgres_pool_size {
            self.postgres.pool_size = size;
        }
        if let Some(secure) = overrides.session_cookie_secure {
            self.sessions.secure = secure;
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            url: "postgres://postgres@localhost/kitchen".into(),
            pool_size: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl PostgresConfig {
    pub fn build(&self) -> Result<DbPool> {
        debug!("Build pool from {:?}", self);

        let manager = persistence::manager(&self.url).context("postgres url")?;

        let builder = r2d2::Pool::builder()
            .max_size(self.pool_size)
            .connection_timeout(Duration::from_secs(self.connection_timeout_secs));

        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager).context("build pool")?;

        Ok(pool)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: "sessionid".into(),
            max_age_secs: 60 * 60 * 24 * 7 * 2,
            secure: false,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_secs)
    }
}

impl LogLevel {
    fn to_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level.as_ref() {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
