use crate::error::{CoreError, Result};
use areacrawl_scanner::DEFAULT_ENDPOINT;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the area API app code.
pub const CREDENTIAL_VAR: &str = "APPCODE";

/// Base name of the configuration file, looked up with any supported extension.
pub const DEFAULT_CONFIG_NAME: &str = "config";

const ENV_PREFIX: &str = "AREACRAWL";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, optionally prefixed with `sqlite://`.
    pub connection: String,
    /// Log every SQL statement the database executes.
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Settings {
    /// Loads `name` (a path without extension, or with one) and overlays
    /// `AREACRAWL__SECTION__KEY` environment variables.
    ///
    /// The file is required; `database.connection` has no default.
    pub fn load(name: &str) -> Result<Self> {
        let builder = Config::builder()
            .set_default("database.debug", false)?
            .set_default("api.endpoint", DEFAULT_ENDPOINT)?
            .set_default("api.timeout_secs", 10)?
            .add_source(File::with_name(name))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl DatabaseSettings {
    pub fn path(&self) -> PathBuf {
        let raw = self
            .connection
            .strip_prefix("sqlite://")
            .unwrap_or(&self.connection);
        PathBuf::from(shellexpand::tilde(raw).as_ref())
    }
}

/// App code sent in the `Authorization` header. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_env() -> Result<Self> {
        Self::from_var(CREDENTIAL_VAR)
    }

    pub fn from_var(name: &str) -> Result<Self> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(Self(value)),
            _ => Err(CoreError::MissingCredential(name.to_string())),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
