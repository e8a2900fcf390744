//! Layered CLI configuration.
//!
//! Precedence, lowest first: built-in defaults, the YAML file given with
//! `--config`, `BLUEROVER_*` environment variables (nested keys separated by
//! `__`, e.g. `BLUEROVER_STREAM__IDLE_TIMEOUT`), then command-line flags.
//! Durations are written in humantime form (`30s`, `4m`).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use bluerover_client::{ClientConfig, Credentials, DEFAULT_STREAM_PATH, IdlePolicy, StreamConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "BLUEROVER_";

/// Fully merged settings, before validation.
///
/// No `Debug`: the key would be printed.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub connect_timeout: String,
    pub stream: StreamSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            key: None,
            token: None,
            base_url: None,
            connect_timeout: "30s".to_owned(),
            stream: StreamSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub path: String,
    pub idle_timeout: String,
    pub idle_policy: IdlePolicyName,
    pub reconnect_delay_on_timeout: String,
    pub reconnect_delay_on_close: String,
    pub reconnect_delay_on_error: String,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_STREAM_PATH.to_owned(),
            idle_timeout: "4m".to_owned(),
            idle_policy: IdlePolicyName::default(),
            reconnect_delay_on_timeout: "2s".to_owned(),
            reconnect_delay_on_close: "2s".to_owned(),
            reconnect_delay_on_error: "4m".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IdlePolicyName {
    #[default]
    ResetOnData,
    FixedWindow,
}

impl From<IdlePolicyName> for IdlePolicy {
    fn from(name: IdlePolicyName) -> Self {
        match name {
            IdlePolicyName::ResetOnData => Self::ResetOnData,
            IdlePolicyName::FixedWindow => Self::FixedWindow,
        }
    }
}

/// Values from command-line flags; unset flags leave lower layers alone.
#[derive(Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,
    pub stream: StreamOverrides,
}

#[derive(Debug, Default, Serialize)]
pub struct StreamOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_policy: Option<IdlePolicyName>,
}

impl AppConfig {
    /// Merge every layer.
    ///
    /// # Errors
    ///
    /// Fails if `file` is given but missing, or a layer holds a value of the
    /// wrong type.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = file {
            ensure!(path.is_file(), "config file {} not found", path.display());
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::globals(overrides))
            .extract()
            .context("invalid configuration")
    }

    /// # Errors
    ///
    /// Fails if a credential is missing or empty, or the connect timeout is
    /// not a valid duration.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let credentials = Credentials::new(
            self.key.clone().unwrap_or_default(),
            self.token.clone().unwrap_or_default(),
            self.base_url.clone().unwrap_or_default(),
        )
        .context("set key, token and base_url in the config file, BLUEROVER_* variables or flags")?;

        Ok(ClientConfig::new(credentials)
            .with_connect_timeout(parse_duration("connect_timeout", &self.connect_timeout)?))
    }

    /// # Errors
    ///
    /// Fails on an unparsable duration or a configuration the session
    /// rejects.
    pub fn stream_config(&self) -> Result<StreamConfig> {
        let section = &self.stream;
        let config = StreamConfig::new(section.path.clone())
            .idle_timeout(parse_duration("stream.idle_timeout", &section.idle_timeout)?)
            .idle_policy(section.idle_policy.into())
            .reconnect_delay_on_timeout(parse_duration(
                "stream.reconnect_delay_on_timeout",
                &section.reconnect_delay_on_timeout,
            )?)
            .reconnect_delay_on_close(parse_duration(
                "stream.reconnect_delay_on_close",
                &section.reconnect_delay_on_close,
            )?)
            .reconnect_delay_on_error(parse_duration(
                "stream.reconnect_delay_on_error",
                &section.reconnect_delay_on_error,
            )?);

        config.validate()?;
        Ok(config)
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).with_context(|| format!("invalid duration for {field}: {value:?}"))
}
