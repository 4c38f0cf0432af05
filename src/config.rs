// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration comes from the environment at startup and is loaded
//! into a typed [`PortalConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `127.0.0.1` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `IDENTITY_URL` | Identity provider REST API; unset uses the in-memory provider | unset |
//! | `IDENTITY_API_KEY` | API key for the identity, profile and settings services | empty |
//! | `PROFILE_STORE_URL` | Profile store REST API; unset uses the in-memory store | unset |
//! | `SETTINGS_URL` | Settings REST API; unset uses static settings | unset |
//! | `AUTH_READY_TIMEOUT_MS` | Fallback readiness timer | `3000` |
//! | `FALLBACK_PROFILE_ROLE` | Role given to synthesized or corrected profiles | `staff` |
//! | `FALLBACK_PROFILE_STATUS` | Status given to synthesized profiles | `active` |
//! | `PREFERENCE_CACHE_CAPACITY` | Cached client-side preference entries | `64` |
//! | `NONMEMBER_PROMPT_ENABLED` | Static settings value (in-memory settings only) | `true` |
//! | `SEED_ADMIN_EMAIL` | Development mode: admin account to seed | unset |
//! | `SEED_ADMIN_PASSWORD` | Development mode: password for the seeded admin | unset |

use std::time::Duration;

use url::Url;

use crate::session::preferences::DEFAULT_CAPACITY;
use crate::session::FallbackProfile;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const IDENTITY_URL_ENV: &str = "IDENTITY_URL";
pub const IDENTITY_API_KEY_ENV: &str = "IDENTITY_API_KEY";
pub const PROFILE_STORE_URL_ENV: &str = "PROFILE_STORE_URL";
pub const SETTINGS_URL_ENV: &str = "SETTINGS_URL";
pub const AUTH_READY_TIMEOUT_MS_ENV: &str = "AUTH_READY_TIMEOUT_MS";
pub const FALLBACK_PROFILE_ROLE_ENV: &str = "FALLBACK_PROFILE_ROLE";
pub const FALLBACK_PROFILE_STATUS_ENV: &str = "FALLBACK_PROFILE_STATUS";
pub const PREFERENCE_CACHE_CAPACITY_ENV: &str = "PREFERENCE_CACHE_CAPACITY";
pub const NONMEMBER_PROMPT_ENABLED_ENV: &str = "NONMEMBER_PROMPT_ENABLED";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_READY_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is set without {1}")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Development-mode admin account.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAccount {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub identity_url: Option<Url>,
    pub api_key: Option<String>,
    pub profile_store_url: Option<Url>,
    pub settings_url: Option<Url>,
    pub ready_timeout: Duration,
    pub fallback: FallbackProfile,
    pub preference_capacity: usize,
    pub nonmember_prompt_enabled: bool,
    pub seed_admin: Option<SeedAccount>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            identity_url: None,
            api_key: None,
            profile_store_url: None,
            settings_url: None,
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            fallback: FallbackProfile::default(),
            preference_capacity: DEFAULT_CAPACITY,
            nonmember_prompt_enabled: true,
            seed_admin: None,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let log_format = match var(LOG_FORMAT_ENV).map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(LOG_FORMAT_ENV, other, "expected `json` or `pretty`"));
            }
        };

        let seed_admin = match (var(SEED_ADMIN_EMAIL_ENV), var(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAccount { email, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete(SEED_ADMIN_EMAIL_ENV, SEED_ADMIN_PASSWORD_ENV))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete(SEED_ADMIN_PASSWORD_ENV, SEED_ADMIN_EMAIL_ENV))
            }
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or(defaults.host),
            port: parse_or(var(PORT_ENV), PORT_ENV, defaults.port)?,
            log_format,
            identity_url: parse_url(var(IDENTITY_URL_ENV), IDENTITY_URL_ENV)?,
            api_key: var(IDENTITY_API_KEY_ENV),
            profile_store_url: parse_url(var(PROFILE_STORE_URL_ENV), PROFILE_STORE_URL_ENV)?,
            settings_url: parse_url(var(SETTINGS_URL_ENV), SETTINGS_URL_ENV)?,
            ready_timeout: Duration::from_millis(parse_or(
                var(AUTH_READY_TIMEOUT_MS_ENV),
                AUTH_READY_TIMEOUT_MS_ENV,
                DEFAULT_READY_TIMEOUT_MS,
            )?),
            fallback: FallbackProfile {
                role: var(FALLBACK_PROFILE_ROLE_ENV).unwrap_or(defaults.fallback.role),
                status: var(FALLBACK_PROFILE_STATUS_ENV).unwrap_or(defaults.fallback.status),
            },
            preference_capacity: parse_or(
                var(PREFERENCE_CACHE_CAPACITY_ENV),
                PREFERENCE_CACHE_CAPACITY_ENV,
                defaults.preference_capacity,
            )?,
            nonmember_prompt_enabled: parse_bool(
                var(NONMEMBER_PROMPT_ENABLED_ENV),
                NONMEMBER_PROMPT_ENABLED_ENV,
                defaults.nonmember_prompt_enabled,
            )?,
            seed_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when no identity service is configured.
    pub fn is_development(&self) -> bool {
        self.identity_url.is_none()
    }
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(name, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(invalid(name, other, "expected a boolean")),
    }
}

fn parse_url(value: Option<String>, name: &'static str) -> Result<Option<Url>, ConfigError> {
    value
        .map(|raw| Url::parse(&raw).map_err(|e| invalid(name, &raw, e.to_string())))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<PortalConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.ready_timeout, Duration::from_secs(3));
        assert_eq!(config.fallback, FallbackProfile::default());
        assert_eq!(config.preference_capacity, 64);
        assert!(config.nonmember_prompt_enabled);
        assert!(config.is_development());
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn values_are_parsed() {
        let config = load(&[
            ("PORT", "9000"),
            ("LOG_FORMAT", "JSON"),
            ("IDENTITY_URL", "https://project.example.com/auth/v1"),
            ("IDENTITY_API_KEY", "anon"),
            ("AUTH_READY_TIMEOUT_MS", "500"),
            ("FALLBACK_PROFILE_ROLE", "member"),
            ("NONMEMBER_PROMPT_ENABLED", "off"),
            ("SEED_ADMIN_EMAIL", "owner@example.com"),
            ("SEED_ADMIN_PASSWORD", "changeme!"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.is_development());
        assert_eq!(config.api_key.as_deref(), Some("anon"));
        assert_eq!(config.ready_timeout, Duration::from_millis(500));
        assert_eq!(config.fallback.role, "member");
        assert!(!config.nonmember_prompt_enabled);
        assert_eq!(config.seed_admin.unwrap().email, "owner@example.com");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("PORT", "  "), ("IDENTITY_URL", "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.identity_url.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { name: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidValue { name: "LOG_FORMAT", .. })
        ));
        assert!(matches!(
            load(&[("PROFILE_STORE_URL", "not a url")]),
            Err(ConfigError::InvalidValue { name: "PROFILE_STORE_URL", .. })
        ));
        assert_eq!(
            load(&[("SEED_ADMIN_EMAIL", "owner@example.com")]).unwrap_err(),
            ConfigError::Incomplete("SEED_ADMIN_EMAIL", "SEED_ADMIN_PASSWORD")
        );
    }

    #[test]
    fn seed_account_debug_hides_password() {
        let account = SeedAccount {
            email: "owner@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{account:?}").contains("hunter22"));
    }
}
