//! Settings for a housewatch run.
//!
//! Loaded once from a TOML file at process start and passed by reference to
//! every component. Secrets may come from the environment instead of the file
//! (`HOUSEWATCH_API_KEY`, `HOUSEWATCH_SMTP_PASSWORD`), but are never defaulted.

use crate::domain::listing::PriceRange;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

pub const API_KEY_ENV: &str = "HOUSEWATCH_API_KEY";
pub const SMTP_PASSWORD_ENV: &str = "HOUSEWATCH_SMTP_PASSWORD";

const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://app.scrapeak.com";
const DEFAULT_DETAIL_BASE_URL: &str = "https://www.zillow.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Secret,
    pub listing_url: String,
    pub zip_codes: BTreeSet<u32>,
    pub price_range: PriceRange,
    pub email: EmailSettings,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub sender_email: String,
    pub receiver_emails: Vec<String>,
    pub smtp_password: Secret,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub detail_base_url: String,
    pub timeout_secs: u64,
}

/// A credential that must not show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    api_key: Option<String>,
    listing_url: Option<String>,
    zip_codes_to_check: Option<Vec<u32>>,
    email_config: Option<RawEmailConfig>,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    provider: RawProvider,
}

#[derive(Debug, Deserialize)]
struct RawEmailConfig {
    sender_email: Option<String>,
    receiver_emails: Option<Vec<String>>,
    smtp_password: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSearch {
    min_price: Option<f64>,
    max_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProvider {
    base_url: Option<String>,
    detail_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Settings {
    /// Reads `path` and applies overrides from the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading settings");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, |key| std::env::var(key).ok())
    }

    /// Parses settings from TOML text; `env` looks up secret overrides.
    pub fn from_toml_str<F>(text: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawSettings = toml::from_str(text)?;

        let api_key = override_from_env(&env, API_KEY_ENV, raw.api_key)
            .ok_or(ConfigError::Missing("api_key"))?;
        let listing_url = non_blank(raw.listing_url).ok_or(ConfigError::Missing("listing_url"))?;

        let zip_codes: BTreeSet<u32> = raw
            .zip_codes_to_check
            .ok_or(ConfigError::Missing("zip_codes_to_check"))?
            .into_iter()
            .collect();
        if zip_codes.is_empty() {
            return Err(ConfigError::Invalid {
                field: "zip_codes_to_check",
                reason: "at least one zip code is required".to_string(),
            });
        }

        let price_range = PriceRange {
            min: raw.search.min_price.unwrap_or(PriceRange::DEFAULT_MIN),
            max: raw.search.max_price.unwrap_or(PriceRange::DEFAULT_MAX),
        };
        validate_price_range(&price_range)?;

        let email = raw
            .email_config
            .ok_or(ConfigError::Missing("email_config"))?;
        let email = build_email_settings(email, &env)?;

        let provider = ProviderSettings {
            base_url: non_blank(raw.provider.base_url)
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string()),
            detail_base_url: non_blank(raw.provider.detail_base_url)
                .unwrap_or_else(|| DEFAULT_DETAIL_BASE_URL.to_string()),
            timeout_secs: raw.provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "provider.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            api_key: Secret::new(api_key),
            listing_url,
            zip_codes,
            price_range,
            email: EmailSettings {
                timeout_secs: provider.timeout_secs,
                ..email
            },
            provider,
        })
    }
}

fn build_email_settings<F>(raw: RawEmailConfig, env: &F) -> Result<EmailSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let sender_email =
        non_blank(raw.sender_email).ok_or(ConfigError::Missing("email_config.sender_email"))?;
    validate_address("email_config.sender_email", &sender_email)?;

    let receiver_emails = raw
        .receiver_emails
        .ok_or(ConfigError::Missing("email_config.receiver_emails"))?;
    if receiver_emails.is_empty() {
        return Err(ConfigError::Invalid {
            field: "email_config.receiver_emails",
            reason: "at least one receiver is required".to_string(),
        });
    }
    for receiver in &receiver_emails {
        validate_address("email_config.receiver_emails", receiver)?;
    }

    let smtp_password = override_from_env(env, SMTP_PASSWORD_ENV, raw.smtp_password)
        .ok_or(ConfigError::Missing("email_config.smtp_password"))?;

    Ok(EmailSettings {
        sender_email,
        receiver_emails,
        smtp_password: Secret::new(smtp_password),
        smtp_host: non_blank(raw.smtp_host).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        smtp_port: raw.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
        timeout_secs: DEFAULT_TIMEOUT_SECS,
    })
}

fn validate_address(field: &'static str, value: &str) -> Result<(), ConfigError> {
    value
        .parse::<lettre::Address>()
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid {
            field,
            reason: format!("{value:?} is not a valid email address: {e}"),
        })
}

fn validate_price_range(range: &PriceRange) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        field: "search",
        reason,
    };

    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(invalid("price bounds must be finite".to_string()));
    }
    if range.min < 0.0 {
        return Err(invalid(format!("min_price must be >= 0 (got {})", range.min)));
    }
    if range.min > range.max {
        return Err(invalid(format!(
            "min_price {} is greater than max_price {}",
            range.min, range.max
        )));
    }
    Ok(())
}

fn override_from_env<F>(env: &F, key: &str, file_value: Option<String>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(env(key)).or_else(|| non_blank(file_value))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
