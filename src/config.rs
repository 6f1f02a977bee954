use std::env;
use std::time::Duration;

use crate::engine::scoring::{CoordinatePolicy, ScoringSettings, DEFAULT_ROUND_SECONDS};
use crate::error::AppError;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub round_seconds: u32,
    pub coordinate_policy: CoordinatePolicy,
    pub max_upload_bytes: u64,
    pub upload_chunk_size: usize,
    pub photo_service_url: Option<String>,
    pub photo_service_timeout_secs: u64,
    pub abandoned_upload_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            round_seconds: DEFAULT_ROUND_SECONDS,
            coordinate_policy: CoordinatePolicy::DefaultZero,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_chunk_size: 0,
            photo_service_url: None,
            photo_service_timeout_secs: 30,
            abandoned_upload_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default(&lookup, "HTTP_PORT", defaults.http_port)?,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            round_seconds: parse_or_default(&lookup, "ROUND_SECONDS", defaults.round_seconds)?,
            coordinate_policy: parse_or_default(
                &lookup,
                "COORDINATE_POLICY",
                defaults.coordinate_policy,
            )?,
            max_upload_bytes: parse_or_default(
                &lookup,
                "MAX_UPLOAD_BYTES",
                defaults.max_upload_bytes,
            )?,
            upload_chunk_size: parse_or_default(
                &lookup,
                "UPLOAD_CHUNK_SIZE",
                defaults.upload_chunk_size,
            )?,
            photo_service_url: lookup("PHOTO_SERVICE_URL").filter(|url| !url.trim().is_empty()),
            photo_service_timeout_secs: parse_or_default(
                &lookup,
                "PHOTO_SERVICE_TIMEOUT_SECS",
                defaults.photo_service_timeout_secs,
            )?,
            abandoned_upload_ttl_secs: parse_or_default(
                &lookup,
                "ABANDONED_UPLOAD_TTL_SECS",
                defaults.abandoned_upload_ttl_secs,
            )?,
        })
    }

    pub fn scoring(&self) -> ScoringSettings {
        ScoringSettings {
            round_seconds: self.round_seconds,
            policy: self.coordinate_policy,
        }
    }

    pub fn photo_service_timeout(&self) -> Duration {
        Duration::from_secs(self.photo_service_timeout_secs)
    }

    // 0 disables the sweep.
    pub fn abandoned_upload_ttl(&self) -> Option<Duration> {
        (self.abandoned_upload_ttl_secs > 0)
            .then(|| Duration::from_secs(self.abandoned_upload_ttl_secs))
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}
