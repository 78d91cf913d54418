use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::models::Labels;
use crate::preprocess::{PreprocessOptions, ResizeMode, TensorLayout};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub preprocess: PreprocessOptions,
    pub threshold: f32,
    pub labels: Labels,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("cancer_model.onnx"),
            host: "127.0.0.1".to_string(),
            port: 5000,
            preprocess: PreprocessOptions::default(),
            threshold: 0.5,
            labels: Labels::default(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let threshold: f32 = parse_or(&lookup, "DECISION_THRESHOLD", defaults.threshold)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "DECISION_THRESHOLD",
                value: threshold.to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        let size: u32 = parse_or(&lookup, "IMAGE_SIZE", defaults.preprocess.size)?;
        if size == 0 {
            return Err(ConfigError::Invalid {
                key: "IMAGE_SIZE",
                value: size.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            preprocess: PreprocessOptions {
                size,
                layout: parse_or(&lookup, "TENSOR_LAYOUT", defaults.preprocess.layout)?,
                resize: parse_or(&lookup, "RESIZE_MODE", defaults.preprocess.resize)?,
            },
            threshold,
            labels: Labels {
                negative: lookup("NEGATIVE_LABEL").unwrap_or(defaults.labels.negative),
                positive: lookup("POSITIVE_LABEL").unwrap_or(defaults.labels.positive),
            },
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
