use std::{env, fmt, path::PathBuf};

use thiserror::Error;

pub const DEFAULT_INPUT_FOLDER: &str = "/input";
pub const DEFAULT_OUTPUT_FOLDER: &str = "/output";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(String),
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Settings for a single sync run, read once from the environment.
#[derive(Clone)]
pub struct Config {
    /// Object store endpoint, either a bare host or a full URL.
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Namespace prepended to every key in the bucket.
    pub prefix: String,
    pub input_object_ids: Vec<String>,
    pub submission_id: String,
    pub fps: i64,
    pub timestamp: String,
    pub base_image: String,
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| lookup(name).ok_or_else(|| ConfigError::Missing(name.into()));
        let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        Ok(Config {
            endpoint: required("S3_URL")?,
            bucket: required("S3_BUCKET_ID")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: or_default("S3_REGION", DEFAULT_REGION),
            prefix: required("S3_PREFIX")?,
            input_object_ids: parse_id_list("INPUT_OBJECT_IDS", &required("INPUT_OBJECT_IDS")?)?,
            submission_id: required("SUBMISSION_ID")?,
            fps: parse_int("FPS", &required("FPS")?)?,
            timestamp: required("TIMESTAMP")?,
            base_image: required("BASE_IMAGE")?,
            input_folder: or_default("INPUT_FOLDER", DEFAULT_INPUT_FOLDER).into(),
            output_folder: or_default("OUTPUT_FOLDER", DEFAULT_OUTPUT_FOLDER).into(),
        })
    }

    pub fn input_key(&self, id: &str) -> String {
        format!("{}/inputs/{}", self.prefix, id)
    }

    /// Prefix under which every output object of this submission lives.
    pub fn output_prefix(&self) -> String {
        format!("{}/outputs/{}/", self.prefix, self.submission_id)
    }

    pub fn output_key(&self, name: &str) -> String {
        format!("{}{}", self.output_prefix(), name)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("prefix", &self.prefix)
            .field("input_object_ids", &self.input_object_ids)
            .field("submission_id", &self.submission_id)
            .field("fps", &self.fps)
            .field("timestamp", &self.timestamp)
            .field("base_image", &self.base_image)
            .field("input_folder", &self.input_folder)
            .field("output_folder", &self.output_folder)
            .finish()
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name: name.into(),
        value: value.into(),
        reason: e.to_string(),
    })
}

// list values are JSON arrays, e.g. INPUT_OBJECT_IDS='["a.mp4","b.mp4"]'
fn parse_id_list(name: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    serde_json::from_str(value).map_err(|e| ConfigError::Invalid {
        name: name.into(),
        value: value.into(),
        reason: e.to_string(),
    })
}
