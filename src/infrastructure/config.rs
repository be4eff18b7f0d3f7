//! Configuration management
//!
//! All configuration is environment-sourced. The variable names are part of
//! the deployment contract and are read through an injectable lookup so
//! tests never mutate the process environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider base URL used when `MDS_FN_FNPROJECT_URL` is not set.
pub const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:8080";

/// Errors raised while validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider base URL (`MDS_FN_FNPROJECT_URL`). When set it also serves
    /// as the public host override for derived invoke URLs.
    pub provider_url: Option<String>,

    /// Work queue name (`MDS_FN_WORK_QUEUE`).
    pub work_queue: Option<String>,

    /// Dead-letter queue name (`MDS_FN_WORK_QUEUE_DLQ`).
    pub dead_letter_queue: Option<String>,

    /// Notification topic (`MDS_FN_NOTIFICATION_TOPIC`).
    pub notification_topic: Option<String>,

    /// Container registry `host[:port]` (`MDS_FN_CONTAINER_HOST`).
    pub container_host: Option<String>,

    /// Notification service endpoint (`MDS_FN_NS_URL`).
    pub notification_url: Option<String>,

    /// Queue service endpoint (`MDS_FN_QS_URL`).
    pub queue_url: Option<String>,

    /// Blob storage service endpoint (`MDS_FN_FS_URL`).
    pub file_store_url: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            provider_url: lookup("MDS_FN_FNPROJECT_URL"),
            work_queue: lookup("MDS_FN_WORK_QUEUE"),
            dead_letter_queue: lookup("MDS_FN_WORK_QUEUE_DLQ"),
            notification_topic: lookup("MDS_FN_NOTIFICATION_TOPIC"),
            container_host: lookup("MDS_FN_CONTAINER_HOST"),
            notification_url: lookup("MDS_FN_NS_URL"),
            queue_url: lookup("MDS_FN_QS_URL"),
            file_store_url: lookup("MDS_FN_FS_URL"),
        }
    }

    /// Provider base URL, with the conventional local default.
    #[must_use]
    pub fn provider_base_url(&self) -> String {
        self.provider_url
            .clone()
            .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string())
    }

    /// Public host override for derived invoke URLs, if configured.
    #[must_use]
    pub fn public_host_override(&self) -> Option<String> {
        self.provider_url.clone()
    }

    /// Checks that the variables the worker loop requires are present.
    ///
    /// # Errors
    ///
    /// Returns the first missing required variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_queue.is_none() {
            return Err(ConfigError::MissingVar("MDS_FN_WORK_QUEUE"));
        }
        if self.dead_letter_queue.is_none() {
            return Err(ConfigError::MissingVar("MDS_FN_WORK_QUEUE_DLQ"));
        }
        if self.notification_topic.is_none() {
            return Err(ConfigError::MissingVar("MDS_FN_NOTIFICATION_TOPIC"));
        }
        Ok(())
    }
}
