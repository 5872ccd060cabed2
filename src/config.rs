//! Worker configuration.
//!
//! Defaults suit a local setup; the binary overrides them from `MAILBOX_WORKER_*` environment
//! variables.

use crate::transport::RedeliveryPolicy;

use std::path::PathBuf;
use std::time::Duration;

const ENV_DATA_DIR: &str = "MAILBOX_WORKER_DATA_DIR";
const ENV_LISTING_URL: &str = "MAILBOX_WORKER_LISTING_URL";
const ENV_QUEUE: &str = "MAILBOX_WORKER_QUEUE";
const ENV_MAX_DELIVERIES: &str = "MAILBOX_WORKER_MAX_DELIVERIES";
const ENV_RETRY_INITIAL_MS: &str = "MAILBOX_WORKER_RETRY_INITIAL_MS";
const ENV_RETRY_MAX_MS: &str = "MAILBOX_WORKER_RETRY_MAX_MS";
const ENV_HTTP_TIMEOUT_SECS: &str = "MAILBOX_WORKER_HTTP_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value {value:?} for {name}: {reason}")]
	Invalid {
		name: &'static str,
		value: String,
		reason: String,
	},
}

/// Configuration for the mailbox sync worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
	/// Directory holding the mailbox record files.
	pub data_dir: PathBuf,
	/// Endpoint of the mailbox listing service.
	pub listing_url: String,
	/// Name of the queue carrying IMAP account events.
	pub queue: String,
	/// Timeout for listing requests.
	pub http_timeout: Duration,
	pub max_deliveries: u32,
	pub retry_initial_interval: Duration,
	pub retry_max_interval: Duration,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			listing_url: "http://localhost:8025/mailboxes".to_string(),
			queue: "imap-accounts".to_string(),
			http_timeout: Duration::from_secs(30),
			max_deliveries: 5,
			retry_initial_interval: Duration::from_millis(500),
			retry_max_interval: Duration::from_secs(30),
		}
	}
}

impl WorkerConfig {
	/// Defaults overridden by the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Defaults overridden by whatever `lookup` returns for each variable.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(dir) = lookup(ENV_DATA_DIR) {
			config.data_dir = PathBuf::from(dir);
		}
		if let Some(url) = lookup(ENV_LISTING_URL) {
			config.listing_url = url;
		}
		if let Some(queue) = lookup(ENV_QUEUE) {
			config.queue = queue;
		}
		if let Some(value) = lookup(ENV_MAX_DELIVERIES) {
			config.max_deliveries = parse_number(ENV_MAX_DELIVERIES, value)?;
			if config.max_deliveries == 0 {
				return Err(ConfigError::Invalid {
					name: ENV_MAX_DELIVERIES,
					value: "0".to_string(),
					reason: "at least one delivery is required".to_string(),
				});
			}
		}
		if let Some(value) = lookup(ENV_RETRY_INITIAL_MS) {
			config.retry_initial_interval =
				Duration::from_millis(parse_number(ENV_RETRY_INITIAL_MS, value)?);
		}
		if let Some(value) = lookup(ENV_RETRY_MAX_MS) {
			config.retry_max_interval = Duration::from_millis(parse_number(ENV_RETRY_MAX_MS, value)?);
		}
		if let Some(value) = lookup(ENV_HTTP_TIMEOUT_SECS) {
			config.http_timeout = Duration::from_secs(parse_number(ENV_HTTP_TIMEOUT_SECS, value)?);
		}

		Ok(config)
	}

	pub fn redelivery_policy(&self) -> RedeliveryPolicy {
		RedeliveryPolicy {
			max_deliveries: self.max_deliveries,
			initial_interval: self.retry_initial_interval,
			max_interval: self.retry_max_interval,
		}
	}
}

fn parse_number<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
		name,
		reason: e.to_string(),
		value,
	})
}
