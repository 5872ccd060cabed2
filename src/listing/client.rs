//!
//! HTTP client for the mailbox listing service.
//!
//! The listing service holds the IMAP connections: the worker posts the account's connection
//! settings and receives the LIST response as JSON. The whole listing is read before the stream is
//! handed back, so the stream itself never fails.

use super::types::*;
use crate::account::Account;

use futures_util::{StreamExt, stream};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Mailbox listing service client
#[derive(Clone)]
pub struct HttpMailboxLister {
	/// The underlying HTTP client.
	http_client: Client,
	/// Endpoint answering listing requests.
	listing_url: String,
}

impl HttpMailboxLister {
	/// Create a new listing client.
	///
	/// # Arguments
	/// * `listing_url` - The HTTP endpoint of the listing service.
	/// * `timeout` - Timeout applied to every request.
	pub fn new(listing_url: String, timeout: Duration) -> Result<Self, ListingError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			listing_url,
		})
	}

	/// Post a listing request and return the decoded response body.
	async fn execute_request(
		&self,
		request_body: serde_json::Value,
	) -> Result<serde_json::Value, ListingError> {
		let response = self
			.http_client
			.post(&self.listing_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ListingError::Remote(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let response_json: serde_json::Value = response.json().await?;

		if let Some(errors) = response_json.get("errors") {
			return Err(ListingError::Remote(format!("Listing errors: {}", errors)));
		}

		Ok(response_json)
	}
}

#[async_trait::async_trait]
impl MailboxLister for HttpMailboxLister {
	async fn list_mailboxes(&self, account: &Account) -> Result<ListingStream, ListingError> {
		let connection = account
			.connection
			.as_ref()
			.ok_or_else(|| ListingError::MissingConnection(account.id.clone()))?;

		info!(
			"Listing mailboxes for {} on {}:{}",
			account.username, connection.host, connection.port
		);

		let request_body = json!({
			"account": account.id,
			"username": account.username,
			"host": connection.host,
			"port": connection.port,
			"secure": connection.secure,
			"password": connection.password,
		});

		let response = self.execute_request(request_body).await?;
		let mailboxes = response.get("mailboxes").cloned().unwrap_or(response);
		let entries: Vec<ListingEntry> = serde_json::from_value(mailboxes)?;

		debug!("Listing service returned {} mailboxes", entries.len());
		Ok(stream::iter(entries.into_iter().map(Ok)).boxed())
	}

	fn name(&self) -> &'static str {
		"HttpMailboxLister"
	}
}
