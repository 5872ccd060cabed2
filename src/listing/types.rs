//! Types for the remote mailbox listing

use crate::account::Account;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One entry of a remote account's mailbox listing.
///
/// Mirrors an IMAP LIST response line: the mailbox name, its hierarchy delimiter and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
	/// Full mailbox name, e.g. `INBOX` or `Archive/2024`.
	pub name: String,
	/// Hierarchy delimiter reported by the server, if any.
	#[serde(default)]
	pub delimiter: Option<String>,
	/// Mailbox attributes such as `\HasNoChildren` or `\Noselect`.
	#[serde(default)]
	pub flags: Vec<String>,
}

impl ListingEntry {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			delimiter: None,
			flags: Vec::new(),
		}
	}

	/// Identity of the entry within its account.
	pub fn identity(&self) -> &str {
		&self.name
	}
}

/// A finite, non-restartable sequence of listing entries.
pub type ListingStream = Pin<Box<dyn Stream<Item = Result<ListingEntry, ListingError>> + Send>>;

/// Source of remote mailbox listings
#[async_trait::async_trait]
pub trait MailboxLister: Send + Sync {
	/// Open the mailbox listing of `account`.
	///
	/// Connection failures may surface here or while the returned stream is polled.
	async fn list_mailboxes(&self, account: &Account) -> Result<ListingStream, ListingError>;

	/// Get the name of this lister for logging.
	fn name(&self) -> &'static str;
}

/// Error types for remote listing operations
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Listing service error: {0}")]
	Remote(String),

	#[error("Account {0} has no IMAP connection settings")]
	MissingConnection(String),
}

impl ListingError {
	/// Whether asking again later may succeed.
	///
	/// A missing connection is a property of the account payload and never goes away.
	pub fn is_transient(&self) -> bool {
		!matches!(self, ListingError::MissingConnection(_))
	}
}
