use crate::account::AccountError;
use crate::listing::ListingError;
use crate::worker::consume::repositories::RepositoryError;

use serde::{Deserialize, Serialize};

/// Summary of one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
	/// Listing entries received from the remote server
	pub seen: usize,
	/// Entries that were not stored yet and got inserted
	pub persisted: usize,
}

impl ReconciliationResult {
	/// Get a human-readable summary
	pub fn summary(&self) -> String {
		format!(
			"{} mailboxes seen, {} newly persisted, {} already present",
			self.seen,
			self.persisted,
			self.seen - self.persisted
		)
	}
}

/// Underlying failure of a reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileCause {
	#[error("remote listing failed: {0}")]
	Listing(#[from] ListingError),

	#[error("persistence failed: {0}")]
	Repository(#[from] RepositoryError),
}

impl ReconcileCause {
	pub fn is_transient(&self) -> bool {
		match self {
			ReconcileCause::Listing(e) => e.is_transient(),
			ReconcileCause::Repository(_) => true,
		}
	}
}

/// Errors raised while handling a queue message
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
	#[error("The received message from the queue was empty")]
	EmptyMessage,

	#[error("Malformed message payload: {0}")]
	MalformedPayload(String),

	#[error("Invalid account payload: {0}")]
	InvalidAccountPayload(#[from] AccountError),

	#[error("Unknown action: {0}")]
	UnknownAction(String),

	#[error("Reconciliation error ({}): {cause}", .entry.as_deref().unwrap_or("listing"))]
	Reconciliation {
		/// Mailbox being persisted when the failure happened, if any
		entry: Option<String>,
		#[source]
		cause: ReconcileCause,
	},
}

impl WorkerError {
	pub fn reconciliation(entry: Option<String>, cause: impl Into<ReconcileCause>) -> Self {
		WorkerError::Reconciliation {
			entry,
			cause: cause.into(),
		}
	}

	/// Whether redelivering the same message may succeed.
	///
	/// Only reconciliation failures caused by remote or storage state qualify; every other error,
	/// including an account without connection settings, is a property of the message itself.
	pub fn is_retryable(&self) -> bool {
		match self {
			WorkerError::Reconciliation { cause, .. } => cause.is_transient(),
			_ => false,
		}
	}
}
