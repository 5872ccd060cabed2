//! Mailbox reconciliation for newly inserted accounts.
//!
//! The `MailboxReconciler` reads the remote listing of an account and makes sure every mailbox in
//! it has a local record. Upserts are idempotent, so a run interrupted half-way is completed by
//! simply handling the same message again; records written before a failure are kept.

use crate::account::Account;
use crate::listing::MailboxLister;
use crate::worker::consume::repositories::{MailboxRecord, MailboxRepository, UpsertOutcome};
use crate::worker::{ReconciliationResult, WorkerError};

use futures_util::StreamExt;
use std::sync::Arc;
use tracing::debug;

/// Reconciles remote mailbox listings into the mailbox repository.
#[derive(Clone)]
pub struct MailboxReconciler {
	lister: Arc<dyn MailboxLister>,
	repository: Arc<dyn MailboxRepository>,
}

impl MailboxReconciler {
	pub fn new(lister: Arc<dyn MailboxLister>, repository: Arc<dyn MailboxRepository>) -> Self {
		Self { lister, repository }
	}

	/// Fetch the listing of `account` and insert the mailboxes that are not stored yet.
	///
	/// Entries are persisted one at a time in listing order. A listing failure or a failed upsert
	/// aborts the run with `WorkerError::Reconciliation`.
	pub async fn reconcile_insert(
		&self,
		account: &Account,
	) -> Result<ReconciliationResult, WorkerError> {
		debug!(
			"Listing mailboxes of account {} via {}",
			account.id,
			self.lister.name()
		);
		let mut listing = account
			.mailboxes(self.lister.as_ref())
			.await
			.map_err(|e| WorkerError::reconciliation(None, e))?;

		let mut result = ReconciliationResult::default();

		while let Some(entry) = listing.next().await {
			let entry = entry.map_err(|e| WorkerError::reconciliation(None, e))?;
			result.seen += 1;

			let identity = entry.identity().to_string();
			let record = MailboxRecord::from_listing(entry, &account.id);
			let outcome = self
				.repository
				.upsert(&record)
				.await
				.map_err(|e| WorkerError::reconciliation(Some(identity), e))?;

			match outcome {
				UpsertOutcome::Inserted => {
					result.persisted += 1;
					debug!("Persisted mailbox {} for account {}", record.name, account.id);
				}
				UpsertOutcome::AlreadyPresent => {
					debug!("Mailbox {} for account {} already present", record.name, account.id);
				}
			}
		}

		Ok(result)
	}
}
