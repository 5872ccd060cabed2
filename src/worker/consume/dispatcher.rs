//! Per-message dispatch for account events.
//!
//! The `Worker` is invoked once per delivered message. It parses the message, routes the envelope
//! on its action and reports success or failure to the transport, which decides between
//! acknowledging and requeueing. Nothing is retried or swallowed here.

use crate::account::Account;
use crate::listing::MailboxLister;
use crate::worker::consume::diagnostics::Diagnostics;
use crate::worker::consume::envelope::{self, Action, Envelope};
use crate::worker::consume::reconciler::MailboxReconciler;
use crate::worker::consume::repositories::MailboxRepository;
use crate::worker::{ReconciliationResult, WorkerError};

use std::sync::Arc;

const TRACE_INSERT: &str = "MailboxSyncWorker::consume::insert";
const TRACE_DISPATCH: &str = "MailboxSyncWorker::consume::dispatch";

/// Outcome of a successfully handled message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// An insert event reconciled the account's mailboxes
	Reconciled(ReconciliationResult),
	/// An update event; recognized, nothing to do yet
	Updated,
	/// A delete event; recognized, nothing to do yet
	Deleted,
}

/// Handles messages from the IMAP accounts queue.
///
/// All collaborators are injected. The worker keeps no state between messages.
pub struct Worker {
	queue: String,
	diagnostics: Arc<dyn Diagnostics>,
	reconciler: MailboxReconciler,
}

impl Worker {
	pub fn new(
		queue: impl Into<String>,
		diagnostics: Arc<dyn Diagnostics>,
		lister: Arc<dyn MailboxLister>,
		repository: Arc<dyn MailboxRepository>,
	) -> Self {
		Self {
			queue: queue.into(),
			diagnostics,
			reconciler: MailboxReconciler::new(lister, repository),
		}
	}

	pub fn queue(&self) -> &str {
		&self.queue
	}

	/// Handle one delivery: parse the raw body, then dispatch it.
	///
	/// Parse failures are reported by the parser itself; dispatch failures get an error record
	/// here before they are returned.
	pub async fn consume(&self, raw: Option<&[u8]>) -> Result<DispatchOutcome, WorkerError> {
		let envelope = envelope::parse(raw, &self.queue, self.diagnostics.as_ref())?;

		self.dispatch(envelope).await.inspect_err(|e| {
			self.diagnostics.error(
				TRACE_DISPATCH,
				format!("Job from the {} queue failed: {}", self.queue, e),
			)
		})
	}

	/// Route a decoded envelope to the handler for its action.
	pub async fn dispatch(&self, envelope: Envelope) -> Result<DispatchOutcome, WorkerError> {
		match envelope.action {
			Action::Insert => {
				let account = Account::materialize(&envelope.data)?;
				let result = self.insert_handler(&account).await?;
				Ok(DispatchOutcome::Reconciled(result))
			}
			// TODO: rename and remove local mailboxes once the payload carries the previous account state.
			Action::Update => Ok(DispatchOutcome::Updated),
			Action::Delete => Ok(DispatchOutcome::Deleted),
			Action::Unrecognized(action) => Err(WorkerError::UnknownAction(action)),
		}
	}

	/// Import all mailboxes of a newly inserted account.
	async fn insert_handler(&self, account: &Account) -> Result<ReconciliationResult, WorkerError> {
		self.diagnostics.info(
			TRACE_INSERT,
			format!(
				"Starting job: Mailboxes import for account {}.",
				account.username
			),
		);

		let result = self.reconciler.reconcile_insert(account).await?;

		self.diagnostics.info(
			TRACE_INSERT,
			format!(
				"Finished job: Mailboxes import for account {} ({}).",
				account.username,
				result.summary()
			),
		);
		Ok(result)
	}
}
