use super::types::*;
use crate::account::Account;

use futures_util::{StreamExt, stream};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lister serving fixed listings keyed by account id.
///
/// Accounts without a listing get an empty one. A listing can be made to fail after a number of
/// entries to emulate a connection dropped mid-LIST, or to fail before any entry when the server
/// cannot be reached at all.
#[derive(Default)]
pub struct StaticMailboxLister {
	listings: HashMap<String, Vec<ListingEntry>>,
	fail_after: HashMap<String, usize>,
	unreachable: HashSet<String>,
	calls: AtomicUsize,
}

impl StaticMailboxLister {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_listing<I, N>(mut self, account_id: &str, names: I) -> Self
	where
		I: IntoIterator<Item = N>,
		N: Into<String>,
	{
		self.listings.insert(
			account_id.to_string(),
			names.into_iter().map(ListingEntry::new).collect(),
		);
		self
	}

	pub fn with_entries(mut self, account_id: &str, entries: Vec<ListingEntry>) -> Self {
		self.listings.insert(account_id.to_string(), entries);
		self
	}

	/// Yield `count` entries for the account, then a listing error.
	pub fn failing_after(mut self, account_id: &str, count: usize) -> Self {
		self.fail_after.insert(account_id.to_string(), count);
		self
	}

	/// Fail to open the account's listing at all.
	pub fn unreachable(mut self, account_id: &str) -> Self {
		self.unreachable.insert(account_id.to_string());
		self
	}

	/// Number of listings opened so far.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait::async_trait]
impl MailboxLister for StaticMailboxLister {
	async fn list_mailboxes(&self, account: &Account) -> Result<ListingStream, ListingError> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		if self.unreachable.contains(&account.id) {
			return Err(ListingError::Remote(format!(
				"connection to the server of account {} refused",
				account.id
			)));
		}

		let entries = self.listings.get(&account.id).cloned().unwrap_or_default();
		let mut items: Vec<Result<ListingEntry, ListingError>> = match self.fail_after.get(&account.id) {
			Some(count) => entries.into_iter().take(*count).map(Ok).collect(),
			None => entries.into_iter().map(Ok).collect(),
		};
		if self.fail_after.contains_key(&account.id) {
			items.push(Err(ListingError::Remote("connection reset during LIST".to_string())));
		}

		Ok(stream::iter(items).boxed())
	}

	fn name(&self) -> &'static str {
		"StaticMailboxLister"
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn account(id: &str) -> Account {
		Account {
			id: id.to_string(),
			username: "u@example.com".to_string(),
			connection: None,
		}
	}

	#[tokio::test]
	async fn serves_listing_in_order_and_counts_calls() {
		let lister = StaticMailboxLister::new().with_listing("a1", ["INBOX", "Sent", "Trash"]);

		let names: Vec<String> = lister
			.list_mailboxes(&account("a1"))
			.await
			.unwrap()
			.map(|entry| entry.unwrap().name)
			.collect()
			.await;

		assert_eq!(names, vec!["INBOX", "Sent", "Trash"]);
		assert_eq!(lister.calls(), 1);
	}

	#[tokio::test]
	async fn failing_listing_ends_with_error() {
		let lister = StaticMailboxLister::new()
			.with_listing("a1", ["INBOX", "Sent"])
			.failing_after("a1", 1);

		let items: Vec<_> = lister.list_mailboxes(&account("a1")).await.unwrap().collect().await;

		assert_eq!(items.len(), 2);
		assert!(items[0].is_ok());
		assert!(matches!(items[1], Err(ListingError::Remote(_))));
	}

	#[tokio::test]
	async fn unreachable_account_fails_on_open() {
		let lister = StaticMailboxLister::new()
			.with_listing("a1", ["INBOX"])
			.unreachable("a1");

		let result = lister.list_mailboxes(&account("a1")).await;

		assert!(matches!(result, Err(ListingError::Remote(_))));
		assert_eq!(lister.calls(), 1);
	}
}
