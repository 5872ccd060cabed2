use crate::listing::ListingEntry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Longest hex-encoded account id used verbatim in a file name
const MAX_HEX_ID_LEN: usize = 128;

/// Locally stored mailbox of an account, keyed by `(account_id, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxRecord {
	pub account_id: String,
	pub name: String,
	pub delimiter: Option<String>,
	pub flags: Vec<String>,
	/// Time of the first insert; redelivery never touches it
	pub created_at: DateTime<Utc>,
}

impl MailboxRecord {
	/// Build the record for a listing entry scoped to an account
	pub fn from_listing(entry: ListingEntry, account_id: &str) -> Self {
		Self {
			account_id: account_id.to_string(),
			name: entry.name,
			delimiter: entry.delimiter,
			flags: entry.flags,
			created_at: Utc::now(),
		}
	}

	fn same_key(&self, other: &MailboxRecord) -> bool {
		self.account_id == other.account_id && self.name == other.name
	}
}

/// Result of an idempotent upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
	Inserted,
	AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
}

/// Repository for mailbox records.
///
/// `upsert` inserts a record only if no record with the same `(account_id, name)` exists, so
/// replaying a listing never creates duplicates.
#[async_trait::async_trait]
pub trait MailboxRepository: Send + Sync {
	async fn upsert(&self, record: &MailboxRecord) -> Result<UpsertOutcome, RepositoryError>;
	async fn list(&self, account_id: &str) -> Result<Vec<MailboxRecord>, RepositoryError>;
}

/// In-memory implementation of MailboxRepository, in insertion order
#[derive(Default)]
pub struct InMemoryMailboxRepository {
	records: Mutex<Vec<MailboxRecord>>,
}

impl InMemoryMailboxRepository {
	pub fn new() -> Self {
		Self::default()
	}

	/// Total number of records across accounts
	pub async fn len(&self) -> usize {
		self.records.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.records.lock().await.is_empty()
	}
}

#[async_trait::async_trait]
impl MailboxRepository for InMemoryMailboxRepository {
	async fn upsert(&self, record: &MailboxRecord) -> Result<UpsertOutcome, RepositoryError> {
		let mut records = self.records.lock().await;
		if records.iter().any(|r| r.same_key(record)) {
			return Ok(UpsertOutcome::AlreadyPresent);
		}
		records.push(record.clone());
		Ok(UpsertOutcome::Inserted)
	}

	async fn list(&self, account_id: &str) -> Result<Vec<MailboxRecord>, RepositoryError> {
		Ok(self
			.records
			.lock()
			.await
			.iter()
			.filter(|r| r.account_id == account_id)
			.cloned()
			.collect())
	}
}

/// File-based implementation of MailboxRepository.
///
/// Each account's mailboxes live in one JSON file. Writes go through a temporary file and a
/// rename, and are serialized by an in-process lock.
pub struct FileMailboxRepository {
	data_dir: PathBuf,
	write_lock: Mutex<()>,
}

impl FileMailboxRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			data_dir,
			write_lock: Mutex::new(()),
		}
	}

	/// File holding an account's mailboxes.
	///
	/// Ids whose hex form would not fit a file name are replaced by their SHA-256 digest.
	fn get_account_filename(&self, account_id: &str) -> PathBuf {
		let encoded = hex::encode(account_id);
		let filename = if encoded.len() <= MAX_HEX_ID_LEN {
			format!("mailboxes_{}.json", encoded)
		} else {
			format!("mailboxes_sha256_{}.json", hex::encode(Sha256::digest(account_id)))
		};
		self.data_dir.join(filename)
	}

	async fn read_account(&self, account_id: &str) -> Result<Vec<MailboxRecord>, RepositoryError> {
		let filename = self.get_account_filename(account_id);
		match tokio::fs::read_to_string(&filename).await {
			Ok(content) => Ok(serde_json::from_str(&content)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait::async_trait]
impl MailboxRepository for FileMailboxRepository {
	async fn upsert(&self, record: &MailboxRecord) -> Result<UpsertOutcome, RepositoryError> {
		let _guard = self.write_lock.lock().await;

		let mut records = self.read_account(&record.account_id).await?;
		if records.iter().any(|r| r.same_key(record)) {
			debug!(
				"Mailbox {} of account {} already stored",
				record.name, record.account_id
			);
			return Ok(UpsertOutcome::AlreadyPresent);
		}
		records.push(record.clone());

		tokio::fs::create_dir_all(&self.data_dir).await?;
		let filename = self.get_account_filename(&record.account_id);
		let tmp_filename = filename.with_extension("json.tmp");
		tokio::fs::write(&tmp_filename, serde_json::to_string_pretty(&records)?).await?;
		tokio::fs::rename(&tmp_filename, &filename).await?;

		info!(
			"Saved mailbox {} of account {} to {:?}",
			record.name, record.account_id, filename
		);
		Ok(UpsertOutcome::Inserted)
	}

	async fn list(&self, account_id: &str) -> Result<Vec<MailboxRecord>, RepositoryError> {
		self.read_account(account_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(account_id: &str, name: &str) -> MailboxRecord {
		MailboxRecord::from_listing(ListingEntry::new(name), account_id)
	}

	#[tokio::test]
	async fn in_memory_upsert_is_insert_if_absent() {
		let repo = InMemoryMailboxRepository::new();

		assert_eq!(repo.upsert(&record("a1", "INBOX")).await.unwrap(), UpsertOutcome::Inserted);
		assert_eq!(
			repo.upsert(&record("a1", "INBOX")).await.unwrap(),
			UpsertOutcome::AlreadyPresent
		);
		assert_eq!(repo.upsert(&record("a2", "INBOX")).await.unwrap(), UpsertOutcome::Inserted);

		assert_eq!(repo.len().await, 2);
		assert_eq!(repo.list("a1").await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn file_repository_persists_across_instances() {
		let dir = tempfile::tempdir().unwrap();
		let repo = FileMailboxRepository::new(dir.path().to_path_buf());

		let mut sent = record("a1", "Sent");
		sent.delimiter = Some("/".to_string());
		sent.flags = vec!["\\Sent".to_string()];

		assert_eq!(repo.upsert(&record("a1", "INBOX")).await.unwrap(), UpsertOutcome::Inserted);
		assert_eq!(repo.upsert(&sent).await.unwrap(), UpsertOutcome::Inserted);

		let reopened = FileMailboxRepository::new(dir.path().to_path_buf());
		let stored = reopened.list("a1").await.unwrap();
		assert_eq!(stored.len(), 2);
		assert_eq!(stored[0].name, "INBOX");
		assert_eq!(stored[1], sent);
		assert_eq!(
			reopened.upsert(&record("a1", "Sent")).await.unwrap(),
			UpsertOutcome::AlreadyPresent
		);
	}

	#[tokio::test]
	async fn file_repository_keeps_first_created_at() {
		let dir = tempfile::tempdir().unwrap();
		let repo = FileMailboxRepository::new(dir.path().join("nested"));

		let first = record("a1", "INBOX");
		repo.upsert(&first).await.unwrap();
		let mut later = record("a1", "INBOX");
		later.created_at = first.created_at + chrono::Duration::hours(1);
		repo.upsert(&later).await.unwrap();

		let stored = repo.list("a1").await.unwrap();
		assert_eq!(stored, vec![first]);
	}

	#[tokio::test]
	async fn unknown_account_lists_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let repo = FileMailboxRepository::new(dir.path().to_path_buf());
		assert!(repo.list("../etc/passwd").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn long_account_ids_get_bounded_file_names() {
		let dir = tempfile::tempdir().unwrap();
		let repo = FileMailboxRepository::new(dir.path().to_path_buf());
		let long_id = "x".repeat(200);

		assert_eq!(repo.upsert(&record(&long_id, "INBOX")).await.unwrap(), UpsertOutcome::Inserted);
		assert_eq!(
			repo.upsert(&record(&long_id, "INBOX")).await.unwrap(),
			UpsertOutcome::AlreadyPresent
		);
		repo.upsert(&record("a1", "INBOX")).await.unwrap();

		let stored = repo.list(&long_id).await.unwrap();
		assert_eq!(stored.len(), 1);
		assert_eq!(stored[0].account_id, long_id);

		let filename = repo.get_account_filename(&long_id);
		let filename = filename.file_name().unwrap().to_str().unwrap();
		assert!(filename.starts_with("mailboxes_sha256_"));
		assert!(filename.len() < 255);
		assert_eq!(
			repo.get_account_filename("a1").file_name().unwrap(),
			"mailboxes_6131.json"
		);
	}
}
