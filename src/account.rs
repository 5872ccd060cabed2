//! IMAP account payloads and the handles materialized from them.
//!
//! An `AccountPayload` is the opaque `data` object of a queue envelope. It is kept as the raw JSON
//! object it arrived as and only interpreted when the dispatcher materializes an `Account` from it.

use crate::listing::{ListingError, ListingStream, MailboxLister};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const IMAPS_PORT: u16 = 993;
const IMAP_PORT: u16 = 143;

/// Errors raised while turning a payload into an `Account`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
	#[error("missing required field `{0}`")]
	MissingField(&'static str),

	#[error("field `{field}` must be {expected}")]
	InvalidField {
		field: &'static str,
		expected: &'static str,
	},
}

/// Opaque account data carried by an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountPayload(Map<String, Value>);

impl AccountPayload {
	pub fn new(fields: Map<String, Value>) -> Self {
		Self(fields)
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// JSON view of the payload with the password masked, for diagnostics.
	pub fn redacted(&self) -> Value {
		let mut fields = self.0.clone();
		if let Some(password) = fields.get_mut("password") {
			*password = Value::String("***".to_string());
		}
		Value::Object(fields)
	}
}

/// Connection settings for the remote IMAP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImapConnection {
	pub host: String,
	pub port: u16,
	pub secure: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
}

/// A materialized IMAP account.
///
/// Built fresh for every message and dropped once the handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
	pub id: String,
	pub username: String,
	pub connection: Option<ImapConnection>,
}

impl Account {
	/// Build an account handle from an envelope payload.
	///
	/// No network or storage access happens here. `id` may be a string or a number, `username`
	/// must be a non-empty string. Connection fields are optional; when `host` is present the
	/// port defaults to 993 for secure connections and 143 otherwise.
	pub fn materialize(payload: &AccountPayload) -> Result<Self, AccountError> {
		let id = match payload.get("id") {
			Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
			Some(Value::Number(id)) => id.to_string(),
			Some(Value::Null) | None => return Err(AccountError::MissingField("id")),
			Some(Value::String(_)) => return Err(AccountError::MissingField("id")),
			Some(_) => {
				return Err(AccountError::InvalidField {
					field: "id",
					expected: "a string or a number",
				});
			}
		};

		let username = match required_str(payload, "username")? {
			Some(username) => username,
			None => return Err(AccountError::MissingField("username")),
		};

		let connection = match optional_str(payload, "host")? {
			Some(host) => {
				let secure = optional_bool(payload, "secure")?.unwrap_or(true);
				let port = optional_port(payload)?.unwrap_or(if secure { IMAPS_PORT } else { IMAP_PORT });
				Some(ImapConnection {
					host,
					port,
					secure,
					password: optional_str(payload, "password")?,
				})
			}
			None => None,
		};

		Ok(Self {
			id,
			username,
			connection,
		})
	}

	/// Fetch the remote mailbox listing for this account.
	pub async fn mailboxes(&self, lister: &dyn MailboxLister) -> Result<ListingStream, ListingError> {
		lister.list_mailboxes(self).await
	}
}

fn required_str(payload: &AccountPayload, field: &'static str) -> Result<Option<String>, AccountError> {
	Ok(optional_str(payload, field)?.filter(|value| !value.trim().is_empty()))
}

fn optional_str(payload: &AccountPayload, field: &'static str) -> Result<Option<String>, AccountError> {
	match payload.get(field) {
		Some(Value::String(value)) => Ok(Some(value.clone())),
		Some(Value::Null) | None => Ok(None),
		Some(_) => Err(AccountError::InvalidField {
			field,
			expected: "a string",
		}),
	}
}

fn optional_bool(payload: &AccountPayload, field: &'static str) -> Result<Option<bool>, AccountError> {
	match payload.get(field) {
		Some(Value::Bool(value)) => Ok(Some(*value)),
		Some(Value::Null) | None => Ok(None),
		Some(_) => Err(AccountError::InvalidField {
			field,
			expected: "a boolean",
		}),
	}
}

fn optional_port(payload: &AccountPayload) -> Result<Option<u16>, AccountError> {
	let invalid = AccountError::InvalidField {
		field: "port",
		expected: "an integer between 1 and 65535",
	};
	match payload.get("port") {
		Some(Value::Number(port)) => match port.as_u64().and_then(|p| u16::try_from(p).ok()) {
			Some(port) if port > 0 => Ok(Some(port)),
			_ => Err(invalid),
		},
		Some(Value::Null) | None => Ok(None),
		Some(_) => Err(invalid),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn payload(value: Value) -> AccountPayload {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn materializes_identifying_fields() {
		let account = Account::materialize(&payload(json!({"id": "a1", "username": "u@example.com"}))).unwrap();
		assert_eq!(account.id, "a1");
		assert_eq!(account.username, "u@example.com");
		assert_eq!(account.connection, None);
	}

	#[test]
	fn numeric_ids_are_accepted() {
		let account = Account::materialize(&payload(json!({"id": 42, "username": "u"}))).unwrap();
		assert_eq!(account.id, "42");
	}

	#[test]
	fn connection_defaults_follow_secure_flag() {
		let secure = Account::materialize(&payload(json!({
			"id": "a1", "username": "u", "host": "imap.example.com"
		})))
		.unwrap();
		let connection = secure.connection.unwrap();
		assert!(connection.secure);
		assert_eq!(connection.port, 993);

		let plain = Account::materialize(&payload(json!({
			"id": "a1", "username": "u", "host": "imap.example.com", "secure": false, "password": "hunter2"
		})))
		.unwrap();
		let connection = plain.connection.unwrap();
		assert_eq!(connection.port, 143);
		assert_eq!(connection.password.as_deref(), Some("hunter2"));
	}

	#[test]
	fn missing_identifiers_are_rejected() {
		assert_eq!(
			Account::materialize(&payload(json!({"username": "u"}))),
			Err(AccountError::MissingField("id"))
		);
		assert_eq!(
			Account::materialize(&payload(json!({"id": "a1", "username": "  "}))),
			Err(AccountError::MissingField("username"))
		);
		assert_eq!(
			Account::materialize(&payload(json!({"id": "", "username": "u"}))),
			Err(AccountError::MissingField("id"))
		);
	}

	#[test]
	fn wrongly_typed_fields_are_rejected() {
		assert!(matches!(
			Account::materialize(&payload(json!({"id": ["a1"], "username": "u"}))),
			Err(AccountError::InvalidField { field: "id", .. })
		));
		assert!(matches!(
			Account::materialize(&payload(json!({"id": "a1", "username": "u", "host": "h", "port": 70000}))),
			Err(AccountError::InvalidField { field: "port", .. })
		));
	}

	#[test]
	fn redaction_masks_password_only() {
		let redacted = payload(json!({"id": "a1", "username": "u", "password": "secret"})).redacted();
		assert_eq!(redacted, json!({"id": "a1", "username": "u", "password": "***"}));
	}
}
