use crate::account::AccountPayload;
use crate::worker::WorkerError;
use crate::worker::consume::diagnostics::Diagnostics;

use serde::{Deserialize, Serialize};
use serde_json::json;

const TRACE: &str = "MailboxSyncWorker::consume::parse";

/// Action requested by an account event.
///
/// Values other than the three known ones are kept verbatim so the dispatcher can reject them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
	Insert,
	Update,
	Delete,
	Unrecognized(String),
}

impl Action {
	pub fn as_str(&self) -> &str {
		match self {
			Action::Insert => "INSERT",
			Action::Update => "UPDATE",
			Action::Delete => "DELETE",
			Action::Unrecognized(other) => other,
		}
	}
}

impl From<String> for Action {
	fn from(value: String) -> Self {
		match value.as_str() {
			"INSERT" => Action::Insert,
			"UPDATE" => Action::Update,
			"DELETE" => Action::Delete,
			_ => Action::Unrecognized(value),
		}
	}
}

impl From<Action> for String {
	fn from(action: Action) -> Self {
		action.as_str().to_string()
	}
}

/// A decoded queue message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	pub action: Action,
	pub data: AccountPayload,
}

impl Envelope {
	/// JSON view of the envelope with credentials masked
	pub fn redacted(&self) -> serde_json::Value {
		json!({
			"action": self.action.as_str(),
			"data": self.data.redacted(),
		})
	}
}

/// Decode and validate a raw message body.
///
/// `None` stands for a broker delivering an empty message. The body must be UTF-8 JSON with an
/// `action` string and a `data` object.
pub fn parse(
	raw: Option<&[u8]>,
	queue: &str,
	diagnostics: &dyn Diagnostics,
) -> Result<Envelope, WorkerError> {
	let Some(raw) = raw else {
		diagnostics.error(
			TRACE,
			format!("The message in the {} queue was empty!", queue),
		);
		return Err(WorkerError::EmptyMessage);
	};

	diagnostics.info(
		TRACE,
		format!("Parsing received message in the {} queue.", queue),
	);

	let envelope = std::str::from_utf8(raw)
		.map_err(|e| WorkerError::MalformedPayload(format!("body is not valid UTF-8: {}", e)))
		.and_then(|body| {
			serde_json::from_str::<Envelope>(body)
				.map_err(|e| WorkerError::MalformedPayload(e.to_string()))
		})
		.inspect_err(|e| {
			diagnostics.error(
				TRACE,
				format!("Could not parse the message in the {} queue: {}", queue, e),
			)
		})?;

	diagnostics.debug(TRACE, "Message parsed.".to_string(), Some(envelope.redacted()));

	Ok(envelope)
}
