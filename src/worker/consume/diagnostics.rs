//! Structured diagnostics for message handling.
//!
//! Handlers report what they do as `{trace, message, data}` records. The production sink forwards
//! them to `tracing`; tests collect them to assert on job boundaries. Records never influence
//! control flow.

use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Error,
	Info,
	Debug,
}

/// A structured diagnostic record
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRecord {
	/// Tag locating the emitting step, e.g. `MailboxSyncWorker::consume::parse`
	pub trace: &'static str,
	pub message: String,
	pub data: Option<Value>,
}

/// Sink for diagnostic records.
pub trait Diagnostics: Send + Sync {
	fn record(&self, severity: Severity, record: DiagnosticRecord);

	fn error(&self, trace: &'static str, message: String) {
		self.record(
			Severity::Error,
			DiagnosticRecord {
				trace,
				message,
				data: None,
			},
		);
	}

	fn info(&self, trace: &'static str, message: String) {
		self.record(
			Severity::Info,
			DiagnosticRecord {
				trace,
				message,
				data: None,
			},
		);
	}

	fn debug(&self, trace: &'static str, message: String, data: Option<Value>) {
		self.record(
			Severity::Debug,
			DiagnosticRecord {
				trace,
				message,
				data,
			},
		);
	}
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
	fn record(&self, severity: Severity, record: DiagnosticRecord) {
		let data = record.data.map(|d| d.to_string());
		match severity {
			Severity::Error => {
				tracing::error!(trace = record.trace, data = data.as_deref(), "{}", record.message)
			}
			Severity::Info => {
				tracing::info!(trace = record.trace, data = data.as_deref(), "{}", record.message)
			}
			Severity::Debug => {
				tracing::debug!(trace = record.trace, data = data.as_deref(), "{}", record.message)
			}
		}
	}
}

/// Keeps every record in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
	records: Mutex<Vec<(Severity, DiagnosticRecord)>>,
}

impl RecordingDiagnostics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(&self) -> Vec<(Severity, DiagnosticRecord)> {
		self.records
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Records of the given severity.
	pub fn with_severity(&self, severity: Severity) -> Vec<DiagnosticRecord> {
		self.records()
			.into_iter()
			.filter(|(s, _)| *s == severity)
			.map(|(_, record)| record)
			.collect()
	}
}

impl Diagnostics for RecordingDiagnostics {
	fn record(&self, severity: Severity, record: DiagnosticRecord) {
		self.records
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push((severity, record));
	}
}
