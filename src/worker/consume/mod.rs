//! Account Event Consumption Module
//!
//! This module holds the logic run for every message delivered on the IMAP accounts queue.
//! It is composed of several submodules, each responsible for one step of handling an event:
//!
//! - `envelope`: Validates and decodes a raw message into an action and an account payload.
//! - `dispatcher`: Routes a decoded envelope to the handler for its action and reports the outcome.
//! - `reconciler`: Fetches the remote mailbox listing of an account and upserts it into local storage.
//! - `repositories`: Storage abstraction for mailbox records with in-memory and file-backed implementations.
//! - `diagnostics`: Structured diagnostic records emitted while a message is handled.
//!
//! The dispatcher wires the steps together. Collaborators are injected, so every step can be
//! exercised against test doubles.

/// Structured diagnostics emitted during message handling
pub mod diagnostics;
/// Per-message dispatch over envelope actions
pub mod dispatcher;
/// Envelope decoding and validation
pub mod envelope;
/// Remote listing reconciliation
pub mod reconciler;
/// Mailbox record persistence
pub mod repositories;

pub use dispatcher::*;
