//! Remote mailbox listing for IMAP accounts
//!
//! This module provides the `MailboxLister` collaborator used by the reconciler to obtain the
//! folder listing of a remote account, an HTTP client for a listing service that speaks IMAP on
//! the worker's behalf, and a fixed in-memory lister for tests and local runs.

/// HTTP client for the mailbox listing service
mod client;
/// In-memory lister with fixed listings
mod memory;
/// Listing entries, errors and the lister trait
mod types;

pub use client::HttpMailboxLister;
pub use memory::StaticMailboxLister;
pub use types::*;
