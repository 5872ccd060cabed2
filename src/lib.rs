//! Mailbox sync worker.
//!
//! Consumes IMAP account lifecycle events from a queue and keeps a local copy of each account's
//! remote mailbox listing. See [`worker::Worker`] for the per-message entry point and
//! [`transport::Consumer`] for the delivery loop around it.

pub mod account;
pub mod config;
pub mod listing;
pub mod transport;
pub mod worker;
