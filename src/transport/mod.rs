//! Queue transport integration
//!
//! The worker core only reports success or failure for a message. This module owns what happens
//! next: acknowledging, requeueing with a backoff delay, or rejecting a delivery for good.

/// Delivery loop driving the worker
mod consumer;
/// Message sources and deliveries
mod source;

pub use consumer::{Consumer, ConsumerStats, RedeliveryPolicy};
pub use source::{Delivery, LineSource, MessageSource, TransportError};
