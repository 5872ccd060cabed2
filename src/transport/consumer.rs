use super::source::{MessageSource, TransportError};
use crate::worker::{DispatchOutcome, Worker};

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use std::time::Duration;
use tracing::{error, info, warn};

/// When and how fast failed messages are redelivered
#[derive(Debug, Clone)]
pub struct RedeliveryPolicy {
	/// Deliveries allowed per message before it is rejected for good
	pub max_deliveries: u32,
	/// Delay before the first redelivery
	pub initial_interval: Duration,
	/// Upper bound for the redelivery delay
	pub max_interval: Duration,
}

impl Default for RedeliveryPolicy {
	fn default() -> Self {
		Self {
			max_deliveries: 5,
			initial_interval: Duration::from_millis(500),
			max_interval: Duration::from_secs(30),
		}
	}
}

impl RedeliveryPolicy {
	/// Delay to wait before redelivering a message that failed on its `delivery_count`-th delivery.
	///
	/// Doubles with every delivery, capped at `max_interval`.
	pub fn delay_for(&self, delivery_count: u32) -> Duration {
		let mut backoff = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_interval)
			.with_max_interval(self.max_interval)
			.with_multiplier(2.0)
			.with_randomization_factor(0.0)
			.with_max_elapsed_time(None)
			.build();

		let mut delay = self.initial_interval;
		for _ in 0..delivery_count.max(1) {
			if let Some(next) = backoff.next_backoff() {
				delay = next;
			}
		}
		delay.min(self.max_interval)
	}
}

/// Counters for one consumer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
	pub acked: usize,
	pub requeued: usize,
	pub rejected: usize,
}

impl ConsumerStats {
	pub fn summary(&self) -> String {
		format!(
			"{} acknowledged, {} requeued, {} rejected",
			self.acked, self.requeued, self.rejected
		)
	}
}

/// Feeds deliveries from a message source to the worker, one at a time.
pub struct Consumer {
	worker: Worker,
	policy: RedeliveryPolicy,
}

impl Consumer {
	pub fn new(worker: Worker, policy: RedeliveryPolicy) -> Self {
		Self { worker, policy }
	}

	/// Consume until the source is exhausted.
	///
	/// Successful messages are acknowledged. Retryable failures are requeued after a backoff
	/// delay until `max_deliveries` is reached; every other failure is rejected without requeue.
	pub async fn run(&self, source: &mut dyn MessageSource) -> Result<ConsumerStats, TransportError> {
		let mut stats = ConsumerStats::default();

		while let Some(delivery) = source.recv().await? {
			match self.worker.consume(delivery.body.as_deref()).await {
				Ok(outcome) => {
					match outcome {
						DispatchOutcome::Reconciled(result) => {
							info!("Delivery {} reconciled: {}", delivery.tag, result.summary())
						}
						other => info!("Delivery {} handled: {:?}", delivery.tag, other),
					}
					source.ack(delivery.tag).await?;
					stats.acked += 1;
				}
				Err(e) if e.is_retryable() && delivery.delivery_count < self.policy.max_deliveries => {
					let delay = self.policy.delay_for(delivery.delivery_count);
					warn!(
						"Delivery {} failed (attempt {}/{}), requeueing in {:?}: {}",
						delivery.tag, delivery.delivery_count, self.policy.max_deliveries, delay, e
					);
					tokio::time::sleep(delay).await;
					source.nack(delivery.tag, true).await?;
					stats.requeued += 1;
				}
				Err(e) => {
					error!(
						"Rejecting delivery {} from the {} queue after {} attempt(s): {}",
						delivery.tag,
						self.worker.queue(),
						delivery.delivery_count,
						e
					);
					source.nack(delivery.tag, false).await?;
					stats.rejected += 1;
				}
			}
		}

		info!("Consumer finished: {}", stats.summary());
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::listing::{HttpMailboxLister, StaticMailboxLister};
	use crate::transport::LineSource;
	use crate::worker::consume::diagnostics::RecordingDiagnostics;
	use crate::worker::consume::repositories::{InMemoryMailboxRepository, MailboxRepository};
	use std::sync::Arc;
	use tokio::io::BufReader;

	#[test]
	fn delay_doubles_and_is_capped() {
		let policy = RedeliveryPolicy {
			max_deliveries: 10,
			initial_interval: Duration::from_millis(100),
			max_interval: Duration::from_millis(350),
		};

		assert_eq!(policy.delay_for(1), Duration::from_millis(100));
		assert_eq!(policy.delay_for(2), Duration::from_millis(200));
		assert_eq!(policy.delay_for(3), Duration::from_millis(350));
		assert_eq!(policy.delay_for(8), Duration::from_millis(350));
	}

	#[tokio::test(start_paused = true)]
	async fn acks_rejects_and_retries_until_limit() {
		let lister = Arc::new(
			StaticMailboxLister::new()
				.with_listing("a1", ["INBOX"])
				.with_listing("broken", ["INBOX"])
				.failing_after("broken", 0),
		);
		let repository = Arc::new(InMemoryMailboxRepository::new());
		let worker = Worker::new(
			"imap-accounts",
			Arc::new(RecordingDiagnostics::new()),
			lister.clone(),
			repository.clone(),
		);
		let consumer = Consumer::new(
			worker,
			RedeliveryPolicy {
				max_deliveries: 3,
				..RedeliveryPolicy::default()
			},
		);

		let input = concat!(
			r#"{"action":"INSERT","data":{"id":"a1","username":"u@example.com"}}"#,
			"\n",
			"\n",
			r#"{"action":"INSERT","data":{"id":"broken","username":"b@example.com"}}"#,
			"\n",
			r#"{"action":"DELETE","data":{"id":"a1"}}"#,
			"\n",
		);
		let mut source = LineSource::new(BufReader::new(input.as_bytes()));

		let stats = consumer.run(&mut source).await.unwrap();

		assert_eq!(
			stats,
			ConsumerStats {
				acked: 2,
				requeued: 2,
				rejected: 2,
			}
		);
		assert_eq!(lister.calls(), 4);
		assert_eq!(repository.list("a1").await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn undecodable_line_is_rejected_and_next_message_handled() {
		let lister = Arc::new(StaticMailboxLister::new().with_listing("a1", ["INBOX", "Sent"]));
		let repository = Arc::new(InMemoryMailboxRepository::new());
		let worker = Worker::new(
			"imap-accounts",
			Arc::new(RecordingDiagnostics::new()),
			lister.clone(),
			repository.clone(),
		);
		let consumer = Consumer::new(worker, RedeliveryPolicy::default());

		let mut input = vec![0xffu8, 0xfe, b'\n'];
		input.extend_from_slice(
			br#"{"action":"INSERT","data":{"id":"a1","username":"u@example.com"}}"#,
		);
		input.push(b'\n');
		let mut source = LineSource::new(BufReader::new(input.as_slice()));

		let stats = consumer.run(&mut source).await.unwrap();

		assert_eq!(
			stats,
			ConsumerStats {
				acked: 1,
				requeued: 0,
				rejected: 1,
			}
		);
		assert_eq!(lister.calls(), 1);
		assert_eq!(repository.list("a1").await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn account_without_connection_is_rejected_without_requeue() {
		let lister = HttpMailboxLister::new(
			"http://127.0.0.1:9/mailboxes".to_string(),
			Duration::from_secs(1),
		)
		.unwrap();
		let repository = Arc::new(InMemoryMailboxRepository::new());
		let worker = Worker::new(
			"imap-accounts",
			Arc::new(RecordingDiagnostics::new()),
			Arc::new(lister),
			repository.clone(),
		);
		let consumer = Consumer::new(worker, RedeliveryPolicy::default());

		let input = concat!(
			r#"{"action":"INSERT","data":{"id":"a1","username":"u@example.com"}}"#,
			"\n",
		);
		let mut source = LineSource::new(BufReader::new(input.as_bytes()));

		let stats = consumer.run(&mut source).await.unwrap();

		assert_eq!(
			stats,
			ConsumerStats {
				acked: 0,
				requeued: 0,
				rejected: 1,
			}
		);
		assert!(repository.is_empty().await);
	}
}
