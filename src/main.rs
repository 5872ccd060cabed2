use mailbox_sync_worker::config::WorkerConfig;
use mailbox_sync_worker::listing::HttpMailboxLister;
use mailbox_sync_worker::transport::{Consumer, LineSource};
use mailbox_sync_worker::worker::Worker;
use mailbox_sync_worker::worker::consume::diagnostics::TracingDiagnostics;
use mailbox_sync_worker::worker::consume::repositories::FileMailboxRepository;

use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let config = match WorkerConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	info!("Starting mailbox sync worker");

	let lister = match HttpMailboxLister::new(config.listing_url.clone(), config.http_timeout) {
		Ok(lister) => lister,
		Err(e) => {
			error!("Failed to create listing client: {}", e);
			return;
		}
	};

	info!("Created listing client for {}", config.listing_url);

	let repository = FileMailboxRepository::new(config.data_dir.clone());

	info!("Storing mailboxes under {:?}", config.data_dir);

	let worker = Worker::new(
		config.queue.clone(),
		Arc::new(TracingDiagnostics),
		Arc::new(lister),
		Arc::new(repository),
	);
	let consumer = Consumer::new(worker, config.redelivery_policy());

	let mut source = LineSource::new(BufReader::new(tokio::io::stdin()));

	info!("Consuming messages from the {} queue", config.queue);

	match consumer.run(&mut source).await {
		Ok(stats) => info!("Queue drained: {}", stats.summary()),
		Err(e) => error!("Consumer stopped: {}", e),
	}
}
