use std::collections::{HashMap, VecDeque};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// A message handed to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
	/// Tag used to acknowledge or reject this delivery
	pub tag: u64,
	/// Raw body, `None` when the broker delivered an empty message
	pub body: Option<Vec<u8>>,
	/// How many times this message has been delivered, starting at 1
	pub delivery_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Unknown delivery tag {0}")]
	UnknownTag(u64),
}

/// Source of queue deliveries
#[async_trait::async_trait]
pub trait MessageSource: Send {
	/// Wait for the next delivery; `None` once the source is exhausted.
	async fn recv(&mut self) -> Result<Option<Delivery>, TransportError>;

	async fn ack(&mut self, tag: u64) -> Result<(), TransportError>;

	/// Reject a delivery, putting it back on the queue when `requeue` is set.
	async fn nack(&mut self, tag: u64, requeue: bool) -> Result<(), TransportError>;
}

/// Newline-delimited message source.
///
/// Every line is one message body, passed on byte for byte without its line terminator. A blank
/// line or the literal `null` is an empty message. Requeued messages are redelivered before any
/// new line is read.
pub struct LineSource<R> {
	reader: R,
	requeued: VecDeque<Delivery>,
	in_flight: HashMap<u64, Delivery>,
	next_tag: u64,
}

impl<R: AsyncBufRead + Unpin + Send> LineSource<R> {
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			requeued: VecDeque::new(),
			in_flight: HashMap::new(),
			next_tag: 1,
		}
	}

	fn take_tag(&mut self) -> u64 {
		let tag = self.next_tag;
		self.next_tag += 1;
		tag
	}

	/// Read the next raw line without its `\n` or `\r\n` terminator.
	async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
		let mut line = Vec::new();
		if self.reader.read_until(b'\n', &mut line).await? == 0 {
			return Ok(None);
		}
		if line.last() == Some(&b'\n') {
			line.pop();
			if line.last() == Some(&b'\r') {
				line.pop();
			}
		}
		Ok(Some(line))
	}

	fn settle(&mut self, tag: u64) -> Result<Delivery, TransportError> {
		self.in_flight
			.remove(&tag)
			.ok_or(TransportError::UnknownTag(tag))
	}
}

#[async_trait::async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
	async fn recv(&mut self) -> Result<Option<Delivery>, TransportError> {
		let delivery = match self.requeued.pop_front() {
			Some(mut delivery) => {
				delivery.tag = self.take_tag();
				delivery
			}
			None => {
				let Some(line) = self.read_line().await? else {
					return Ok(None);
				};
				let content = line.trim_ascii();
				let body = if content.is_empty() || content == b"null" {
					None
				} else {
					Some(line)
				};
				Delivery {
					tag: self.take_tag(),
					body,
					delivery_count: 1,
				}
			}
		};

		self.in_flight.insert(delivery.tag, delivery.clone());
		Ok(Some(delivery))
	}

	async fn ack(&mut self, tag: u64) -> Result<(), TransportError> {
		self.settle(tag)?;
		Ok(())
	}

	async fn nack(&mut self, tag: u64, requeue: bool) -> Result<(), TransportError> {
		let mut delivery = self.settle(tag)?;
		if requeue {
			delivery.delivery_count += 1;
			debug!("Requeued delivery {} (delivery {})", tag, delivery.delivery_count);
			self.requeued.push_back(delivery);
		}
		Ok(())
	}
}
