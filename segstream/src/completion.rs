// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};
use crate::channel::ChannelHandle;
use crate::pool::{Block, Pool};
use crate::slot::Slot;
use crate::Segment;

/// A handle to a scheduled read, through which the stream asks for it to be
/// cancelled. Cancellation is advisory: the read is still completed or dropped.
#[derive(Clone, Debug, Default)]
pub struct OperationHandle(Arc<AtomicBool>);

impl OperationHandle {
	pub fn cancel(&self) {
		self.0.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

/// Records the outcome of one scheduled read on its slot, then wakes the consumer.
/// Consumed by its single use.
pub(crate) struct Completion {
	slot: Arc<Slot>,
	pool: Arc<dyn Pool>,
	segment: Segment,
}

impl Completion {
	pub fn new(slot: Arc<Slot>, pool: Arc<dyn Pool>, segment: Segment) -> Self {
		Self { slot, pool, segment }
	}

	fn complete(self, block: Block, result: io::Result<usize>) {
		let Self { slot, pool, segment } = self;
		if let Err(ref error) = result {
			warn!(position = segment.position, size = segment.size, %error, "segment read failed");
		}

		match slot.record_outcome(block, segment, result) {
			Some(orphan) => {
				trace!(position = segment.position, "read completed after close, collecting block");
				pool.collect_one(orphan);
			}
			None => slot.signal()
		}
	}
}

/// A read of one segment into a pooled block, handed to a
/// [`ChannelManager`](crate::ChannelManager). The manager fills [`buffer`] with
/// the segment's bytes from [`channel`] at [`position`], then calls [`complete`]
/// exactly once. Dropping a request without completing it fails the read.
///
/// [`buffer`]: Self::buffer
/// [`channel`]: Self::channel
/// [`position`]: Self::position
/// [`complete`]: Self::complete
pub struct ReadRequest {
	block: Option<Block>,
	segment: Segment,
	channel: ChannelHandle,
	operation: OperationHandle,
	completion: Option<Completion>,
}

impl ReadRequest {
	pub(crate) fn new(
		block: Block,
		segment: Segment,
		channel: ChannelHandle,
		operation: OperationHandle,
		completion: Completion
	) -> Self {
		debug_assert!(segment.size as usize <= block.capacity());
		Self {
			block: Some(block),
			segment,
			channel,
			operation,
			completion: Some(completion),
		}
	}

	/// Returns the segment to read.
	pub fn segment(&self) -> Segment { self.segment }

	/// Returns the offset to read from in the channel.
	pub fn position(&self) -> u64 { self.segment.position }

	/// Returns the number of bytes to read.
	pub fn size(&self) -> usize { self.segment.size as usize }

	/// Returns the channel to read from.
	pub fn channel(&self) -> &ChannelHandle { &self.channel }

	/// Returns `true` if the stream no longer needs the read.
	pub fn is_cancelled(&self) -> bool { self.operation.is_cancelled() }

	/// Returns the buffer to fill, exactly [`size`](Self::size) bytes long.
	pub fn buffer(&mut self) -> &mut [u8] {
		let size = self.size();
		match self.block {
			Some(ref mut block) => &mut block[..size],
			None => &mut []
		}
	}

	/// Completes the read with the number of bytes transferred, or the error that
	/// stopped it. Anything other than `Ok(size)` fails the segment.
	pub fn complete(mut self, result: io::Result<usize>) {
		self.finish(result);
	}

	fn finish(&mut self, result: io::Result<usize>) {
		if let (Some(block), Some(completion)) = (self.block.take(), self.completion.take()) {
			completion.complete(block, result);
		}
	}
}

impl Drop for ReadRequest {
	fn drop(&mut self) {
		if self.completion.is_some() {
			self.finish(Err(io::Error::new(
				io::ErrorKind::Interrupted,
				"read request dropped before completion"
			)));
		}
	}
}

impl Debug for ReadRequest {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReadRequest")
		 .field("segment", &self.segment)
		 .field("channel", &self.channel)
		 .field("cancelled", &self.is_cancelled())
		 .finish()
	}
}
