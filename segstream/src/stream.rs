// SPDX-License-Identifier: Apache-2.0

use std::{fmt, io};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use crate::{Error, Result, Segment, StreamOptions};
use crate::channel::{ChannelManager, ChannelResolver};
use crate::completion::{Completion, OperationHandle, ReadRequest};
use crate::error::OperationKind::{Configure, Prepare, Read};
use crate::pool::{Block, Pool};
use crate::segment;
use crate::slot::{Closed, Ring, RingSlot, SlotState, Take};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
	Unprepared,
	Prepared,
	Closed,
}

/// A blocking byte stream over an ordered list of [`Segment`]s, read ahead of the
/// consumer into a fixed ring of pooled blocks.
///
/// Once [prepared](Self::prepare), the stream keeps up to `look_ahead` segment
/// reads in flight on its [`ChannelManager`]. Each [`read`](Self::read) blocks
/// until the oldest of these completes, then serves bytes from it. When a segment
/// is fully consumed, its block is reused in place to read the next segment not
/// yet scheduled; past the last segment, it's collected back into the pool. The
/// stream never holds more than `look_ahead` blocks, however many segments it
/// reads, and collects each block exactly once.
///
/// Reads are short: each is served from a single segment, so a read may return
/// fewer bytes than requested even when more remain. Zero is only returned at the
/// end of the stream, or for an empty buffer.
///
/// The stream is meant for a single consumer. Completions may come from any
/// thread.
pub struct PrefetchStream<M: ChannelManager> {
	resolver: Box<dyn ChannelResolver>,
	pool: Arc<dyn Pool>,
	manager: M,
	options: StreamOptions,
	segments: Vec<Segment>,
	ring: Ring,
	/// Index of the first segment not yet scheduled.
	scheduled: usize,
	/// Number of segments fully consumed.
	drained: usize,
	position: u64,
	len: u64,
	phase: Phase,
}

impl<M: ChannelManager> PrefetchStream<M> {
	/// Creates an unprepared stream, reading segments from channels given by
	/// `resolver` into blocks claimed from `pool`, with reads performed by
	/// `manager`.
	pub fn new<P: Pool + 'static>(
		resolver: impl ChannelResolver + 'static,
		pool: Arc<P>,
		manager: M
	) -> Self {
		Self {
			resolver: Box::new(resolver),
			pool,
			manager,
			options: StreamOptions::default(),
			segments: Vec::new(),
			ring: Ring::default(),
			scheduled: 0,
			drained: 0,
			position: 0,
			len: 0,
			phase: Phase::Unprepared,
		}
	}

	/// Sets the stream options. Options are applied by [`prepare`](Self::prepare).
	pub fn with_options(mut self, options: StreamOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the segments to read. Has no effect once the stream is prepared, see
	/// [`set_segments`](Self::set_segments).
	pub fn with_segments(mut self, segments: impl Into<Vec<Segment>>) -> Self {
		if self.phase == Phase::Unprepared {
			self.segments = segments.into();
		}
		self
	}

	/// Sets the segments to read. Fails once the stream is prepared or closed.
	pub fn set_segments(&mut self, segments: impl Into<Vec<Segment>>) -> Result {
		match self.phase {
			Phase::Unprepared => {
				self.segments = segments.into();
				Ok(())
			}
			Phase::Prepared => Err(Error::configuration(Configure, "segments can't be changed once prepared")),
			Phase::Closed   => Err(Error::closed(Configure)),
		}
	}

	pub fn options(&self) -> StreamOptions { self.options }

	pub fn segments(&self) -> &[Segment] { &self.segments }

	/// Claims a block for each of the first `look_ahead` segments and schedules their
	/// reads, without waiting for them to complete.
	///
	/// # Errors
	///
	/// Fails with a configuration error if there are no segments, the look-ahead
	/// width is zero, or the stream was already prepared. Fails if a segment is too
	/// large to fit in the pool's blocks, or if the pool runs out of blocks; no
	/// blocks are kept in either case.
	pub fn prepare(&mut self) -> Result {
		match self.phase {
			Phase::Unprepared => { }
			Phase::Prepared => return Err(Error::configuration(Prepare, "stream already prepared")),
			Phase::Closed   => return Err(Error::closed(Prepare)),
		}

		if self.options.look_ahead < 1 {
			return Err(Error::configuration(Prepare, "look-ahead must be at least 1"))
		}

		let len = segment::validate(&self.segments, self.pool.block_size())?;
		let slot_count = self.options.look_ahead.min(self.segments.len());
		let mut blocks = Vec::with_capacity(slot_count);
		for _ in 0..slot_count {
			match self.pool.claim_one() {
				Ok(block) => blocks.push(block),
				Err(error) => {
					warn!(claimed = blocks.len(), slot_count, %error, "failed to claim blocks");
					for block in blocks {
						self.pool.collect_one(block);
					}
					return Err(Error::pool(Prepare, error))
				}
			}
		}

		debug!(segments = self.segments.len(), len, slot_count, "preparing stream");
		self.len = len;
		self.ring = Ring::with_capacity(slot_count);
		self.phase = Phase::Prepared;
		for block in blocks {
			let index = self.ring.push();
			self.schedule(index, block);
		}
		Ok(())
	}

	/// Reads bytes from the next segment into `dst`, blocking until that segment's
	/// read completes. Returns the number of bytes read, at most `dst.len()`, or
	/// zero at the end of the stream.
	///
	/// # Errors
	///
	/// Fails if the stream isn't prepared or is closed. If the segment's read
	/// failed, returns a read error with its position and size. The stream can't
	/// move past a failed segment; every later read fails the same way, though the
	/// underlying cause is only given once.
	pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
		match self.phase {
			Phase::Prepared => { }
			Phase::Unprepared => return Err(Error::not_prepared(Read)),
			Phase::Closed     => return Err(Error::closed(Read)),
		}

		if dst.is_empty() { return Ok(0) }

		while self.drained < self.segments.len() {
			let head = self.ring.head();
			let take = self.ring.get(head).slot.take(dst);
			match take {
				Take::Copied { count, drained } => {
					self.position += count as u64;
					if let Some(block) = drained {
						self.recycle(head, block);
					}

					// Empty segments are skipped over rather than ending the read.
					if count > 0 {
						return Ok(count)
					}
				}
				Take::Failed { segment, cause } => {
					if let Some(ref cause) = cause {
						warn!(segment = ?segment, position = self.position, %cause, "surfacing failed segment read");
					}
					return Err(Error::read(segment, cause))
				}
				Take::Vacant => {
					debug_assert!(false, "head slot {head} holds no segment");
					break
				}
			}
		}
		Ok(0)
	}

	/// Returns `true` if bytes remain to be read. Always `false` before the stream
	/// is prepared.
	pub fn has_remaining(&self) -> bool { self.position < self.len }

	/// Returns the number of bytes read so far.
	pub fn position(&self) -> u64 { self.position }

	/// Returns the total length of the stream, the sum of its segment sizes. Zero
	/// until the stream is prepared.
	pub fn len(&self) -> u64 { self.len }

	/// Returns `true` if the stream has a length of zero.
	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Returns the number of bytes left to read.
	pub fn remaining(&self) -> u64 { self.len - self.position }

	/// Returns the number of slots, the blocks held by the stream while prepared.
	pub fn slot_count(&self) -> usize { self.ring.len() }

	/// Returns the number of segment reads not yet completed.
	pub fn in_flight(&self) -> usize {
		self.ring
			.iter()
			.filter(|RingSlot { slot, .. }| slot.state() == SlotState::Scheduled)
			.count()
	}

	pub fn is_prepared(&self) -> bool { self.phase == Phase::Prepared }

	pub fn is_closed(&self) -> bool { self.phase == Phase::Closed }

	/// Closes the stream, collecting every block its slots hold back into the pool.
	/// Reads still in flight aren't waited on; their blocks are collected as they
	/// complete. Closing is idempotent, [`close`](Self::close) may be called more
	/// than once with no effect.
	pub fn close(&mut self) {
		if self.phase == Phase::Closed { return }
		self.phase = Phase::Closed;

		let mut collected = 0;
		let mut in_flight = 0;
		for RingSlot { slot, operation } in self.ring.iter() {
			match slot.close() {
				Closed::Holding(block) => {
					self.pool.collect_one(block);
					collected += 1;
				}
				Closed::InFlight => {
					in_flight += 1;
					if self.options.cancel_on_close {
						if let Some(operation) = operation {
							operation.cancel();
						}
					}
				}
				Closed::Vacant => { }
			}
		}

		debug!(position = self.position, len = self.len, collected, in_flight, "closed stream");
	}

	/// Schedules a read of the next unscheduled segment into the slot at `index`,
	/// lending it `block`.
	fn schedule(&mut self, index: usize, block: Block) {
		let segment_index = self.scheduled;
		let segment = self.segments[segment_index];
		self.scheduled += 1;

		let RingSlot { slot, operation: slot_operation } = self.ring.get_mut(index);
		let channel = if block.capacity() as u64 >= segment.size {
			self.resolver.resolve(&segment)
		} else {
			// Segments were checked against the pool's block size, but a pool may
			// still hand out a smaller block.
			Err(io::Error::new(
				io::ErrorKind::InvalidInput,
				format!("block of {} bytes is too small for segment {segment}", block.capacity())
			))
		};
		match channel {
			Ok(channel) => {
				let operation = OperationHandle::default();
				*slot_operation = Some(operation.clone());
				slot.schedule(segment_index, segment);
				trace!(slot = index, segment = segment_index, ?segment, %channel, "scheduling read");

				let completion = Completion::new(slot.clone(), self.pool.clone(), segment);
				self.manager.schedule_read(
					ReadRequest::new(block, segment, channel, operation, completion)
				);
			}
			Err(error) => {
				warn!(slot = index, segment = segment_index, ?segment, %error, "failed to schedule read");
				*slot_operation = None;
				slot.fail(segment_index, segment, block, error);
			}
		}
	}

	/// Hands the block of the fully consumed head slot on to the next unscheduled
	/// segment, or collects it if none remain, then moves the head along.
	fn recycle(&mut self, index: usize, block: Block) {
		self.drained += 1;
		if self.scheduled < self.segments.len() {
			self.schedule(index, block);
		} else {
			let RingSlot { slot, operation } = self.ring.get_mut(index);
			*operation = None;
			slot.release();
			self.pool.collect_one(block);
			trace!(slot = index, "released block");
		}
		self.ring.advance();
	}
}

impl<M: ChannelManager> Drop for PrefetchStream<M> {
	fn drop(&mut self) {
		self.close();
	}
}

impl<M: ChannelManager> Debug for PrefetchStream<M> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("PrefetchStream")
		 .field("phase", &self.phase)
		 .field("position", &self.position)
		 .field("len", &self.len)
		 .field("segments", &self.segments.len())
		 .field("scheduled", &self.scheduled)
		 .field("drained", &self.drained)
		 .field("slots", &self.ring.len())
		 .finish()
	}
}
