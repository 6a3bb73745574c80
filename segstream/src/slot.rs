// SPDX-License-Identifier: Apache-2.0

//! Slots are the ring positions of a stream. Each one lends its block to a single
//! read at a time, then serves the bytes it was filled with to the consumer.
//!
//! A slot moves through these states:
//!
//! ```text
//! Empty -> Scheduled -> Ready  -> Draining -> Scheduled (next segment, same block)
//!                    \> Failed             \> Released  (block collected)
//! ```
//!
//! The completion of a read owns the `Scheduled -> Ready | Failed` transition, the
//! consumer owns the rest. Both sides go through the slot's mutex, and the consumer
//! waits on the slot's condition variable while the slot is scheduled, so the
//! outcome is visible whether it was recorded before or after the consumer began
//! waiting.

use std::io;
use std::sync::Arc;
use parking_lot::{Condvar, Mutex, MutexGuard};
use crate::completion::OperationHandle;
use crate::pool::Block;
use crate::Segment;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SlotState {
	Empty,
	Scheduled,
	Ready,
	Failed,
	Draining,
	Released,
}

pub(crate) struct Slot {
	inner: Mutex<SlotInner>,
	settled: Condvar,
}

struct SlotInner {
	state: SlotState,
	block: Option<Block>,
	segment: Option<(usize, Segment)>,
	cursor: usize,
	available: usize,
	failure: Option<io::Error>,
	closed: bool,
}

/// What the consumer got from [`Slot::take`].
pub(crate) enum Take {
	/// `count` bytes were copied. Once the slot's segment is fully consumed, its
	/// block is handed back in `drained` for the stream to recycle or release.
	Copied { count: usize, drained: Option<Block> },
	/// The read of `segment` failed. The cause is only given out once.
	Failed { segment: Segment, cause: Option<io::Error> },
	/// The slot holds no segment.
	Vacant,
}

/// What a slot held when it was closed.
pub(crate) enum Closed {
	Holding(Block),
	InFlight,
	Vacant,
}

impl Default for Slot {
	fn default() -> Self {
		Self {
			inner: Mutex::new(SlotInner {
				state: SlotState::Empty,
				block: None,
				segment: None,
				cursor: 0,
				available: 0,
				failure: None,
				closed: false,
			}),
			settled: Condvar::new(),
		}
	}
}

impl Slot {
	pub fn state(&self) -> SlotState { self.inner.lock().state }

	/// Returns the index of the segment the slot currently represents.
	pub fn segment_index(&self) -> Option<usize> {
		self.inner.lock().segment.map(|(index, _)| index)
	}

	/// Assigns the slot to the segment at `index`, whose read is about to be
	/// scheduled with the slot's block.
	pub fn schedule(&self, index: usize, segment: Segment) {
		let mut inner = self.inner.lock();
		debug_assert!(
			matches!(inner.state, SlotState::Empty | SlotState::Draining),
			"slot scheduled from {:?}", inner.state
		);
		debug_assert!(inner.block.is_none(), "scheduled slot still holds its block");
		inner.state = SlotState::Scheduled;
		inner.segment = Some((index, segment));
		inner.cursor = 0;
		inner.available = 0;
		inner.failure = None;
	}

	/// Fails the segment at `index` without reading it, keeping `block` in the slot.
	pub fn fail(&self, index: usize, segment: Segment, block: Block, cause: io::Error) {
		let mut inner = self.inner.lock();
		inner.state = SlotState::Failed;
		inner.segment = Some((index, segment));
		inner.block = Some(block);
		inner.cursor = 0;
		inner.available = 0;
		inner.failure = Some(cause);
	}

	/// Records the outcome of a scheduled read of `attempted`, returning the block
	/// to the slot. If the slot was closed while the read was in flight, the block
	/// is handed back instead, to be collected by the caller.
	pub fn record_outcome(
		&self,
		block: Block,
		attempted: Segment,
		result: io::Result<usize>
	) -> Option<Block> {
		let mut inner = self.inner.lock();
		if inner.closed {
			inner.state = SlotState::Released;
			return Some(block)
		}

		debug_assert_eq!(inner.state, SlotState::Scheduled, "completed an unscheduled slot");
		debug_assert_eq!(inner.segment.map(|(_, seg)| seg), Some(attempted));
		match result {
			Ok(count) if count as u64 == attempted.size => {
				inner.state = SlotState::Ready;
				inner.available = count;
			}
			Ok(count) => {
				inner.state = SlotState::Failed;
				inner.failure = Some(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					format!("short read, {count} of {} bytes transferred", attempted.size)
				));
			}
			Err(error) => {
				inner.state = SlotState::Failed;
				inner.failure = Some(error);
			}
		}
		inner.block = Some(block);
		None
	}

	/// Wakes the consumer waiting on this slot, if any.
	pub fn signal(&self) {
		self.settled.notify_one();
	}

	/// Blocks until the slot's read settles, then copies as many unconsumed bytes
	/// as fit into `dst`.
	pub fn take(&self, dst: &mut [u8]) -> Take {
		let mut inner = self.wait();
		match inner.state {
			SlotState::Ready | SlotState::Draining => {
				let SlotInner { block, cursor, available, .. } = &mut *inner;
				let Some(data) = block.as_deref() else {
					debug_assert!(false, "readable slot has no block");
					return Take::Vacant
				};
				let count = dst.len().min(*available - *cursor);
				dst[..count].copy_from_slice(&data[*cursor..*cursor + count]);
				*cursor += count;

				inner.state = SlotState::Draining;
				let drained = if inner.cursor == inner.available {
					inner.block.take()
				} else {
					None
				};
				Take::Copied { count, drained }
			}
			SlotState::Failed => {
				let segment = inner.segment.map_or_else(Segment::default, |(_, seg)| seg);
				Take::Failed { segment, cause: inner.failure.take() }
			}
			_ => Take::Vacant
		}
	}

	/// Marks a drained slot released. Its block was already taken.
	pub fn release(&self) {
		let mut inner = self.inner.lock();
		debug_assert!(inner.block.is_none());
		inner.state = SlotState::Released;
		inner.segment = None;
	}

	/// Closes the slot, handing back its block if it holds one. A block lent to an
	/// in-flight read is collected when that read completes.
	pub fn close(&self) -> Closed {
		let mut inner = self.inner.lock();
		inner.closed = true;
		inner.failure = None;
		if inner.state == SlotState::Scheduled {
			return Closed::InFlight
		}

		inner.state = SlotState::Released;
		inner.block.take().map_or(Closed::Vacant, Closed::Holding)
	}

	fn wait(&self) -> MutexGuard<'_, SlotInner> {
		let mut inner = self.inner.lock();
		while inner.state == SlotState::Scheduled {
			self.settled.wait(&mut inner);
		}
		inner
	}
}

/// A slot in the ring, paired with the handle of its current read.
pub(crate) struct RingSlot {
	pub slot: Arc<Slot>,
	pub operation: Option<OperationHandle>,
}

/// The fixed set of slots a stream cycles through, in segment order.
#[derive(Default)]
pub(crate) struct Ring {
	slots: Vec<RingSlot>,
	head: usize,
}

impl Ring {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			slots: Vec::with_capacity(capacity),
			head: 0,
		}
	}

	/// Appends an empty slot, returning its index.
	pub fn push(&mut self) -> usize {
		self.slots.push(RingSlot {
			slot: Arc::default(),
			operation: None,
		});
		self.slots.len() - 1
	}

	pub fn len(&self) -> usize { self.slots.len() }

	/// Returns the index of the slot holding the oldest unconsumed segment.
	pub fn head(&self) -> usize { self.head }

	pub fn get(&self, index: usize) -> &RingSlot { &self.slots[index] }

	pub fn get_mut(&mut self, index: usize) -> &mut RingSlot { &mut self.slots[index] }

	/// Moves the head to the next slot in ring order.
	pub fn advance(&mut self) {
		if !self.slots.is_empty() {
			self.head = (self.head + 1) % self.slots.len();
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &RingSlot> {
		self.slots.iter()
	}
}
