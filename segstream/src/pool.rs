// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use parking_lot::Mutex;
use tracing::trace;
use crate::PoolOptions;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PoolError {
	#[error("pool exhausted; all {0} blocks are claimed")]
	Exhausted(usize),
}

/// A fixed-capacity chunk of memory lent out by a [`Pool`]. Blocks can't be
/// cloned; a claimed block is either held by its claimant or collected back into
/// a pool, never both.
pub struct Block(Box<[u8]>);

impl Block {
	/// Allocates a zeroed block of `capacity` bytes.
	pub fn new(capacity: usize) -> Self {
		Self(vec![0; capacity].into_boxed_slice())
	}

	pub fn capacity(&self) -> usize { self.0.len() }
}

impl Deref for Block {
	type Target = [u8];
	fn deref(&self) -> &[u8] {
		let Self(data) = self;
		data
	}
}

impl DerefMut for Block {
	fn deref_mut(&mut self) -> &mut [u8] {
		let Self(data) = self;
		data
	}
}

impl Debug for Block {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Block")
		 .field("capacity", &self.capacity())
		 .finish()
	}
}

/// A source of reusable [`Block`]s, shared between a stream and the completions
/// of its in-flight reads.
pub trait Pool: Send + Sync {
	/// Returns the capacity of every block claimed from this pool.
	fn block_size(&self) -> usize;

	/// Claims a single block. Whether an exhausted pool blocks or fails is left up
	/// to implementation.
	fn claim_one(&self) -> Result<Block, PoolError>;

	/// Collects a single block back into the pool.
	fn collect_one(&self, block: Block);
}

/// A snapshot of a [`BlockPool`]'s counters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
	/// Total blocks claimed over the pool's lifetime.
	pub claims: usize,
	/// Total blocks collected over the pool's lifetime.
	pub collects: usize,
	/// Blocks claimed but not yet collected.
	pub outstanding: usize,
	/// Blocks kept in the free list for reuse.
	pub idle: usize,
}

/// The default [`Pool`], recycling blocks through a free list. With a block limit,
/// claims past the limit fail fast with [`PoolError::Exhausted`] rather than wait.
pub struct BlockPool {
	options: PoolOptions,
	state: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
	free: Vec<Block>,
	claims: usize,
	collects: usize,
}

impl PoolState {
	fn outstanding(&self) -> usize { self.claims - self.collects }
}

impl Default for BlockPool {
	fn default() -> Self { Self::new(PoolOptions::default()) }
}

impl From<PoolOptions> for BlockPool {
	fn from(options: PoolOptions) -> Self { Self::new(options) }
}

impl BlockPool {
	pub fn new(options: PoolOptions) -> Self {
		Self {
			options,
			state: Mutex::default(),
		}
	}

	/// Creates a pool of `block_size`-byte blocks, with no limit.
	pub fn with_block_size(block_size: usize) -> Self {
		PoolOptions::default().with_block_size(block_size).into()
	}

	pub fn options(&self) -> PoolOptions { self.options }

	/// Returns a snapshot of the pool's counters.
	pub fn stats(&self) -> PoolStats {
		let state = self.state.lock();
		PoolStats {
			claims: state.claims,
			collects: state.collects,
			outstanding: state.outstanding(),
			idle: state.free.len(),
		}
	}

	/// Drops every idle block, returning how many were freed.
	pub fn shed(&self) -> usize {
		let mut state = self.state.lock();
		let count = state.free.len();
		state.free.clear();
		count
	}
}

impl Pool for BlockPool {
	fn block_size(&self) -> usize { self.options.block_size }

	fn claim_one(&self) -> Result<Block, PoolError> {
		let mut state = self.state.lock();
		if let Some(limit) = self.options.block_limit {
			if state.outstanding() >= limit {
				return Err(PoolError::Exhausted(limit))
			}
		}

		state.claims += 1;
		let block = state.free
						 .pop()
						 .unwrap_or_else(|| Block::new(self.options.block_size));
		trace!(outstanding = state.outstanding(), "claimed block");
		Ok(block)
	}

	fn collect_one(&self, block: Block) {
		let mut state = self.state.lock();
		state.collects += 1;
		debug_assert!(state.collects <= state.claims, "collected more blocks than claimed");
		if block.capacity() == self.options.block_size &&
			state.free.len() < self.options.retain_limit {
			state.free.push(block);
		}
		trace!(outstanding = state.outstanding(), "collected block");
	}
}
