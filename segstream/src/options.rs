// SPDX-License-Identifier: Apache-2.0

/// The default number of reads kept in flight ahead of the consumer.
pub const DEFAULT_LOOK_AHEAD: usize = 2;
/// The default capacity of pooled blocks.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Options for tuning [`PrefetchStream`](crate::PrefetchStream)'s behavior.
///
/// # Look-ahead
///
/// The number of segment reads kept in flight ahead of the consumer, which is also
/// the number of blocks the stream claims from its pool. Defaults to `2`. A wider
/// window hides more read latency at the cost of holding more memory: the stream
/// never holds more than `look_ahead` blocks, regardless of how many segments it
/// reads. Must be at least `1`.
///
/// # Cancel on close
///
/// Whether closing the stream signals cancellation to reads still in flight.
/// Cancellation is advisory; the channel manager still completes or drops each
/// request, and the blocks are collected either way. Defaults to `true`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct StreamOptions {
	pub look_ahead: usize,
	pub cancel_on_close: bool,
}

impl Default for StreamOptions {
	fn default() -> Self { Self::new() }
}

impl StreamOptions {
	/// Creates a new set of stream options.
	pub const fn new() -> Self {
		Self {
			look_ahead: DEFAULT_LOOK_AHEAD,
			cancel_on_close: true,
		}
	}

	/// Returns the look-ahead width.
	#[inline]
	pub const fn look_ahead(&self) -> usize { self.look_ahead }

	/// Returns whether in-flight reads are cancelled on close.
	#[inline]
	pub const fn cancel_on_close(&self) -> bool { self.cancel_on_close }

	/// Sets the look-ahead width.
	#[inline]
	pub fn set_look_ahead(&mut self, value: usize) {
		self.look_ahead = value;
	}

	/// Sets whether in-flight reads are cancelled on close.
	#[inline]
	pub fn set_cancel_on_close(&mut self, value: bool) {
		self.cancel_on_close = value;
	}

	/// Sets the look-ahead width.
	#[inline]
	pub const fn with_look_ahead(mut self, value: usize) -> Self {
		self.look_ahead = value;
		self
	}

	/// Sets whether in-flight reads are cancelled on close.
	#[inline]
	pub const fn with_cancel_on_close(mut self, value: bool) -> Self {
		self.cancel_on_close = value;
		self
	}
}

/// Options for [`BlockPool`](crate::BlockPool).
///
/// # Block size
///
/// The capacity of every block, `8192B` by default. Segments larger than this
/// can't be read through the pool.
///
/// # Block limit
///
/// The maximum number of blocks claimed at once. Claims past the limit fail.
/// Unlimited by default.
///
/// # Retain limit
///
/// The maximum number of collected blocks kept for reuse. Blocks collected past
/// this are dropped. Defaults to `64`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct PoolOptions {
	pub block_size: usize,
	pub block_limit: Option<usize>,
	pub retain_limit: usize,
}

impl Default for PoolOptions {
	fn default() -> Self { Self::new() }
}

impl PoolOptions {
	/// Creates a new set of pool options.
	pub const fn new() -> Self {
		Self {
			block_size: DEFAULT_BLOCK_SIZE,
			block_limit: None,
			retain_limit: 64,
		}
	}

	#[inline]
	pub const fn block_size(&self) -> usize { self.block_size }

	#[inline]
	pub const fn block_limit(&self) -> Option<usize> { self.block_limit }

	#[inline]
	pub const fn retain_limit(&self) -> usize { self.retain_limit }

	/// Sets the block size.
	#[inline]
	pub const fn with_block_size(mut self, value: usize) -> Self {
		self.block_size = value;
		self
	}

	/// Limits the number of blocks claimed at once.
	#[inline]
	pub const fn with_block_limit(mut self, value: usize) -> Self {
		self.block_limit = Some(value);
		self
	}

	/// Sets the maximum number of idle blocks kept for reuse.
	#[inline]
	pub const fn with_retain_limit(mut self, value: usize) -> Self {
		self.retain_limit = value;
		self
	}
}
