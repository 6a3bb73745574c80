// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Range;
use crate::{Error, Result};
use crate::error::OperationKind::Prepare;

/// Describes where one piece of the logical stream is stored: `size` bytes at
/// `position` in its backing channel. Segments are read back-to-back in the order
/// they're given; their concatenation is the stream.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Segment {
	pub position: u64,
	pub size: u64,
}

impl Segment {
	pub const fn new(position: u64, size: u64) -> Self {
		Self { position, size }
	}

	/// Returns the byte range this segment occupies in its channel.
	pub fn range(&self) -> Range<u64> {
		self.position..self.position.saturating_add(self.size)
	}

	pub fn is_empty(&self) -> bool { self.size == 0 }
}

impl From<Range<u64>> for Segment {
	fn from(Range { start, end }: Range<u64>) -> Self {
		Self::new(start, end.saturating_sub(start))
	}
}

impl Debug for Segment {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Segment({}+{})", self.position, self.size)
	}
}

impl Display for Segment {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Range { start, end } = self.range();
		write!(f, "[{start}, {end})")
	}
}

/// Checks every segment fits into a block of `capacity` bytes, returning the total
/// logical length of the stream they make up.
pub(crate) fn validate(segments: &[Segment], capacity: usize) -> Result<u64> {
	if segments.is_empty() {
		return Err(Error::configuration(Prepare, "no segments to read"))
	}

	segments.iter().try_fold(0u64, |len, &segment| {
		let fits = usize::try_from(segment.size).is_ok_and(|size| size <= capacity);
		if !fits {
			return Err(Error::segment_too_large(segment, capacity))
		}

		len.checked_add(segment.size)
		   .ok_or_else(|| Error::configuration(Prepare, "total stream length overflows"))
	})
}
