// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::io::Read;
use crate::channel::ChannelManager;
use crate::PrefetchStream;

/// Reads have the same short-read behavior as [`PrefetchStream::read`]. Stream
/// errors are converted into [`io::Error`]s, keeping the kind of the underlying IO
/// error for failed segment reads.
impl<M: ChannelManager> Read for PrefetchStream<M> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		Ok(PrefetchStream::read(self, buf)?)
	}
}
