// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::sync::Arc;
use crate::completion::ReadRequest;
use super::ChannelManager;

/// A [`ChannelManager`] serving reads from bytes in memory, completing each one
/// before [`schedule_read`](ChannelManager::schedule_read) returns. Channels are
/// ignored; every segment is read from the same bytes.
#[derive(Clone, Debug)]
pub struct MemoryChannelManager {
	data: Arc<[u8]>,
}

impl MemoryChannelManager {
	pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
		Self { data: data.into() }
	}

	pub fn data(&self) -> &[u8] { &self.data }
}

impl ChannelManager for MemoryChannelManager {
	fn schedule_read(&self, mut request: ReadRequest) {
		let range = usize::try_from(request.position())
			.ok()
			.and_then(|start| Some(start..start.checked_add(request.size())?))
			.filter(|range| range.end <= self.data.len());

		let result = match range {
			Some(range) => {
				request.buffer().copy_from_slice(&self.data[range]);
				Ok(request.size())
			}
			None => Err(io::Error::new(
				io::ErrorKind::UnexpectedEof,
				"segment extends past the end of the data"
			))
		};
		request.complete(result);
	}
}
