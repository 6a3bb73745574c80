// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt::{Arguments, Debug};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use parking_lot::Mutex;
use segstream::{ChannelManager, PrefetchStream, ReadRequest, Segment};

macro_rules! qc_assert_eq {
	($left:expr,$right:expr) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, None)
			)
		}
	}};
    ($left:expr,$right:expr,$($arg:tt)+) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, Some(format_args!($($arg)+)))
			)
		}
	}};
}

pub fn format_qc_assert_error<L: Debug, R: Debug>(left: &L, right: &R, msg: Option<Arguments>) -> String {
	if let Some(msg) = msg {
		format!(
			"assertion failed `(left == right)`: {msg}\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	} else {
		format!(
			"assertion failed `(left == right)`:\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	}
}

/// Splits `data` into segments with sizes taken from `sizes`, wrapped to at most
/// `max_size`, and stores them in reverse order in a backing buffer, each behind a
/// marker byte. Returns the backing buffer and the segments in stream order.
pub fn scatter(data: &[u8], sizes: &[u8], max_size: usize) -> (Vec<u8>, Vec<Segment>) {
	let mut sizes = sizes.iter().map(|&size| size as usize % (max_size + 1));
	let mut chunks = Vec::new();
	let mut rest = data;
	while !rest.is_empty() {
		let size = sizes.next().unwrap_or(max_size).min(rest.len());
		let (chunk, tail) = rest.split_at(size);
		chunks.push(chunk);
		rest = tail;
	}

	let mut backing = Vec::with_capacity(data.len() + chunks.len());
	let mut segments = vec![Segment::default(); chunks.len()];
	for (index, chunk) in chunks.iter().enumerate().rev() {
		backing.push(0xAA);
		segments[index] = Segment::new(backing.len() as u64, chunk.len() as u64);
		backing.extend_from_slice(chunk);
	}
	(backing, segments)
}

/// Reads the stream to its end with read sizes cycled from `sizes`, checking the
/// short-read rules along the way. A zero size makes an empty read, which must
/// return zero, followed by a full one.
pub fn drain<M: ChannelManager>(
	stream: &mut PrefetchStream<M>,
	sizes: &[u8]
) -> segstream::Result<Vec<u8>> {
	let mut sizes = sizes.iter().map(|&size| size as usize).cycle();
	let mut buf = [0; 256];
	let mut data = Vec::new();
	loop {
		let size = match sizes.next() {
			Some(0) => {
				assert_eq!(stream.read(&mut [])?, 0, "empty read returned bytes");
				buf.len()
			}
			Some(size) => size,
			None => buf.len()
		};

		let position = stream.position();
		let count = stream.read(&mut buf[..size])?;
		assert!(count <= size, "read {count} bytes into {size}");
		assert_eq!(stream.position(), position + count as u64);
		if count == 0 {
			assert!(!stream.has_remaining(), "read returned 0 with bytes remaining");
			break
		}
		data.extend_from_slice(&buf[..count]);
	}
	Ok(data)
}

/// Fills `request` from `data` and completes it.
pub fn fill(mut request: ReadRequest, data: &[u8]) {
	let start = request.position() as usize;
	let size = request.size();
	request.buffer().copy_from_slice(&data[start..start + size]);
	request.complete(Ok(size));
}

/// Holds every request until the test completes it.
#[derive(Clone, Default)]
pub struct DeferredManager {
	requests: Arc<Mutex<VecDeque<ReadRequest>>>,
}

impl DeferredManager {
	pub fn pending(&self) -> usize { self.requests.lock().len() }

	/// Removes the oldest pending request.
	pub fn next(&self) -> Option<ReadRequest> {
		self.requests.lock().pop_front()
	}

	/// Completes every pending request from `data`, returning how many there were.
	pub fn fill_all(&self, data: &[u8]) -> usize {
		let requests = self.requests.lock().drain(..).collect::<Vec<_>>();
		let count = requests.len();
		for request in requests {
			fill(request, data);
		}
		count
	}
}

impl ChannelManager for DeferredManager {
	fn schedule_read(&self, request: ReadRequest) {
		self.requests.lock().push_back(request);
	}
}

/// Completes each request on its own thread after a delay keyed to its position,
/// so completions arrive out of order.
#[derive(Clone)]
pub struct ThreadedManager {
	data: Arc<[u8]>,
}

impl ThreadedManager {
	pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
		Self { data: data.into() }
	}
}

impl ChannelManager for ThreadedManager {
	fn schedule_read(&self, request: ReadRequest) {
		let data = self.data.clone();
		thread::spawn(move || {
			let delay = (request.position() % 5) * 100;
			thread::sleep(Duration::from_micros(delay));
			fill(request, &data);
		});
	}
}

/// Serves reads from memory, except for the segment at `fail_at`, whose read
/// fails.
pub struct FailingManager {
	data: Arc<[u8]>,
	fail_at: u64,
}

impl FailingManager {
	pub fn new(data: impl Into<Arc<[u8]>>, fail_at: u64) -> Self {
		Self { data: data.into(), fail_at }
	}
}

impl ChannelManager for FailingManager {
	fn schedule_read(&self, request: ReadRequest) {
		if request.position() == self.fail_at {
			request.complete(Err(io::Error::new(io::ErrorKind::Other, "injected failure")));
		} else {
			fill(request, &self.data);
		}
	}
}

/// Drops every request without completing it.
pub struct DroppingManager;

impl ChannelManager for DroppingManager {
	fn schedule_read(&self, _: ReadRequest) { }
}
