// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::thread::JoinHandle;
use parking_lot::Mutex;
use tracing::{debug, trace};
use crate::completion::ReadRequest;
use super::{ChannelHandle, ChannelManager};

/// A [`ChannelManager`] reading segments from files on a set of worker threads.
/// Channels are file paths. Dropping the manager finishes queued reads, then
/// joins its workers.
pub struct FileChannelManager {
	sender: Option<Sender<ReadRequest>>,
	workers: Vec<JoinHandle<()>>,
}

impl FileChannelManager {
	/// Starts a manager with `workers` reader threads, at least one.
	pub fn new(workers: usize) -> io::Result<Self> {
		let (sender, receiver) = channel();
		let receiver = Arc::new(Mutex::new(receiver));
		let workers = (0..workers.max(1)).map(|id| {
			let receiver = receiver.clone();
			thread::Builder::new()
				.name(format!("segstream-file-{id}"))
				.spawn(move || run(&receiver))
		}).collect::<io::Result<_>>()?;

		Ok(Self {
			sender: Some(sender),
			workers,
		})
	}

	pub fn worker_count(&self) -> usize { self.workers.len() }
}

impl ChannelManager for FileChannelManager {
	fn schedule_read(&self, request: ReadRequest) {
		trace!(segment = ?request.segment(), channel = %request.channel(), "queueing file read");
		// A request the workers can't receive is dropped, which fails it.
		if let Some(ref sender) = self.sender {
			let _ = sender.send(request);
		}
	}
}

impl Drop for FileChannelManager {
	fn drop(&mut self) {
		self.sender.take();
		for worker in self.workers.drain(..) {
			let _ = worker.join();
		}
	}
}

fn run(receiver: &Mutex<Receiver<ReadRequest>>) {
	let mut open: Option<(ChannelHandle, File)> = None;
	loop {
		let Ok(mut request) = receiver.lock().recv() else { break };

		if request.is_cancelled() {
			request.complete(Err(io::ErrorKind::Interrupted.into()));
			continue
		}

		let result = read(&mut request, &mut open);
		request.complete(result);
	}
	debug!("file channel worker stopped");
}

fn read(request: &mut ReadRequest, open: &mut Option<(ChannelHandle, File)>) -> io::Result<usize> {
	let file = match open.take() {
		Some((channel, file)) if &channel == request.channel() => file,
		_ => File::open(request.channel().path())?,
	};
	let (_, file) = open.insert((request.channel().clone(), file));

	let position = request.position();
	let buf = request.buffer();
	read_exact_at(file, buf, position)?;
	Ok(buf.len())
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], position: u64) -> io::Result<()> {
	use std::os::unix::fs::FileExt;
	file.read_exact_at(buf, position)
}

#[cfg(not(unix))]
fn read_exact_at(mut file: &File, buf: &mut [u8], position: u64) -> io::Result<()> {
	use std::io::{Read, Seek, SeekFrom};
	file.seek(SeekFrom::Start(position))?;
	file.read_exact(buf)
}
