// SPDX-License-Identifier: Apache-2.0

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::completion::ReadRequest;
use crate::Segment;

/// An opaque reference to where segments are stored, usually a file path.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ChannelHandle(Arc<PathBuf>);

impl ChannelHandle {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self(Arc::new(path.into()))
	}

	pub fn path(&self) -> &Path {
		let Self(path) = self;
		path
	}
}

impl From<PathBuf> for ChannelHandle {
	fn from(value: PathBuf) -> Self { Self::new(value) }
}

impl From<&Path> for ChannelHandle {
	fn from(value: &Path) -> Self { Self::new(value) }
}

impl From<&str> for ChannelHandle {
	fn from(value: &str) -> Self { Self::new(value) }
}

impl Debug for ChannelHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "ChannelHandle({:?})", self.path())
	}
}

impl Display for ChannelHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.path().display(), f)
	}
}

/// Maps segments to the channel they're stored in. This is the identity of the
/// storage a stream reads from.
pub trait ChannelResolver: Send {
	fn resolve(&self, segment: &Segment) -> io::Result<ChannelHandle>;
}

/// Every segment is stored in the same channel.
impl ChannelResolver for ChannelHandle {
	fn resolve(&self, _: &Segment) -> io::Result<ChannelHandle> {
		Ok(self.clone())
	}
}

impl<F> ChannelResolver for F
where F: Fn(&Segment) -> io::Result<ChannelHandle> + Send {
	fn resolve(&self, segment: &Segment) -> io::Result<ChannelHandle> {
		self(segment)
	}
}

/// Performs reads asynchronously on behalf of a stream.
///
/// Each [`ReadRequest`] must be completed exactly once, from any thread, with the
/// number of bytes transferred or the error that stopped the read. Completing
/// from within [`schedule_read`](Self::schedule_read) is allowed. A request dropped
/// without being completed fails its segment.
pub trait ChannelManager {
	fn schedule_read(&self, request: ReadRequest);
}

impl<M: ChannelManager + ?Sized> ChannelManager for &M {
	fn schedule_read(&self, request: ReadRequest) {
		(**self).schedule_read(request)
	}
}

impl<M: ChannelManager + ?Sized> ChannelManager for Arc<M> {
	fn schedule_read(&self, request: ReadRequest) {
		(**self).schedule_read(request)
	}
}

impl<M: ChannelManager + ?Sized> ChannelManager for Box<M> {
	fn schedule_read(&self, request: ReadRequest) {
		(**self).schedule_read(request)
	}
}
