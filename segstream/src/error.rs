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

use std::{fmt, io, result};
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use amplify_derive::Display;
use crate::pool::PoolError;
use crate::Segment;

pub type ErrorBox = Box<dyn StdError + Send + Sync>;
pub type Result<T = ()> = result::Result<T, Error>;

/// The stream operation during which an error occurred.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[display("configure stream")]
	Configure,
	#[display("prepare stream")]
	Prepare,
	#[display("read from stream")]
	Read,
}

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("invalid configuration: {0}")]
	Configuration(&'static str),
	#[display("stream not prepared")]
	NotPrepared,
	#[display("stream closed")]
	Closed,
	/// A segment's size (`.0`) exceeds the block capacity of the pool (`.1`).
	#[display("segment of {0} bytes exceeds block capacity of {1} bytes")]
	SegmentTooLarge(u64, usize),
	#[display("buffer pool exhausted")]
	PoolExhausted,
	/// Reading the segment at position `.0` of size `.1` failed.
	#[display("read of {1} bytes at position {0} failed")]
	Read(u64, u64),
}

#[derive(Debug)]
pub struct Error {
	op: OperationKind,
	kind: ErrorKind,
	source: Option<ErrorBox>,
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind, source } = self;
		if let Some(source) = source {
			write!(f, "{op} failed; {kind} ({source})")
		} else {
			write!(f, "{op} failed; {kind}")
		}
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		if let Some(ref source) = self.source {
			Some(source.as_ref())
		} else {
			None
		}
	}
}

impl Error {
	pub(crate) fn new(
		op: OperationKind,
		kind: ErrorKind,
		source: Option<ErrorBox>
	) -> Self {
		Self { op, kind, source }
	}

	/// Creates a new configuration error with a message.
	pub fn configuration(op: OperationKind, message: &'static str) -> Self {
		Self::new(op, ErrorKind::Configuration(message), None)
	}

	/// Creates a new "not prepared" error.
	pub fn not_prepared(op: OperationKind) -> Self {
		Self::new(op, ErrorKind::NotPrepared, None)
	}

	/// Creates a new "closed" error.
	pub fn closed(op: OperationKind) -> Self {
		Self::new(op, ErrorKind::Closed, None)
	}

	/// Creates a new error for a segment too large to fit in a pooled block.
	pub fn segment_too_large(segment: Segment, capacity: usize) -> Self {
		Self::new(
			OperationKind::Prepare,
			ErrorKind::SegmentTooLarge(segment.size, capacity),
			None
		)
	}

	/// Creates a new pool error.
	pub fn pool(op: OperationKind, error: PoolError) -> Self {
		Self::new(op, ErrorKind::PoolExhausted, Some(error.into()))
	}

	/// Creates a new read error for `segment`, with an optional underlying cause.
	pub fn read(segment: Segment, cause: Option<io::Error>) -> Self {
		Self::new(
			OperationKind::Read,
			ErrorKind::Read(segment.position, segment.size),
			cause.map(Into::into)
		)
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> OperationKind { self.op }

	/// Returns the error kind.
	pub fn kind(&self) -> ErrorKind { self.kind }

	/// Returns the segment whose read failed, if this is a read error.
	pub fn segment(&self) -> Option<Segment> {
		if let ErrorKind::Read(position, size) = self.kind {
			Some(Segment::new(position, size))
		} else {
			None
		}
	}

	/// Returns the source downcast into an IO Error, if possible.
	pub fn io_source(&self) -> Option<&io::Error> {
		self.source.as_ref()?.downcast_ref()
	}

	/// Returns `true` if the stream was closed.
	pub fn is_closed(&self) -> bool { matches!(self.kind, ErrorKind::Closed) }

	/// Returns `true` if this is a read failure.
	pub fn is_read(&self) -> bool { matches!(self.kind, ErrorKind::Read(..)) }
}

impl ErrorKind {
	fn io_kind(&self) -> io::ErrorKind {
		match self {
			Self::Configuration(_) |
			Self::SegmentTooLarge(..) => io::ErrorKind::InvalidInput,
			Self::NotPrepared |
			Self::Closed        => io::ErrorKind::NotConnected,
			Self::PoolExhausted => io::ErrorKind::OutOfMemory,
			Self::Read(..)      => io::ErrorKind::Other,
		}
	}
}

/// Keeps the kind of the underlying IO error, except `Interrupted`. Readers retry
/// interrupted reads, which would discard a failed segment's cause.
impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		let kind = match value.io_source().map(io::Error::kind) {
			Some(io::ErrorKind::Interrupted) => io::ErrorKind::Other,
			Some(kind) => kind,
			None => value.kind.io_kind()
		};
		io::Error::new(kind, value)
	}
}
