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

//! ## How it works
//!
//! Data to be read is stored as *segments*, ranges of bytes at arbitrary positions
//! in a backing *channel*, usually a file. Read back-to-back in order, segments
//! make up one logical stream. A [`PrefetchStream`] presents this stream through
//! ordinary blocking reads, while the segments themselves are fetched
//! asynchronously by a [`ChannelManager`].
//!
//! ### Blocks and slots
//!
//! Segment bytes are read into reusable fixed-capacity *blocks*, claimed from a
//! [`Pool`]. When prepared, the stream claims one block for each of its *slots*,
//! a ring of `look_ahead` positions, and immediately schedules a read of the next
//! segment into each. The consumer waits on the oldest slot until its read
//! completes, then copies bytes out of it. Once a slot's segment is consumed, its
//! block is reused in place for the next segment not yet scheduled, so a constant
//! window of reads stays in flight while the consumer works. Past the last
//! segment, blocks are collected back into the pool.
//!
//! Memory is bounded by the look-ahead width: a stream holds at most `look_ahead`
//! blocks no matter how many segments it reads, and each block is collected
//! exactly once, whether the stream is read to the end, fails, or is closed
//! early. Every segment must fit into a single block.
//!
//! ### Completions
//!
//! Each scheduled read is a [`ReadRequest`] owning its block. The channel manager
//! fills the request's buffer and completes it, from any thread. Completion hands
//! the block back to its slot and wakes the consumer. A request dropped before
//! completing fails its segment, so blocks can't leak through a channel manager.
//! If the stream was closed in the meantime, the completion collects the block
//! itself.
//!
//! ### Failures
//!
//! Failed segment reads are recorded on their slot and reported when the consumer
//! reaches them. The stream doesn't retry, and can't skip past a failed segment.

mod channel;
mod completion;
pub mod error;
mod options;
pub mod pool;
mod segment;
mod slot;
mod std_io;
mod stream;

pub use channel::*;
pub use completion::{OperationHandle, ReadRequest};
pub use error::{Error, ErrorKind, OperationKind, Result};
pub use options::*;
pub use pool::{Block, BlockPool, Pool, PoolError, PoolStats};
pub use segment::Segment;
pub use stream::PrefetchStream;
