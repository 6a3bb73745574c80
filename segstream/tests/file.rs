// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use pretty_assertions::assert_eq;
use tempfile::{NamedTempFile, TempDir};
use segstream::{BlockPool, ChannelHandle, FileChannelManager, PrefetchStream, Segment, StreamOptions};

#[macro_use]
mod common;

fn pattern(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 7 % 256) as u8).collect()
}

fn temp_file(data: &[u8]) -> io::Result<NamedTempFile> {
	let mut file = NamedTempFile::new()?;
	file.write_all(data)?;
	file.flush()?;
	Ok(file)
}

#[test]
fn file_stream() -> io::Result<()> {
	let data = pattern(4096);
	let (backing, segments) = common::scatter(&data, &[100, 250, 0, 31, 255, 7], 255);
	let file = temp_file(&backing)?;

	let pool = Arc::new(BlockPool::with_block_size(256));
	let mut stream = PrefetchStream::new(
		ChannelHandle::from(file.path()),
		pool.clone(),
		FileChannelManager::new(2)?
	)
	.with_options(StreamOptions::default().with_look_ahead(4))
	.with_segments(segments);
	stream.prepare()?;

	let mut read = Vec::new();
	stream.read_to_end(&mut read)?;
	assert_eq!(read, data);
	assert_eq!(pool.stats().outstanding, 0);
	Ok(())
}

#[test]
fn segments_across_files() -> io::Result<()> {
	let dir = TempDir::new()?;
	let parts = [pattern(300), pattern(120), pattern(64)];
	let mut segments = Vec::new();
	for (index, part) in parts.iter().enumerate() {
		// Each file holds one segment, behind 16 bytes of padding per file index.
		let mut contents = vec![0xFF; index * 16];
		contents.extend_from_slice(part);
		std::fs::write(dir.path().join(format!("part-{index}")), contents)?;
		segments.push(Segment::new(index as u64 * 16, part.len() as u64));
	}

	let root = dir.path().to_path_buf();
	let resolver = move |segment: &Segment| -> io::Result<ChannelHandle> {
		Ok(root.join(format!("part-{}", segment.position / 16)).into())
	};
	let mut stream = PrefetchStream::new(
		resolver,
		Arc::new(BlockPool::with_block_size(512)),
		FileChannelManager::new(3)?
	).with_segments(segments);
	stream.prepare()?;

	let mut read = Vec::new();
	stream.read_to_end(&mut read)?;
	assert_eq!(read, parts.concat());
	Ok(())
}

#[test]
fn truncated_file() -> io::Result<()> {
	let file = temp_file(&pattern(100))?;
	let mut stream = PrefetchStream::new(
		ChannelHandle::from(file.path()),
		Arc::new(BlockPool::with_block_size(128)),
		FileChannelManager::new(1)?
	).with_segments([Segment::new(0, 64), Segment::new(64, 64)]);
	stream.prepare()?;

	assert_eq!(stream.read(&mut [0; 128])?, 64);
	let error = stream.read(&mut [0; 128]).unwrap_err();
	assert_eq!(error.segment(), Some(Segment::new(64, 64)));
	assert_eq!(io::Error::from(error).kind(), io::ErrorKind::UnexpectedEof);
	Ok(())
}

#[test]
fn missing_file() -> io::Result<()> {
	let path = PathBuf::from("segstream-missing-file");
	let mut stream = PrefetchStream::new(
		ChannelHandle::from(path),
		Arc::new(BlockPool::default()),
		FileChannelManager::new(1)?
	).with_segments([Segment::new(0, 16)]);
	stream.prepare()?;

	let error = io::Read::read(&mut stream, &mut [0; 16]).unwrap_err();
	assert_eq!(error.kind(), io::ErrorKind::NotFound);
	Ok(())
}
