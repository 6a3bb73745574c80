// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::NamedTempFile;
use segstream::{BlockPool, ChannelHandle, FileChannelManager, MemoryChannelManager, PrefetchStream, Segment, StreamOptions};

const LEN: usize = 1 << 20;
const SEGMENT_SIZE: u64 = 4096;

fn segments() -> Vec<Segment> {
	(0..LEN as u64 / SEGMENT_SIZE).map(|i| Segment::new(i * SEGMENT_SIZE, SEGMENT_SIZE)).collect()
}

fn memory_stream(c: &mut Criterion) {
	let data: Arc<[u8]> = (0..LEN).map(|i| i as u8).collect::<Vec<_>>().into();
	let pool = Arc::new(BlockPool::default());
	let mut group = c.benchmark_group("memory_stream");
	group.throughput(Throughput::Bytes(LEN as u64));
	for look_ahead in [1, 2, 8] {
		group.bench_with_input(BenchmarkId::from_parameter(look_ahead), &look_ahead, |b, &look_ahead| b.iter(|| {
			let mut stream = PrefetchStream::new(
				ChannelHandle::from("memory"),
				pool.clone(),
				MemoryChannelManager::new(data.clone())
			)
			.with_options(StreamOptions::default().with_look_ahead(look_ahead))
			.with_segments(segments());
			stream.prepare().unwrap();

			let mut buf = [0; 1500];
			while stream.read(&mut buf).unwrap() > 0 {
				black_box(&buf);
			}
		}));
	}
	group.finish();
}

fn file_stream(c: &mut Criterion) {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(&vec![0x5A; LEN]).unwrap();
	file.flush().unwrap();

	let pool = Arc::new(BlockPool::default());
	let manager = Arc::new(FileChannelManager::new(4).unwrap());
	c.bench_function("file_stream", |b| b.iter(|| {
		let mut stream = PrefetchStream::new(
			ChannelHandle::from(file.path()),
			pool.clone(),
			manager.clone()
		)
		.with_options(StreamOptions::default().with_look_ahead(8))
		.with_segments(segments());
		stream.prepare().unwrap();

		let mut sink = Vec::with_capacity(LEN);
		stream.read_to_end(&mut sink).unwrap();
		black_box(sink);
	}));
}

// https://github.com/bheisler/criterion.rs/issues/162
criterion_group! {
	name = benches;
	config = Criterion::default()
		.sample_size(10)
		.warm_up_time(Duration::from_millis(5))
		.measurement_time(Duration::from_millis(50));
	targets = memory_stream, file_stream
}
criterion_main!(benches);
