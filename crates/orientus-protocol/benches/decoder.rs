//! FrameDecoder 吞吐量基准
//!
//! 模拟 50 Hz 全量数据流：一秒钟内设备上报的所有帧拼成一段字节流，
//! 分别以整段 / 64 字节块两种方式喂入解码器。

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use orientus_protocol::*;

fn one_second_of_traffic() -> Vec<u8> {
    let fast = [
        (ID_QUATERNION_STD_DEV, 12),
        (ID_QUATERNION_ORIENTATION, 16),
        (ID_ACCELERATION, 12),
        (ID_ANGULAR_VELOCITY, 12),
        (ID_RAW_SENSORS, 48),
        (ID_EULER_ORIENTATION, 12),
    ];
    let slow = [(ID_STATUS, 4), (ID_RUNNING_TIME, 8), (ID_DEVICE_INFORMATION, 24)];

    let mut stream = Vec::new();
    for tick in 0..50 {
        for (id, len) in fast {
            stream.extend(RawFrame::new(id, vec![tick as u8; len]).unwrap().to_bytes());
        }
        if tick % 10 == 0 {
            for (id, len) in slow {
                stream.extend(RawFrame::new(id, vec![0u8; len]).unwrap().to_bytes());
            }
        }
    }
    stream
}

fn bench_decoder(c: &mut Criterion) {
    let stream = one_second_of_traffic();
    let mut group = c.benchmark_group("frame_decoder");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("whole_stream", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            black_box(decoder.feed(black_box(&stream)).count())
        })
    });

    group.bench_function("chunks_64", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut count = 0;
            for chunk in stream.chunks(64) {
                count += decoder.feed(black_box(chunk)).count();
            }
            black_box(count)
        })
    });

    group.bench_function("decode_packets", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            decoder
                .feed(black_box(&stream))
                .filter(|frame| decode(frame).is_ok())
                .count()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decoder);
criterion_main!(benches);
