use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use protocol::cipher::{CipherBinding, Direction};
use protocol::codec::{CodecLimits, FrameCodec};
use protocol::packets::{ServerListItem, build_server_list};

fn sample_request() -> Vec<u8> {
    vec![0xC1, 0x06, 0xF4, 0x03, 0x01, 0x00]
}

fn sample_list() -> Vec<ServerListItem> {
    (0..16u16)
        .map(|server_id| ServerListItem {
            server_id,
            load: (server_id * 5) as u8,
        })
        .collect()
}

fn bench_cipher(c: &mut Criterion) {
    let binding = CipherBinding::classic();
    let encryptor = binding.create_encryptor(Direction::ClientToServer);
    let decryptor = binding.create_decryptor(Direction::ClientToServer);

    let frame = sample_request();
    c.bench_with_input(
        BenchmarkId::new("encrypt", "connect_info_request"),
        &frame,
        |b, frame| {
            b.iter(|| encryptor.encrypt(black_box(frame)));
        },
    );

    let encrypted = encryptor.encrypt(&frame);
    c.bench_with_input(
        BenchmarkId::new("decrypt", "connect_info_request"),
        &encrypted,
        |b, encrypted| {
            b.iter(|| decryptor.decrypt(black_box(encrypted)).unwrap());
        },
    );
}

fn bench_framing(c: &mut Criterion) {
    let codec = FrameCodec::new(CodecLimits::default());
    let mut stream = Vec::new();
    for _ in 0..8 {
        stream.extend_from_slice(&sample_request());
    }

    c.bench_with_input(
        BenchmarkId::new("frame_len", "request_burst"),
        &stream,
        |b, stream| {
            b.iter(|| codec.try_frame_len(black_box(stream)).unwrap());
        },
    );
}

fn bench_server_list(c: &mut Criterion) {
    let items = sample_list();
    c.bench_with_input(
        BenchmarkId::new("serialize", "server_list"),
        &items,
        |b, items| {
            b.iter(|| build_server_list(black_box(items)));
        },
    );
}

fn protocol_benches(c: &mut Criterion) {
    bench_cipher(c);
    bench_framing(c);
    bench_server_list(c);
}

criterion_group!(benches, protocol_benches);
criterion_main!(benches);
