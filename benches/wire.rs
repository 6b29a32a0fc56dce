use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pbmodel::wire::{decode_varint, encode_varint, Tag, WireType};

fn varint_round_trip(c: &mut Criterion) {
    let values: Vec<u64> = vec![0, 1, 127, 128, 16383, 16384, 1 << 31, u64::MAX];

    c.bench_function("encode_varint", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(10);
            for &v in &values {
                buf.clear();
                encode_varint(black_box(v), &mut buf);
            }
        })
    });

    let mut encoded = Vec::new();
    for &v in &values {
        encode_varint(v, &mut encoded);
    }

    c.bench_function("decode_varint", |b| {
        b.iter(|| {
            let mut offset = 0;
            while offset < encoded.len() {
                let (_, consumed) = decode_varint(black_box(&encoded[offset..]), offset).unwrap();
                offset += consumed;
            }
        })
    });
}

fn tag_round_trip(c: &mut Criterion) {
    let tags: Vec<Tag> = (1u32..=64)
        .map(|field| Tag::new(field, WireType::Varint))
        .collect();

    c.bench_function("encode_tag", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(2);
            for &tag in &tags {
                buf.clear();
                tag.encode(&mut buf);
            }
        })
    });

    let mut encoded = Vec::new();
    for &tag in &tags {
        tag.encode(&mut encoded);
    }

    c.bench_function("decode_tag", |b| {
        b.iter(|| {
            let mut offset = 0;
            while offset < encoded.len() {
                let (_, consumed) = Tag::decode(black_box(&encoded[offset..]), offset)
                    .unwrap()
                    .unwrap();
                offset += consumed;
            }
        })
    });
}

criterion_group!(benches, varint_round_trip, tag_round_trip);
criterion_main!(benches);
