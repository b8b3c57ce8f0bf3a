use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sola_bytecode::{Chunk, Opcode, Value};
use sola_verify::verify_chunk;

fn build_loop_chunk(iterations: u16) -> Chunk {
    let mut chunk = Chunk::new();
    let one = chunk.add_constant(Value::Int(1));
    for _ in 0..iterations {
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(one, 1);
        chunk.write_op(Opcode::Pop, 1);
    }
    chunk.write_op(Opcode::ReturnNull, 1);
    chunk
}

fn bench_verify_large_chunk(c: &mut Criterion) {
    let chunk = build_loop_chunk(2000);
    c.bench_function("verify_chunk_6000_instructions", |b| {
        b.iter(|| black_box(verify_chunk(&chunk, 0)).unwrap());
    });
}

criterion_group!(benches, bench_verify_large_chunk);
criterion_main!(benches);
