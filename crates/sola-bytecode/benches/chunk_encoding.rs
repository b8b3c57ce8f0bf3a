use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sola_bytecode::{Chunk, Opcode, Value};

fn build_arithmetic_chunk(iterations: u16) -> Chunk {
    let mut chunk = Chunk::new();
    let one = chunk.add_constant(Value::Int(1));
    for _ in 0..iterations {
        chunk.write_op(Opcode::Push, 1);
        chunk.write_u16(one, 1);
        chunk.write_op(Opcode::Add, 1);
    }
    chunk.write_op(Opcode::Return, 1);
    chunk
}

fn bench_write_instructions(c: &mut Criterion) {
    c.bench_function("chunk_write_1000_instructions", |b| {
        b.iter(|| black_box(build_arithmetic_chunk(1000)));
    });
}

fn bench_disassemble(c: &mut Criterion) {
    let chunk = build_arithmetic_chunk(500);
    c.bench_function("chunk_disassemble_500_instructions", |b| {
        b.iter(|| black_box(chunk.disassemble("bench")));
    });
}

fn bench_patch_jump(c: &mut Criterion) {
    c.bench_function("chunk_reserve_and_patch_jump", |b| {
        b.iter(|| {
            let mut chunk = Chunk::new();
            chunk.write_op(Opcode::Jump, 1);
            let slot = chunk.reserve_jump(1);
            chunk.write_op(Opcode::Pop, 1);
            chunk.patch_jump(slot).unwrap();
            black_box(chunk)
        });
    });
}

criterion_group!(
    benches,
    bench_write_instructions,
    bench_disassemble,
    bench_patch_jump
);
criterion_main!(benches);
