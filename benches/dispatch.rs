//! Dispatch benchmarks
//!
//! Measures the per-call overhead of bound callables against a plain Lua function.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use laf::ffi::MethodTable;
use laf::{NativeCallable, ScriptHost};

struct Accumulator {
    total: i64,
}

impl Accumulator {
    fn add(&mut self, n: i64) -> i64 {
        self.total += n;
        self.total
    }
}

fn setup_host() -> ScriptHost {
    let host = ScriptHost::new().unwrap();
    host.register("native_add", NativeCallable::closure(|a: i64, b: i64| a + b)).unwrap();
    host.register("native_concat", NativeCallable::closure(|a: String, b: String| a + &b)).unwrap();
    host.exec("function lua_add(a, b) return a + b end").unwrap();

    host.register_type::<Accumulator>("bench::Accumulator").unwrap();
    host.attach_methods(
        &MethodTable::builder::<Accumulator>()
            .method("add", NativeCallable::method_mut(Accumulator::add))
            .build()
            .unwrap(),
    )
    .unwrap();
    let acc = host.create_handle(Accumulator { total: 0 }).unwrap();
    host.set_global("acc", acc).unwrap();
    host
}

fn bench_free_calls(c: &mut Criterion) {
    let host = setup_host();
    let mut group = c.benchmark_group("free_calls");

    for iterations in [1_usize, 100, 1_000] {
        for function in ["lua_add", "native_add"] {
            let chunk = format!("for i = 1, {} do {}(i, 1) end", iterations, function);
            group.bench_with_input(BenchmarkId::new(function, iterations), &chunk, |b, chunk| {
                b.iter(|| host.exec(black_box(chunk)).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_string_marshaling(c: &mut Criterion) {
    let host = setup_host();

    c.bench_function("native_concat", |b| {
        b.iter(|| host.exec(black_box("native_concat('hello', ' world')")).unwrap());
    });
}

fn bench_method_calls(c: &mut Criterion) {
    let host = setup_host();

    c.bench_function("method_mut_1000", |b| {
        b.iter(|| host.exec(black_box("for i = 1, 1000 do acc:add(1) end")).unwrap());
    });
}

criterion_group!(benches, bench_free_calls, bench_string_marshaling, bench_method_calls);
criterion_main!(benches);
