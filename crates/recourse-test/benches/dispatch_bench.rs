//! Benchmarks for condition dispatch and restart lookup

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use recourse_core::{
    find_restart, handler_bind, handler_case, restart_bind, restart_case, signal, ConditionType,
};
use recourse_test::DivideByZero;

/// Nest `depth` non-matching handlers around `f`
fn with_noise<T>(depth: usize, f: &mut dyn FnMut() -> T) -> T {
    if depth == 0 {
        return f();
    }
    handler_bind(&ConditionType::of::<u64>(), |_| {}, || with_noise(depth - 1, f))
        .expect("bind within default limits")
}

/// Nest `depth` restarts with other names around `f`
fn with_restart_noise<T>(depth: usize, f: &mut dyn FnMut() -> T) -> T {
    if depth == 0 {
        return f();
    }
    restart_bind("noise", |_: ()| (), || with_restart_noise(depth - 1, f))
        .expect("bind within default limits")
}

fn bench_signal_unhandled(c: &mut Criterion) {
    c.bench_function("signal_unhandled", |b| b.iter(|| signal(black_box(&DivideByZero))));
}

fn bench_signal_innermost(c: &mut Criterion) {
    let ty = ConditionType::of::<DivideByZero>();
    handler_bind(&ty, |_| {}, || {
        c.bench_function("signal_innermost", |b| b.iter(|| signal(black_box(&DivideByZero))));
    })
    .expect("bind");
}

fn bench_signal_through_noise(c: &mut Criterion) {
    let ty = ConditionType::of::<DivideByZero>();
    handler_bind(&ty, |_| {}, || {
        with_noise(32, &mut || {
            c.bench_function("signal_through_32_bindings", |b| {
                b.iter(|| signal(black_box(&DivideByZero)))
            });
        })
    })
    .expect("bind");
}

fn bench_handler_case_unwind(c: &mut Criterion) {
    let ty = ConditionType::of::<DivideByZero>();
    c.bench_function("handler_case_unwind", |b| {
        b.iter(|| {
            handler_case(&ty, |_| 0, || {
                signal(&DivideByZero);
                1
            })
        })
    });
}

fn bench_find_restart(c: &mut Criterion) {
    restart_bind("target", |_: ()| (), || {
        with_restart_noise(16, &mut || {
            c.bench_function("find_restart_depth_16", |b| {
                b.iter(|| find_restart(black_box("target")))
            });
        })
    })
    .expect("bind");
}

fn bench_restart_case_unwind(c: &mut Criterion) {
    c.bench_function("restart_case_unwind", |b| {
        b.iter(|| {
            restart_case("use-value", |v: i32| v, || {
                let _ = find_restart("use-value").map(|r| r.invoke(black_box(7)));
                0
            })
        })
    });
}

criterion_group!(
    benches,
    bench_signal_unhandled,
    bench_signal_innermost,
    bench_signal_through_noise,
    bench_handler_case_unwind,
    bench_find_restart,
    bench_restart_case_unwind,
);
criterion_main!(benches);
