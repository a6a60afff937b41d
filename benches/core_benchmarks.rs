use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lilith_runner::engine_core::models::{ProcessRecord, ProcessStatus};
use lilith_runner::exec::registry::ProcessRegistry;
use lilith_runner::utils::text::project;

fn bench_output_projection(c: &mut Criterion) {
    let raw: Vec<u8> = (0..2000)
        .flat_map(|i| format!("build step {} finished\n", i).into_bytes())
        .collect();

    c.bench_function("project_full_buffer", |b| {
        b.iter(|| project(black_box(&raw), 0))
    });
    c.bench_function("project_tail_20", |b| {
        b.iter(|| project(black_box(&raw), 20))
    });
}

fn bench_registry_list(c: &mut Criterion) {
    let registry = ProcessRegistry::new();
    for i in 0..500 {
        let mut record = ProcessRecord::new(format!("job {}", i));
        if i % 2 == 0 {
            record.finish_exit(Some(0));
        }
        registry.insert(record);
    }

    c.bench_function("registry_list_running", |b| {
        b.iter(|| registry.list(black_box(Some(ProcessStatus::Running))))
    });
}

criterion_group!(benches, bench_output_projection, bench_registry_list);
criterion_main!(benches);
