use apiary_core::config::SimConfig;
use apiary_core::engine::Engine;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn engine_with_population(detailed: usize, batched: usize, statistical: usize) -> Engine {
    let mut config = SimConfig::default();
    config.world.seed = Some(42);
    config.tiers.detailed_quota = detailed;
    config.tiers.batched_quota = batched;
    config.tiers.statistical_quota = statistical;
    config.tiers.detailed_capacity = detailed * 2;
    config.tiers.batched_capacity = batched * 2;
    config.tiers.statistical_capacity = statistical * 2;
    Engine::new(config).unwrap()
}

fn bench_tick_full_population(c: &mut Criterion) {
    let mut engine = engine_with_population(300, 2000, 22_700);
    c.bench_function("tick_25k_agents", |b| {
        b.iter(|| {
            engine.tick().unwrap();
            black_box(engine.tick_count())
        })
    });
}

fn bench_tick_detailed_heavy(c: &mut Criterion) {
    let mut engine = engine_with_population(600, 1000, 1000);
    c.bench_function("tick_detailed_heavy", |b| {
        b.iter(|| {
            engine.tick().unwrap();
            black_box(engine.tick_count())
        })
    });
}

fn bench_field_update(c: &mut Criterion) {
    use apiary_core::config::FieldConfig;
    use apiary_core::field::PheromoneField;

    let mut field = PheromoneField::new(&FieldConfig::default(), 1000.0, 1000.0);
    let deposits: Vec<(f32, f32)> = (0..300)
        .map(|i| ((i % 30) as f32 * 30.0, (i / 30) as f32 * 90.0))
        .collect();
    field.deposit(&deposits, 1.0);

    c.bench_function("field_update_128", |b| {
        b.iter(|| {
            field.update();
            black_box(field.peak_intensity())
        })
    });
}

criterion_group!(
    benches,
    bench_tick_full_population,
    bench_tick_detailed_heavy,
    bench_field_update
);
criterion_main!(benches);
