use criterion::{criterion_group, criterion_main, Criterion};

use trackplay_core::map_adapter::NoMap;
use trackplay_core::playback::{AdvancePolicy, PlaybackConfig, PlaybackEngine, Speed};
use trackplay_core::renderer::WebMap;
use trackplay_core::track::{Path, Point};

fn long_path(len: usize) -> Path {
    Path::from_points((0..len).map(|i| {
        let t = i as f64 / len as f64;
        Point::new(28.5 + t * 0.2, 77.1 + (t * 20.0).sin() * 0.05)
    }))
}

fn play_to_end<M: trackplay_core::map_adapter::MapAdapter>(engine: &mut PlaybackEngine<M>) {
    engine.start().unwrap();
    while let Some(schedule) = engine.schedule() {
        engine.tick(schedule.id);
    }
}

fn playback(c: &mut Criterion) {
    let path = long_path(10_000);

    c.bench_function("frame_fraction_no_map", |b| {
        let config = PlaybackConfig::default();
        let mut engine = PlaybackEngine::new(NoMap, config);
        engine.load_path(path.clone());
        engine.set_speed(Speed::Multiplier(4));
        b.iter(|| {
            play_to_end(&mut engine);
            std::hint::black_box(engine.progress_percent());
        });
    });

    c.bench_function("fixed_steps_web_map", |b| {
        let config = PlaybackConfig {
            policy: AdvancePolicy::FixedSteps,
            ..PlaybackConfig::default()
        };
        let mut engine = PlaybackEngine::new(WebMap::new(), config);
        engine.load_path(path.clone());
        b.iter(|| {
            play_to_end(&mut engine);
            std::hint::black_box(engine.map().snapshot().version);
        });
    });
}

fn path_math(c: &mut Criterion) {
    let path = long_path(10_000);
    c.bench_function("total_length_m", |b| {
        b.iter(|| std::hint::black_box(path.total_length_m()))
    });
    c.bench_function("position_at", |b| {
        b.iter(|| {
            for i in 0..1000 {
                std::hint::black_box(path.position_at(i as f64 * 9.99));
            }
        })
    });
}

criterion_group!(benches, playback, path_math);
criterion_main!(benches);
