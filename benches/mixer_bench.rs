//! Benchmarks for the mixing core and the tone synthesizer.
//!
//! Run with: cargo bench
//!
//! Reference timing at 44.1kHz output:
//!   - 441 frames  = 10ms deadline
//!   - 1024 frames = 23.2ms deadline
//!   - 4096 frames = 92.9ms deadline
//!
//! Groups:
//!   - mix/*    Extraction throughput, resampling, mid-window adds
//!   - synth/*  One-note render cost

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use premix::{Adsr, Channels, Mixer, Playback, Waveform};

/// Extraction sizes a driver typically asks for per tick.
const EXTRACT_SIZES: &[usize] = &[441, 1024, 4096];

fn source_tone(frames: usize) -> Vec<f32> {
    let mut tone = vec![0.0f32; frames];
    premix::synth(
        &mut tone,
        44_100,
        frames as f32 / 44_100.0,
        57.0,
        0.8,
        None,
        &Waveform::SAW,
        Some(&Waveform::TRIANGLE),
    );
    tone
}

fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix/extract");
    let tone = source_tone(20_000);

    for &voices in &[1usize, 8, 32, 128] {
        for &size in EXTRACT_SIZES {
            let id = BenchmarkId::new(format!("{voices}_voices"), size);
            group.bench_with_input(id, &size, |b, &size| {
                let mut out = vec![0i16; size * 2];
                b.iter(|| {
                    // Fresh mixer per iteration so every extract pays the
                    // full render, not a window re-read.
                    let mut mixer = Mixer::new(8192);
                    for v in 0..voices {
                        mixer.add(
                            Playback::new(&tone[..], Channels::Mono, (v * 7) as u64, 8000)
                                .volume(1.0 / voices as f32)
                                .pan((v as f32 / voices as f32) * 2.0 - 1.0)
                                .stable(),
                        );
                    }
                    black_box(mixer.mix(black_box(&mut out), 0, size))
                })
            });
        }
    }
    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix/resample");
    let tone = source_tone(40_000);

    for &step in &[0.5f32, 1.0, 1.73] {
        group.bench_with_input(BenchmarkId::from_parameter(step), &step, |b, &step| {
            let mut out = vec![0i16; 4096 * 2];
            b.iter(|| {
                let mut mixer = Mixer::new(8192);
                mixer.add(
                    Playback::new(&tone[..], Channels::Mono, 0, 8000)
                        .step(step)
                        .stable(),
                );
                black_box(mixer.mix(black_box(&mut out), 0, 4096))
            })
        });
    }
    group.finish();
}

fn bench_incremental_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix/incremental_add");
    let tone = source_tone(20_000);

    // Cost of dropping a new playback into an already-materialized window.
    group.bench_function("add_into_window", |b| {
        b.iter(|| {
            let mut mixer = Mixer::new(8192);
            let mut out = vec![0i16; 8192 * 2];
            mixer.mix(&mut out, 0, 8192);
            mixer.add(
                Playback::new(&tone[..], Channels::Mono, 100, 8000)
                    .stable(),
            );
            black_box(mixer.active_count())
        })
    });
    group.finish();
}

fn bench_synth(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/note");
    let adsr = Adsr {
        attack_time: 0.005,
        decay_time: 0.05,
        sustain_level: 0.6,
        release_time: 0.25,
    };

    for &secs in &[0.1f32, 0.5, 2.0] {
        group.bench_with_input(BenchmarkId::from_parameter(secs), &secs, |b, &secs| {
            let mut out = vec![0.0f32; ((secs + 0.25) * 44_100.0) as usize + 1];
            b.iter(|| {
                black_box(premix::synth(
                    black_box(&mut out),
                    44_100,
                    secs,
                    69.0,
                    1.0,
                    Some(&adsr),
                    &Waveform::SQUARE,
                    Some(&Waveform::SAW),
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mix, bench_resample, bench_incremental_add, bench_synth);
criterion_main!(benches);
