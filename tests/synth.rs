//! Regression tests for the tone synthesizer.

use premix::{synth, synth_add, Adsr, Waveform};

const RATE: u32 = 44_100;

#[test]
fn envelope_shapes_the_note() {
    let adsr = Adsr {
        attack_time: 0.01,
        decay_time: 0.01,
        sustain_level: 0.5,
        release_time: 0.1,
    };
    let mut out = vec![0.0f32; 2 * RATE as usize];
    let n = synth(&mut out, RATE, 1.0, 69.0, 1.0, Some(&adsr), &Waveform::SQUARE, None);
    assert_eq!(n, ((1.0 + 0.1) * RATE as f32) as usize);

    // Endpoints are silent.
    assert_eq!(out[0], 0.0, "attack starts from zero");
    assert!(out[n - 1].abs() < 0.01, "release decays to zero");

    // Mid-sustain, a unit square at sustain 0.5 swings close to ±0.5.
    let sustain = &out[(0.4 * RATE as f32) as usize..(0.6 * RATE as f32) as usize];
    let peak = sustain.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    assert!((peak - 0.5).abs() < 0.02, "sustain peak {peak} should be ~0.5");
    assert!(sustain.iter().any(|&x| x > 0.45));
    assert!(sustain.iter().any(|&x| x < -0.45));
}

#[test]
fn a4_hits_440_hz() {
    let adsr = Adsr {
        attack_time: 0.001,
        decay_time: 0.0,
        sustain_level: 1.0,
        release_time: 0.01,
    };
    let mut out = vec![0.0f32; RATE as usize + 4096];
    let n = synth(&mut out, RATE, 1.0, 69.0, 1.0, Some(&adsr), &Waveform::SQUARE, None);
    assert!(n > (0.9 * RATE as f32) as usize);

    // Measure frequency between the first and last falling zero crossings
    // in the steady-state middle of the note.
    let lo = (0.1 * RATE as f32) as usize;
    let hi = (0.9 * RATE as f32) as usize;
    let crossings: Vec<usize> = (lo + 1..hi)
        .filter(|&i| out[i - 1] > 0.0 && out[i] <= 0.0)
        .collect();
    assert!(crossings.len() > 100, "expected a steady oscillation");

    let cycles = (crossings.len() - 1) as f32;
    let span_secs = (crossings[crossings.len() - 1] - crossings[0]) as f32 / RATE as f32;
    let freq = cycles / span_secs;
    assert!(
        (freq - 440.0).abs() < 1.0,
        "measured {freq} Hz for MIDI pitch 69"
    );
}

#[test]
fn add_over_write_doubles_exactly() {
    let adsr = Adsr {
        attack_time: 0.005,
        decay_time: 0.05,
        sustain_level: 0.6,
        release_time: 0.25,
    };
    let mut layered = vec![0.0f32; 32_768];
    let n1 = synth(
        &mut layered,
        RATE,
        0.4,
        64.0,
        0.8,
        Some(&adsr),
        &Waveform::SAW,
        Some(&Waveform::SAW_PHASED),
    );
    let n2 = synth_add(
        &mut layered,
        RATE,
        0.4,
        64.0,
        0.8,
        Some(&adsr),
        &Waveform::SAW,
        Some(&Waveform::SAW_PHASED),
    );
    assert_eq!(n1, n2);

    let mut single = vec![0.0f32; 32_768];
    let n = synth(
        &mut single,
        RATE,
        0.4,
        64.0,
        0.8,
        Some(&adsr),
        &Waveform::SAW,
        Some(&Waveform::SAW_PHASED),
    );
    assert_eq!(n, n1);
    for i in 0..n {
        assert_eq!(layered[i], 2.0 * single[i], "sample {i}");
    }
    assert!(single[..n].iter().any(|&x| x != 0.0));
}

#[test]
fn default_envelope_is_a_click_guard() {
    // No ADSR given: near-instant attack and release, full sustain.
    let mut out = vec![0.0f32; 8192];
    let n = synth(&mut out, RATE, 0.1, 69.0, 1.0, None, &Waveform::TRIANGLE, None);
    assert_eq!(n, ((0.1 + 0.002) * RATE as f32) as usize);
    assert_eq!(out[0], 0.0);
    let peak = out[..n].iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    assert!(peak > 0.9, "full sustain should reach close to unit level");
}

#[test]
fn morph_changes_the_tail_of_the_note() {
    // Morphing square→triangle: early cycles look square (flat tops),
    // late cycles look triangular (no flat region at ±1).
    let adsr = Adsr {
        attack_time: 0.0,
        decay_time: 0.0,
        sustain_level: 1.0,
        release_time: 0.0,
    };
    let mut morphed = vec![0.0f32; RATE as usize];
    let n = synth(
        &mut morphed,
        RATE,
        1.0,
        57.0,
        1.0,
        Some(&adsr),
        &Waveform::SQUARE,
        Some(&Waveform::TRIANGLE),
    );
    let early = &morphed[..2048];
    let late = &morphed[n - 2048..n];

    let near_one = |s: &[f32]| s.iter().filter(|x| x.abs() > 0.95).count();
    assert!(
        near_one(early) > near_one(late) * 4,
        "square start should dwell near ±1 far more than the triangle end ({} vs {})",
        near_one(early),
        near_one(late)
    );
}

#[test]
fn output_clamps_to_buffer_limit() {
    let mut out = vec![0.0f32; 500];
    let n = synth(&mut out, RATE, 10.0, 60.0, 1.0, None, &Waveform::SAW, None);
    assert_eq!(n, 500);
}
