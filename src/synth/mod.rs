//! Morphable waveform synthesis.
//!
//! A [`Waveform`] describes one cycle as two halves over phase `[0, 2)`: the
//! left half rises from a programmable zero-wait through a peak and falls to
//! a half-height; the right half is the left half inverted, either plainly
//! or mirror-reflected. Because the shape is a handful of scalars, two
//! shapes can be blended per cycle, morphing the timbre across a note's
//! life.
//!
//! [`synth`] renders one ADSR-enveloped note into a mono float buffer;
//! [`synth_add`] accumulates instead of overwriting, for layering notes
//! into a shared buffer. The output works directly as a playback source for
//! [`Mixer`](crate::mix::Mixer).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One-cycle wave shape descriptor.
///
/// Canonical shapes (see the associated constants): triangle is
/// `{0, 0.5, 0}`, square is `{0, 0, 1}`, saw is `{0, 0, 0}` reflected.
/// Raising `zero_wait` narrows the active part of the cycle for PWM
/// effects.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waveform {
    /// Time spent at zero before the waveform starts, 0..1 of the half.
    pub zero_wait: f32,
    /// When the peak (at 1) occurs, 0..1; 1 is the halfway point.
    pub peak_time: f32,
    /// Height of the waveform at the halfway point, before it flips.
    pub half_height: f32,
    /// Second half assembly: false inverts the first half, true reflects
    /// and inverts it.
    pub reflect: bool,
}

impl Waveform {
    pub const TRIANGLE: Waveform = Waveform {
        zero_wait: 0.0,
        peak_time: 0.5,
        half_height: 0.0,
        reflect: false,
    };
    pub const SQUARE: Waveform = Waveform {
        zero_wait: 0.0,
        peak_time: 0.0,
        half_height: 1.0,
        reflect: false,
    };
    pub const SAW: Waveform = Waveform {
        zero_wait: 0.0,
        peak_time: 0.0,
        half_height: 0.0,
        reflect: true,
    };
    /// 180°-phase-shifted saw; morph against [`Waveform::SAW`] for slow
    /// timbre sweeps. The half-height is a free parameter of the family.
    pub const SAW_PHASED: Waveform = Waveform {
        zero_wait: 0.0,
        peak_time: 1.0,
        half_height: 0.5,
        reflect: true,
    };

    /// Pulse-width square; `width` 0 is full width, toward 1 is narrow.
    pub fn pwm_square(width: f32) -> Waveform {
        Waveform {
            zero_wait: width,
            ..Waveform::SQUARE
        }
    }

    /// Pulse-width saw.
    pub fn pwm_saw(width: f32) -> Waveform {
        Waveform {
            zero_wait: width,
            ..Waveform::SAW
        }
    }

    /// Pulse-width triangle.
    pub fn pwm_triangle(width: f32) -> Waveform {
        Waveform {
            zero_wait: width,
            ..Waveform::TRIANGLE
        }
    }
}

/// Classic attack–decay–sustain–release volume envelope, times in seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    /// Linear rise time to full volume.
    pub attack_time: f32,
    /// Linear fall time to the sustain level.
    pub decay_time: f32,
    /// Sustained level, 0..1.
    pub sustain_level: f32,
    /// Faux-exponential decay time after the note ends.
    pub release_time: f32,
}

impl Default for Adsr {
    /// Near-instant attack and release; effectively an un-enveloped note
    /// with just enough ramp to avoid clicks.
    fn default() -> Self {
        Adsr {
            attack_time: 0.001,
            decay_time: 0.0,
            sustain_level: 1.0,
            release_time: 0.002,
        }
    }
}

/// MIDI pitch (69 = A4 = 440 Hz, microtonal values allowed) to frequency.
pub fn pitch_to_freq(pitch: f32) -> f32 {
    440.0 * 2f32.powf((pitch - 69.0) / 12.0)
}

#[inline]
fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + (b - a) * t
}

/// Precomputed reciprocal so per-sample remaps avoid a divide.
#[inline]
fn reciprocal(a: f32, b: f32) -> f32 {
    if b != a {
        1.0 / (b - a)
    } else {
        1.0
    }
}

#[inline]
fn remap_r(t: f32, a: f32, r: f32, c: f32, d: f32) -> f32 {
    c + (d - c) * (t - a) * r
}

/// Left half of the cycle: 0 until `zero_wait`, rise to 1 at `peak_time`,
/// fall to `half_height` at 1.
#[derive(Clone, Copy)]
struct LeftHalf {
    zero_wait: f32,
    peak_time: f32,
    half_height: f32,
}

/// Right half over phase [1, 2): 0 outside [start_zero, end_zero], falling
/// from `start_height` to -1 at `peak_time`, rising back to `end_height`.
#[derive(Clone, Copy)]
struct RightHalf {
    start_height: f32,
    start_zero: f32,
    peak_time: f32,
    end_height: f32,
    end_zero: f32,
}

fn make_right(src: &Waveform) -> RightHalf {
    let p = lerp(src.peak_time, src.zero_wait, 1.0);
    let mut right = if src.reflect {
        RightHalf {
            start_height: -src.half_height,
            start_zero: 0.0,
            peak_time: 1.0 - p,
            end_height: 0.0,
            end_zero: 1.0 - src.zero_wait,
        }
    } else {
        RightHalf {
            start_height: 0.0,
            start_zero: src.zero_wait,
            peak_time: p,
            end_height: -src.half_height,
            end_zero: 1.0,
        }
    };
    right.start_zero += 1.0;
    right.peak_time += 1.0;
    right.end_zero += 1.0;
    right
}

const SYNTH_BLOCK: usize = 256;

/// Synthesize one note into `out`, overwriting it. See [`synth_render`]
/// for the parameters; returns the number of samples written.
pub fn synth(
    out: &mut [f32],
    rate: u32,
    duration_until_release: f32,
    pitch: f32,
    volume: f32,
    adsr: Option<&Adsr>,
    wave1: &Waveform,
    wave2: Option<&Waveform>,
) -> usize {
    synth_render(
        out,
        false,
        rate,
        duration_until_release,
        pitch,
        volume,
        adsr,
        wave1,
        wave2,
    )
}

/// Like [`synth`], but accumulates into `out` instead of overwriting, so
/// several notes can be layered into one buffer.
pub fn synth_add(
    out: &mut [f32],
    rate: u32,
    duration_until_release: f32,
    pitch: f32,
    volume: f32,
    adsr: Option<&Adsr>,
    wave1: &Waveform,
    wave2: Option<&Waveform>,
) -> usize {
    synth_render(
        out,
        true,
        rate,
        duration_until_release,
        pitch,
        volume,
        adsr,
        wave1,
        wave2,
    )
}

/// Core render loop shared by [`synth`] and [`synth_add`].
///
/// The note lasts `duration_until_release + release_time` seconds, clamped
/// to `out.len()` samples. The wave shape morphs linearly from `wave1` to
/// `wave2` (if given) over the note, advancing once per completed cycle;
/// the envelope is the classic ADSR with a cubic pseudo-exponential
/// release from whatever level the note had when released.
#[allow(clippy::too_many_arguments)]
fn synth_render(
    out: &mut [f32],
    accumulate: bool,
    rate: u32,
    duration_until_release: f32,
    pitch: f32,
    volume: f32,
    adsr: Option<&Adsr>,
    wave1: &Waveform,
    wave2: Option<&Waveform>,
) -> usize {
    debug_assert!(!out.is_empty());
    debug_assert!(rate > 0);
    if out.is_empty() || rate == 0 {
        return 0;
    }
    let mut env = adsr.copied().unwrap_or_default();
    // Decay becomes an absolute boundary from note start.
    env.decay_time += env.attack_time;

    let rate_f = rate as f32;
    let len = (((duration_until_release + env.release_time) * rate_f) as usize).min(out.len());

    let freq = pitch_to_freq(pitch);
    let wavelength = rate_f / freq; // samples per cycle
    let wavesteps = 2.0 / wavelength; // phase advance per sample

    let left_a = LeftHalf {
        zero_wait: wave1.zero_wait,
        peak_time: lerp(wave1.peak_time, wave1.zero_wait, 1.0),
        half_height: wave1.half_height,
    };
    let right_a = make_right(wave1);
    let (left_b, right_b) = match wave2 {
        Some(w2) => (
            LeftHalf {
                zero_wait: w2.zero_wait,
                peak_time: w2.peak_time,
                half_height: w2.half_height,
            },
            make_right(w2),
        ),
        None => (left_a, right_a),
    };

    let mut left = left_a;
    let mut right = right_a;
    let mut r0 = reciprocal(right.start_zero, right.peak_time);
    let mut r1 = reciprocal(right.peak_time, right.end_zero);
    let mut r2 = reciprocal(left.zero_wait, left.peak_time);
    let mut r3 = reciprocal(left.peak_time, 1.0);
    let r4 = reciprocal(0.0, env.attack_time);
    let r5 = reciprocal(env.attack_time, env.decay_time);
    let r6 = reciprocal(0.0, env.release_time);

    let mut p = 0.0f32;
    // Morph position and its per-cycle advance.
    let mut t = 0.0f32;
    let dt = wavelength / ((duration_until_release + env.release_time / 4.0) * rate_f);

    let mut sec = 0.0f32;
    let dsec = 1.0 / rate_f;
    let mut scale = 0.0f32;
    let mut release_level: Option<f32> = None;

    let mut data = [0.0f32; SYNTH_BLOCK];
    let mut j = 0;
    while j < len {
        let end = (j + SYNTH_BLOCK).min(len);
        let n = end - j;

        for sample in data.iter_mut().take(n) {
            let pcm = if p >= 1.0 {
                if p < right.start_zero || p > right.end_zero {
                    0.0
                } else if p < right.peak_time {
                    remap_r(p, right.start_zero, r0, right.start_height, -1.0)
                } else {
                    remap_r(p, right.peak_time, r1, -1.0, right.end_height)
                }
            } else if p < left.zero_wait {
                0.0
            } else if p < left.peak_time {
                remap_r(p, left.zero_wait, r2, 0.0, 1.0)
            } else {
                remap_r(p, left.peak_time, r3, 1.0, left.half_height)
            };
            *sample = pcm;

            p += wavesteps;
            if p >= 2.0 {
                p -= 2.0;
                t = (t + dt).min(1.0);
                left.zero_wait = lerp(t, left_a.zero_wait, left_b.zero_wait);
                left.peak_time = lerp(t, left_a.peak_time, left_b.peak_time);
                left.half_height = lerp(t, left_a.half_height, left_b.half_height);
                right.start_height = lerp(t, right_a.start_height, right_b.start_height);
                right.start_zero = lerp(t, right_a.start_zero, right_b.start_zero);
                right.peak_time = lerp(t, right_a.peak_time, right_b.peak_time);
                right.end_height = lerp(t, right_a.end_height, right_b.end_height);
                right.end_zero = lerp(t, right_a.end_zero, right_b.end_zero);
                r0 = reciprocal(right.start_zero, right.peak_time);
                r1 = reciprocal(right.peak_time, right.end_zero);
                r2 = reciprocal(left.zero_wait, left.peak_time);
                r3 = reciprocal(left.peak_time, 1.0);
            }
        }

        for sample in data.iter_mut().take(n) {
            if sec < env.attack_time {
                scale = remap_r(sec, 0.0, r4, 0.0, 1.0);
            } else if sec < env.decay_time {
                scale = remap_r(sec, env.attack_time, r5, 1.0, env.sustain_level);
            } else if sec > duration_until_release {
                let level = *release_level.get_or_insert(scale);
                let x = 1.0 - (sec - duration_until_release) * r6;
                scale = x * x * x * level;
            } else {
                scale = env.sustain_level;
            }
            *sample *= scale;
            sec += dsec;
        }

        if accumulate {
            for (o, &d) in out[j..end].iter_mut().zip(&data) {
                *o += d * volume;
            }
        } else {
            for (o, &d) in out[j..end].iter_mut().zip(&data) {
                *o = d * volume;
            }
        }
        j = end;
    }
    len
}
