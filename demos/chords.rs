//! Synthesize a handful of layered note patterns and play them live.
//!
//! Run with: cargo run --example chords

use premix::{Adsr, Channels, CpalSink, Engine, Playback, Waveform, OUTPUT_RATE};
use std::thread;
use std::time::Duration;

const BUFFER_BYTES: usize = 88_200 * 4; // 2 seconds of stereo 16-bit
const TONE_BUFFER: usize = 88_200;

/// Major-scale degrees, in semitones from the root.
const SCALE: [u64; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

struct Pattern {
    notes: usize,
    repeats: usize,
    octave: f32,
    duration: f32,
    pan: f32,
    vol: f32,
    env: Adsr,
    wave1: Waveform,
    wave2: Option<Waveform>,
}

/// One synthesized note: samples, scheduling offset from the session start,
/// volume and pan.
struct Note {
    tone: Vec<f32>,
    len: usize,
    offset: u64,
    vol: f32,
    pan: f32,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_target(false).init();

    let bell = Adsr {
        attack_time: 0.001,
        decay_time: 0.2,
        sustain_level: 0.0,
        release_time: 0.0,
    };
    let attack = Adsr {
        attack_time: 0.05,
        decay_time: 0.0,
        sustain_level: 1.0,
        release_time: 0.25,
    };
    let pluck = Adsr {
        attack_time: 0.005,
        decay_time: 0.05,
        sustain_level: 0.6,
        release_time: 0.25,
    };
    let sq_tri = Waveform {
        zero_wait: 0.0,
        peak_time: 0.25,
        half_height: 0.5,
        reflect: false,
    };

    let patterns = [
        Pattern {
            notes: 8,
            repeats: 4,
            octave: 84.0,
            duration: 0.4,
            pan: 0.9,
            vol: 0.25,
            env: bell,
            wave1: sq_tri,
            wave2: Some(Waveform::TRIANGLE),
        },
        Pattern {
            notes: 8,
            repeats: 2,
            octave: 60.0,
            duration: 0.2,
            pan: -0.4,
            vol: 0.95,
            env: attack,
            wave1: Waveform::SAW,
            wave2: Some(Waveform::SAW_PHASED),
        },
        Pattern {
            notes: 4,
            repeats: 2,
            octave: 36.0,
            duration: 0.5,
            pan: 0.1,
            vol: 0.25,
            env: pluck,
            wave1: Waveform::SQUARE,
            wave2: None,
        },
        Pattern {
            notes: 8,
            repeats: 4,
            octave: 91.0,
            duration: 0.4,
            pan: -0.9,
            vol: 0.1,
            env: bell,
            wave1: sq_tri,
            wave2: None,
        },
    ];

    // Synthesize everything up front. The arena outlives the engine below,
    // so the mixer borrows the tones without snapshotting them.
    let mut notes: Vec<Note> = Vec::new();
    let mut seed = 0x2545_f491_4f6c_dd1du64;
    for p in &patterns {
        let beat = (OUTPUT_RATE as f32 / 3.5) as u64;
        let spacing = beat * 16 / (p.repeats * p.notes) as u64;
        for i in 0..p.notes {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let pitch = p.octave + SCALE[(seed >> 3) as usize & 7] as f32;

            let mut tone = vec![0.0f32; TONE_BUFFER];
            let len = premix::synth(
                &mut tone,
                OUTPUT_RATE,
                p.duration,
                pitch,
                1.0,
                Some(&p.env),
                &p.wave1,
                p.wave2.as_ref(),
            );
            for r in 0..p.repeats {
                notes.push(Note {
                    tone: tone.clone(),
                    len,
                    offset: (i + r * p.notes) as u64 * spacing,
                    vol: p.vol,
                    pan: p.pan,
                });
            }
        }
    }

    let mut engine = Engine::new(20_000, 0.005, BUFFER_BYTES, CpalSink::new())?;
    engine.mixer_mut().set_master_volume(0.5);

    // Schedule an eighth of a second into the future so playback does not
    // catch up with the scheduling loop.
    let start_time = engine.time() + OUTPUT_RATE as u64 / 8;
    for note in &notes {
        engine.mixer_mut().add(
            Playback::new(
                &note.tone[..note.len],
                Channels::Mono,
                start_time + note.offset,
                note.len as u64,
            )
            .volume(note.vol)
            .pan(note.pan)
            .stable(),
        );
    }

    println!("playing {} scheduled notes...", notes.len());
    while engine.mixer().active_count() > 0 {
        engine.step(5000)?;
        thread::sleep(Duration::from_millis(1));
    }

    // Let the last release ring out of the sink buffer.
    thread::sleep(Duration::from_millis(300));
    Ok(())
}
