//! Live arpeggio: a control thread synthesizes notes and streams them over
//! an rtrb ring to the audio thread, which owns the engine and schedules
//! each note as it arrives.
//!
//! Run with: cargo run --example arpeggio

use premix::{Adsr, Channels, CpalSink, Engine, Playback, Waveform, OUTPUT_RATE};
use rtrb::RingBuffer;
use std::thread;
use std::time::Duration;

const BUFFER_BYTES: usize = 44_100 * 4; // 1 second of stereo 16-bit

/// A synthesized note handed to the audio thread. Samples are owned, so the
/// mixer takes them without borrowing anything from this thread.
struct NoteMsg {
    samples: Vec<f32>,
    pan: f32,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_target(false).init();

    let (mut tx, mut rx) = RingBuffer::<NoteMsg>::new(64);

    // Control thread: C-major arpeggio at ~120 BPM, forever.
    let producer = thread::spawn(move || {
        let adsr = Adsr {
            attack_time: 0.01,
            decay_time: 0.1,
            sustain_level: 0.6,
            release_time: 0.2,
        };
        let notes = [60.0f32, 64.0, 67.0, 72.0];
        for _ in 0..8 {
            for (i, &pitch) in notes.iter().enumerate() {
                let mut samples = vec![0.0f32; 44_100];
                let len = premix::synth(
                    &mut samples,
                    OUTPUT_RATE,
                    0.35,
                    pitch,
                    0.8,
                    Some(&adsr),
                    &Waveform::pwm_square(0.3),
                    Some(&Waveform::TRIANGLE),
                );
                samples.truncate(len);
                let pan = (i as f32 / 3.0) * 1.2 - 0.6;
                if tx.push(NoteMsg { samples, pan }).is_err() {
                    return;
                }
                thread::sleep(Duration::from_millis(450));
            }
        }
    });

    // Audio thread work happens right here: the engine must stay on the
    // thread that created the stream.
    let mut engine = Engine::new(20_000, 0.005, BUFFER_BYTES, CpalSink::new())?;
    engine.mixer_mut().set_master_volume(0.7);

    let deadline = std::time::Instant::now() + Duration::from_secs(16);
    while std::time::Instant::now() < deadline {
        while let Ok(note) = rx.pop() {
            // A 20ms lead keeps the note ahead of the write cursor.
            let when = engine.time() + OUTPUT_RATE as u64 / 50;
            let len = note.samples.len() as u64;
            engine.mixer_mut().add(
                Playback::new(note.samples, Channels::Mono, when, len).pan(note.pan),
            );
        }
        engine.step(2000)?;
        thread::sleep(Duration::from_millis(5));
    }

    drop(engine);
    let _ = producer.join();
    Ok(())
}
