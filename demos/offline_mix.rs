//! Drive the mixer without any audio device: schedule a few tones, extract
//! the mix in driver-sized slices, and report levels.
//!
//! Run with: cargo run --example offline_mix

use premix::{Adsr, Channels, Fade, GroupId, Mixer, Playback, Waveform, OUTPUT_RATE};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_target(false).init();

    let adsr = Adsr {
        attack_time: 0.01,
        decay_time: 0.1,
        sustain_level: 0.7,
        release_time: 0.3,
    };

    // A chord of three morphing tones.
    let mut tones = Vec::new();
    for pitch in [60.0, 64.0, 67.0] {
        let mut tone = vec![0.0f32; 2 * OUTPUT_RATE as usize];
        let len = premix::synth(
            &mut tone,
            OUTPUT_RATE,
            1.0,
            pitch,
            0.9,
            Some(&adsr),
            &Waveform::SAW,
            Some(&Waveform::TRIANGLE),
        );
        tone.truncate(len);
        tones.push(tone);
    }

    let mut mixer = Mixer::new(8192);
    mixer.set_master_volume(0.6);

    let pad = GroupId(1);
    for (i, tone) in tones.iter().enumerate() {
        mixer.add(
            Playback::new(&tone[..], Channels::Mono, i as u64 * 2000, tone.len() as u64)
                .pan(i as f32 - 1.0)
                .group(pad)
                .stable(),
        );
    }

    // Cut the chord off early with an equal-power fade.
    mixer.release_group(pad, Fade::EqualPower, 30_000, 8000);

    // Pull the mix the way a driver would: one 10ms slice at a time.
    let slice = 441;
    let mut out = vec![0i16; slice * 2];
    let mut time = 0u64;
    let mut total = 0usize;
    while time < 45_000 {
        let written = mixer.mix(&mut out, time, slice);
        if written == 0 {
            break;
        }
        let peak = out[..written * 2]
            .iter()
            .map(|&s| (s as i32).unsigned_abs())
            .max()
            .unwrap_or(0);
        if time % (slice as u64 * 20) == 0 {
            println!("t={:>6} peak={:>5}  active={}", time, peak, mixer.active_count());
        }
        total += written;
        time += written as u64;
        mixer.advance_to(time);
    }

    println!("mixed {total} frames offline");
    Ok(())
}
