//! Per-block accumulation into the float scratch ring.
//!
//! The envelope is evaluated at a fixed ~100 Hz rate (441-sample
//! sub-segments at 44.1 kHz) and linearly interpolated across each
//! sub-segment by the inner kernel, so fades cost two curve evaluations per
//! segment instead of one per sample.

use crate::mix::block::{Block, Channels};
use crate::mix::Source;
use crate::Tick;

/// Envelope sampling interval in output ticks.
const ENVELOPE_SAMPLE_TIME: usize = 441;

/// Accumulate `block` into `out`, a stereo interleaved span covering global
/// ticks `[start_time, start_time + out.len()/2)`.
///
/// Callers guarantee the block overlaps the span: `block.start_time` is
/// before the span's end and the block's end is not before the span's start.
pub(crate) fn mix_block(out: &mut [f32], start_time: Tick, block: &Block, master_volume: f32) {
    let total = out.len() / 2;
    debug_assert!(block.start_time < start_time + total as u64);
    debug_assert!(block.start_time + block.duration >= start_time);

    // Trim to the block's live window.
    let skip = block.start_time.saturating_sub(start_time) as usize;
    let out = &mut out[skip * 2..];
    let start = start_time.max(block.start_time);
    let mut len = total - skip;
    if block.start_time + block.duration < start + len as u64 {
        len = (block.start_time + block.duration - start) as usize;
    }
    let mut first = block.first + (start - block.start_time) as f32 * block.step;

    let att = block.vol * master_volume;
    let end = start + len as u64;

    let mut tstart = start;
    let mut vstart = block.fade_at(tstart) * att;
    let mut tend = tstart + ENVELOPE_SAMPLE_TIME as u64;
    let mut written = 0usize;
    while tend <= end {
        let vend = block.fade_at(tend) * att;
        mix_span(
            &mut out[written * 2..(written + ENVELOPE_SAMPLE_TIME) * 2],
            block,
            vstart,
            vend,
            first,
        );
        written += ENVELOPE_SAMPLE_TIME;
        first += ENVELOPE_SAMPLE_TIME as f32 * block.step;
        vstart = vend;
        tstart = tend;
        tend += ENVELOPE_SAMPLE_TIME as u64;
    }
    if tstart != end {
        let vend = block.fade_at(end) * att;
        mix_span(&mut out[written * 2..len * 2], block, vstart, vend, first);
    }
}

/// Accumulate one envelope sub-segment with gains ramping `vstart → vend`.
fn mix_span(out: &mut [f32], block: &Block, vstart: f32, vend: f32, first: f32) {
    match &block.source {
        Source::I16(data) => span(out, data, block, vstart, vend, first),
        // Float sources carry the 16-bit range in the gain so the
        // accumulator stays in output scale.
        Source::F32(data) => span(out, data, block, vstart * 32767.0, vend * 32767.0, first),
    }
}

trait ToMix: Copy {
    fn to_mix(self) -> f32;
}

impl ToMix for i16 {
    #[inline]
    fn to_mix(self) -> f32 {
        self as f32
    }
}

impl ToMix for f32 {
    #[inline]
    fn to_mix(self) -> f32 {
        self
    }
}

fn span<T: ToMix>(out: &mut [f32], data: &[T], block: &Block, vstart: f32, vend: f32, first: f32) {
    let len = out.len() / 2;
    if len == 0 {
        return;
    }
    let (mut latt, mut ratt, lstep, rstep);
    if vstart == vend {
        if vstart == 0.0 {
            return;
        }
        latt = block.lpan * vstart;
        ratt = block.rpan * vstart;
        lstep = 0.0;
        rstep = 0.0;
    } else {
        let vstep = (vend - vstart) / len as f32;
        latt = block.lpan * vstart;
        ratt = block.rpan * vstart;
        lstep = block.lpan * vstep;
        rstep = block.rpan * vstep;
    }
    let frames = data.len() / block.channels.count();

    if block.step == 1.0 {
        // Direct tap: the fractional part of the position is ignored.
        let base = first as usize;
        let n = len.min(frames.saturating_sub(base));
        match block.channels {
            Channels::Stereo => {
                for i in 0..n {
                    out[i * 2] += data[(base + i) * 2].to_mix() * latt;
                    out[i * 2 + 1] += data[(base + i) * 2 + 1].to_mix() * ratt;
                    latt += lstep;
                    ratt += rstep;
                }
            }
            Channels::Mono => {
                for i in 0..n {
                    let s = data[base + i].to_mix();
                    out[i * 2] += s * latt;
                    out[i * 2 + 1] += s * ratt;
                    latt += lstep;
                    ratt += rstep;
                }
            }
        }
    } else {
        // Linear interpolation between consecutive source frames, with the
        // position split into an integer index and a running fraction.
        let ff = first.floor();
        let mut pos = ff as usize;
        let mut frac = first - ff;
        let istep = block.step.floor();
        let fstep = block.step - istep;
        let istep = istep as usize;
        match block.channels {
            Channels::Stereo => {
                for i in 0..len {
                    if pos + 1 >= frames {
                        break;
                    }
                    let l0 = data[pos * 2].to_mix();
                    let l1 = data[pos * 2 + 2].to_mix();
                    let r0 = data[pos * 2 + 1].to_mix();
                    let r1 = data[pos * 2 + 3].to_mix();
                    out[i * 2] += (l0 + frac * (l1 - l0)) * latt;
                    out[i * 2 + 1] += (r0 + frac * (r1 - r0)) * ratt;
                    latt += lstep;
                    ratt += rstep;
                    frac += fstep;
                    if frac >= 1.0 {
                        frac -= 1.0;
                        pos += 1 + istep;
                    } else {
                        pos += istep;
                    }
                }
            }
            Channels::Mono => {
                for i in 0..len {
                    if pos + 1 >= frames {
                        break;
                    }
                    let s0 = data[pos].to_mix();
                    let s1 = data[pos + 1].to_mix();
                    let z = s0 + (s1 - s0) * frac;
                    out[i * 2] += z * latt;
                    out[i * 2 + 1] += z * ratt;
                    latt += lstep;
                    ratt += rstep;
                    frac += fstep;
                    if frac >= 1.0 {
                        frac -= 1.0;
                        pos += 1 + istep;
                    } else {
                        pos += istep;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::{Fade, Playback};

    fn block_of(pb: Playback<'_>) -> Block<'_> {
        Block::from_playback(pb)
    }

    #[test]
    fn direct_tap_copies_source_through_gain() {
        let data: Vec<i16> = vec![100; 8];
        let block = block_of(Playback::new(&data[..], Channels::Mono, 0, 8).volume(0.5));
        let mut out = vec![0.0f32; 16];
        mix_block(&mut out, 0, &block, 1.0);
        for frame in out.chunks(2) {
            assert_eq!(frame, &[50.0, 50.0]);
        }
    }

    #[test]
    fn block_start_inside_span_is_offset() {
        let data: Vec<i16> = vec![1000; 4];
        let block = block_of(Playback::new(&data[..], Channels::Mono, 2, 4));
        let mut out = vec![0.0f32; 16];
        mix_block(&mut out, 0, &block, 1.0);
        assert_eq!(&out[..4], &[0.0; 4]);
        assert_eq!(&out[4..6], &[1000.0, 1000.0]);
    }

    #[test]
    fn half_step_interpolates_ramp() {
        let data: Vec<i16> = (0..100).collect();
        let block = block_of(Playback::new(&data[..], Channels::Mono, 0, 100).step(0.5));
        let mut out = vec![0.0f32; 200];
        mix_block(&mut out, 0, &block, 1.0);
        for k in 0..100 {
            assert!(
                (out[k * 2] - 0.5 * k as f32).abs() < 1e-3,
                "frame {k}: {} != {}",
                out[k * 2],
                0.5 * k as f32
            );
        }
    }

    #[test]
    fn stereo_source_keeps_channels_apart() {
        // L ramps, R is constant
        let mut data = Vec::new();
        for i in 0..16i16 {
            data.push(i);
            data.push(-7);
        }
        let block = block_of(Playback::new(&data[..], Channels::Stereo, 0, 16));
        let mut out = vec![0.0f32; 32];
        mix_block(&mut out, 0, &block, 1.0);
        for k in 0..16 {
            assert_eq!(out[k * 2], k as f32);
            assert_eq!(out[k * 2 + 1], -7.0);
        }
    }

    #[test]
    fn linear_fade_in_ramps_gain() {
        let data: Vec<f32> = vec![1.0; 441];
        let block = block_of(
            Playback::new(&data[..], Channels::Mono, 0, 441).fade_in(Fade::Linear, 0, 441),
        );
        let mut out = vec![0.0f32; 882];
        mix_block(&mut out, 0, &block, 1.0);
        assert_eq!(out[0], 0.0);
        // Midpoint of a linear ramp from 0 to the full 16-bit scale
        assert!((out[440] - 0.5 * 32767.0).abs() < 32767.0 * 0.01);
    }

    #[test]
    fn reads_clamp_at_source_end() {
        // duration longer than the source; must not panic, excess is silence
        let data: Vec<i16> = vec![10; 4];
        let block = block_of(Playback::new(&data[..], Channels::Mono, 0, 16));
        let mut out = vec![0.0f32; 32];
        mix_block(&mut out, 0, &block, 1.0);
        assert_eq!(&out[..8], &[10.0; 8]);
        assert_eq!(&out[8..], &[0.0; 24]);
    }
}
