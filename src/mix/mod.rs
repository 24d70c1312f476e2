//! The incremental pre-mix engine.
//!
//! [`Mixer`] keeps a window of already-rendered stereo audio ahead of the
//! current time, indexed by global sample tick over a circular buffer. The
//! caller can extract any slice of that window repeatedly; newly added
//! playbacks that land inside the window are accumulated into it in place,
//! so only *ending* a playback early forces a re-mix.

mod block;
mod fade;
mod kernel;
mod quantize;

pub use block::{Channels, GroupId, Playback, Source};
pub use fade::Fade;

use block::Block;
use tracing::warn;

use crate::Tick;

/// Hard cap on simultaneously active playbacks.
pub const MAX_BLOCKS: usize = 1000;

/// The mixing core: active-playback table plus pre-mix rings.
///
/// All operations are synchronous and assume a single logical caller; a
/// process normally runs exactly one `Mixer` (usually inside an
/// [`Engine`](crate::engine::Engine)), though nothing enforces that.
///
/// The lifetime `'a` bounds every borrowed playback source scheduled into
/// this mixer; owned sources (`Vec`-backed) are unconstrained.
pub struct Mixer<'a> {
    blocks: Vec<Block<'a>>,
    /// Stereo interleaved scratch; accumulation happens here in float.
    premix_float: Vec<f32>,
    /// Stereo interleaved output ring; authoritative, extracted by `mix`.
    premix_int: Vec<i16>,
    /// Ring capacity in frames.
    capacity: usize,
    /// Ring position of the window start.
    premix_offset: usize,
    /// Global tick of the window start.
    premix_time: Tick,
    /// Frames materialized in the window.
    premix_len: usize,
    curtime: Tick,
    master_volume: f32,
    use_simd: bool,
}

impl<'a> Mixer<'a> {
    /// Create a mixer able to pre-mix up to `premix_capacity` frames ahead
    /// of the current time. Memory cost is 12 bytes per frame of capacity.
    pub fn new(premix_capacity: usize) -> Self {
        Mixer {
            blocks: Vec::with_capacity(64),
            premix_float: vec![0.0; premix_capacity * 2],
            premix_int: vec![0; premix_capacity * 2],
            capacity: premix_capacity,
            premix_offset: 0,
            premix_time: 0,
            premix_len: 0,
            curtime: 0,
            master_volume: 1.0,
            use_simd: quantize::detect_simd(),
        }
    }

    /// Destroy every playback and restart the clock at `t`.
    pub fn reset(&mut self, t: Tick) {
        self.blocks.clear();
        self.curtime = t;
        self.premix_time = t;
        self.premix_offset = 0;
        self.premix_len = 0;
    }

    /// Current global tick.
    pub fn time(&self) -> Tick {
        self.curtime
    }

    /// Number of playbacks in the active table.
    pub fn active_count(&self) -> usize {
        self.blocks.len()
    }

    /// Overall mix gain. Invalidates the pre-mix window so following
    /// extracts re-mix at the new level.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
        self.premix_len = 0;
    }

    /// Advance the clock to `t`, destroying elapsed playbacks and sliding
    /// the pre-mix window forward. Ticks never run backwards: `t ≤ now` is
    /// a no-op.
    pub fn advance_to(&mut self, t: Tick) {
        if t <= self.curtime {
            return;
        }
        self.curtime = t;
        let mut i = 0;
        while i < self.blocks.len() {
            if self.blocks[i].start_time + self.blocks[i].duration <= t {
                self.blocks.swap_remove(i);
            } else {
                i += 1;
            }
        }
        if self.premix_time < t {
            if self.premix_time + self.premix_len as u64 <= t {
                self.premix_len = 0;
                self.premix_offset = 0;
                self.premix_time = t;
            } else {
                let gone = (t - self.premix_time) as usize;
                self.premix_offset = self.wrap(self.premix_offset + gone);
                self.premix_len -= gone;
                self.premix_time = t;
            }
        }
    }

    /// Schedule a playback.
    ///
    /// Dropped without effect when the duration is zero, the source is
    /// empty, or the active table is full (the last case logs a warning).
    pub fn add(&mut self, playback: Playback<'a>) {
        if playback.duration == 0 {
            return;
        }
        if playback.source.is_empty() {
            return;
        }
        if self.blocks.len() == MAX_BLOCKS {
            warn!("active table full ({MAX_BLOCKS} playbacks), dropping schedule");
            return;
        }
        let mut block = Block::from_playback(playback);
        // Without a group there is no release point to defer to, so
        // non-stable sources are snapshotted up front.
        if block.group.is_none() {
            block.snapshot_source();
        }
        let in_window = block.start_time < self.premix_time + self.premix_len as u64;
        self.blocks.push(block);
        if in_window {
            self.add_to_premix(self.blocks.len() - 1);
        }
    }

    /// True when any active playback carries `group`.
    pub fn group_active(&self, group: GroupId) -> bool {
        self.blocks.iter().any(|b| b.group == Some(group))
    }

    /// Silence and detach every playback carrying `group`.
    ///
    /// Playbacks still sound until `end_start + end_duration`, attenuated by
    /// `mode` across `end_duration` ticks. Passing `end_start == 0` means
    /// "now". After this call the group's borrowed sources have been
    /// snapshotted, so the caller may drop or reuse the backing buffers.
    pub fn release_group(&mut self, group: GroupId, mode: Fade, end_start: Tick, end_duration: u64) {
        let end_start = if end_start == 0 { self.curtime } else { end_start };
        let end_final = end_start + end_duration;

        // Everything from the release point on has to be re-mixed.
        if end_start < self.premix_time + self.premix_len as u64 {
            if end_start < self.premix_time {
                self.premix_len = 0;
            } else {
                self.premix_len = (end_start - self.premix_time) as usize;
            }
        }

        // Members that would only have started after the cut never sound.
        let mut i = 0;
        while i < self.blocks.len() {
            if self.blocks[i].group == Some(group) && self.blocks[i].start_time >= end_final {
                self.blocks.swap_remove(i);
            } else {
                i += 1;
            }
        }

        for b in &mut self.blocks {
            if b.group == Some(group) {
                b.snapshot_source();
                b.group = None;
                b.fadeout = mode;
                b.fadeout_start = end_start;
                b.fadeout_len = end_duration;
                if end_final < b.start_time + b.duration {
                    b.duration = end_final - b.start_time;
                }
            }
        }
    }

    /// Extract `duration` stereo frames starting at global tick
    /// `start_time` into `output` (interleaved, at least `2·duration`
    /// elements). Returns the number of frames written.
    ///
    /// Returns 0 when the whole request lies in the past or before the
    /// materialized window; may write fewer frames than asked when the
    /// request reaches past the window capacity.
    pub fn mix(&mut self, output: &mut [i16], start_time: Tick, duration: usize) -> usize {
        let mut duration = duration.min(output.len() / 2);
        if start_time + duration as u64 <= self.curtime {
            return 0;
        }

        self.render_to(start_time + duration as u64);

        if start_time < self.premix_time {
            return 0;
        }
        let window_end = self.premix_time + self.premix_len as u64;
        if start_time >= window_end {
            return 0;
        }
        if start_time + duration as u64 > window_end {
            duration = (window_end - start_time) as usize;
        }

        let offset = self.wrap(self.premix_offset + (start_time - self.premix_time) as usize);
        if duration > self.capacity - offset {
            let head = self.capacity - offset;
            output[..head * 2].copy_from_slice(&self.premix_int[offset * 2..(offset + head) * 2]);
            output[head * 2..duration * 2]
                .copy_from_slice(&self.premix_int[..(duration - head) * 2]);
        } else {
            output[..duration * 2]
                .copy_from_slice(&self.premix_int[offset * 2..(offset + duration) * 2]);
        }
        duration
    }

    /// Extend the materialized window to cover up to tick `when`, clamped
    /// to the ring capacity ahead of the current time.
    fn render_to(&mut self, when: Tick) {
        if when < self.curtime {
            return;
        }
        let when = when.min(self.curtime + self.capacity as u64);

        // The window start tracks the clock on every path that moves either.
        debug_assert_eq!(self.premix_time, self.curtime, "pre-mix window out of step with clock");

        let covered = self.premix_time + self.premix_len as u64;
        if covered >= when {
            return;
        }
        let fresh = (when - covered) as usize;
        let offset = self.wrap(self.premix_offset + self.premix_len);
        if offset + fresh > self.capacity {
            let head = self.capacity - offset;
            self.render_region(covered, offset, head);
            self.render_region(covered + head as u64, 0, fresh - head);
        } else {
            self.render_region(covered, offset, fresh);
        }
        self.premix_len += fresh;
    }

    /// Mix every overlapping playback into one contiguous ring region and
    /// quantize it to the output ring.
    fn render_region(&mut self, t: Tick, offset: usize, len: usize) {
        let span = offset * 2..(offset + len) * 2;
        self.premix_float[span.clone()].fill(0.0);
        for b in &self.blocks {
            if b.start_time < t + len as u64 && b.start_time + b.duration >= t {
                kernel::mix_block(&mut self.premix_float[span.clone()], t, b, self.master_volume);
            }
        }
        quantize::quantize_span(
            &self.premix_float[span.clone()],
            &mut self.premix_int[span],
            self.use_simd,
        );
    }

    /// Accumulate a freshly added playback into the already-materialized
    /// window, re-quantizing the touched ring segment(s). This is what lets
    /// new playbacks land mid-window without invalidating it.
    fn add_to_premix(&mut self, idx: usize) {
        let (start, end, capacity) = (
            self.premix_time,
            self.premix_time + self.premix_len as u64,
            self.capacity,
        );
        if self.premix_offset + self.premix_len > capacity {
            let head = capacity - self.premix_offset;
            let split = start + head as u64;
            let b = &self.blocks[idx];
            if b.start_time < split && b.start_time + b.duration > start {
                let span = self.premix_offset * 2..(self.premix_offset + head) * 2;
                kernel::mix_block(&mut self.premix_float[span.clone()], start, b, self.master_volume);
                quantize::quantize_span(
                    &self.premix_float[span.clone()],
                    &mut self.premix_int[span],
                    self.use_simd,
                );
            }
            let b = &self.blocks[idx];
            if b.start_time < end && b.start_time + b.duration > split {
                let tail = self.premix_len - head;
                let span = 0..tail * 2;
                kernel::mix_block(&mut self.premix_float[span.clone()], split, b, self.master_volume);
                quantize::quantize_span(
                    &self.premix_float[span.clone()],
                    &mut self.premix_int[span],
                    self.use_simd,
                );
            }
        } else {
            let b = &self.blocks[idx];
            if b.start_time < end && b.start_time + b.duration > start {
                let span = self.premix_offset * 2..(self.premix_offset + self.premix_len) * 2;
                kernel::mix_block(&mut self.premix_float[span.clone()], start, b, self.master_volume);
                quantize::quantize_span(
                    &self.premix_float[span.clone()],
                    &mut self.premix_int[span],
                    self.use_simd,
                );
            }
        }
    }

    #[inline]
    fn wrap(&self, pos: usize) -> usize {
        if pos >= self.capacity {
            pos - self.capacity
        } else {
            pos
        }
    }
}
