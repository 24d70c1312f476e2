//! Scheduled playbacks and their backing sample data.

use std::borrow::Cow;

use crate::mix::Fade;
use crate::Tick;

/// Identifies a set of playbacks that are released together.
///
/// The id is caller-chosen and opaque to the mixer; any number of playbacks
/// may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

/// Channel layout of a playback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// Interleaved sample data backing a playback, either 16-bit integer or
/// 32-bit float, borrowed from the caller or owned by the mixer.
///
/// The borrowed→owned transition happens when a playback is snapshotted:
/// immediately at schedule time for ungrouped non-`stable` sources, or at
/// [`Mixer::release_group`](crate::mix::Mixer::release_group) for grouped
/// ones.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    I16(Cow<'a, [i16]>),
    F32(Cow<'a, [f32]>),
}

impl Source<'_> {
    /// Number of interleaved samples (not frames).
    pub fn len(&self) -> usize {
        match self {
            Source::I16(s) => s.len(),
            Source::F32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a [i16]> for Source<'a> {
    fn from(samples: &'a [i16]) -> Self {
        Source::I16(Cow::Borrowed(samples))
    }
}

impl<'a> From<&'a [f32]> for Source<'a> {
    fn from(samples: &'a [f32]) -> Self {
        Source::F32(Cow::Borrowed(samples))
    }
}

impl From<Vec<i16>> for Source<'_> {
    fn from(samples: Vec<i16>) -> Self {
        Source::I16(Cow::Owned(samples))
    }
}

impl From<Vec<f32>> for Source<'_> {
    fn from(samples: Vec<f32>) -> Self {
        Source::F32(Cow::Owned(samples))
    }
}

/// A schedule request for [`Mixer::add`](crate::mix::Mixer::add).
///
/// Built fluently from a source and timing, with everything else optional:
///
/// ```no_run
/// # use premix::{Mixer, Playback, Channels, Fade};
/// # let mut mixer = Mixer::new(4096);
/// # let tone: Vec<f32> = vec![0.0; 44_100];
/// mixer.add(
///     Playback::new(&tone[..], Channels::Mono, 22_050, 44_100)
///         .volume(0.4)
///         .pan(-0.3)
///         .fade_in(Fade::Linear, 22_050, 441),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Playback<'a> {
    pub source: Source<'a>,
    pub channels: Channels,
    /// The source buffer stays valid for the mixer's whole lifetime, so the
    /// mixer never snapshots it. Off by default.
    pub stable: bool,
    /// Fractional starting offset into the source, in frames.
    pub first: f32,
    pub start_time: Tick,
    /// Length of the playback in output ticks.
    pub duration: u64,
    /// Source-to-output rate ratio; 1.0 plays at the source rate, greater is
    /// faster, smaller is slower.
    pub step: f32,
    pub fadein: Fade,
    pub fadein_start: Tick,
    pub fadein_len: u64,
    pub volume: f32,
    /// Stereo placement in [-1, 1]; 0 is centered.
    pub pan: f32,
    pub group: Option<GroupId>,
}

impl<'a> Playback<'a> {
    pub fn new(
        source: impl Into<Source<'a>>,
        channels: Channels,
        start_time: Tick,
        duration: u64,
    ) -> Self {
        Playback {
            source: source.into(),
            channels,
            stable: false,
            first: 0.0,
            start_time,
            duration,
            step: 1.0,
            fadein: Fade::None,
            fadein_start: 0,
            fadein_len: 0,
            volume: 1.0,
            pan: 0.0,
            group: None,
        }
    }

    /// Start reading the source at a fractional frame offset.
    pub fn offset(mut self, first: f32) -> Self {
        self.first = first;
        self
    }

    pub fn step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn fade_in(mut self, mode: Fade, start: Tick, len: u64) -> Self {
        self.fadein = mode;
        self.fadein_start = start;
        self.fadein_len = len;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// Mark the source buffer as outliving the mixer; see [`Playback::stable`].
    pub fn stable(mut self) -> Self {
        self.stable = true;
        self
    }
}

/// Per-channel gains for a pan position in [-1, 1].
///
/// For mono sources this pans the single channel between ears; for stereo it
/// attenuates one side, turning the image toward the other.
pub(crate) fn pan_gains(pan: f32) -> (f32, f32) {
    if pan == 0.0 {
        (1.0, 1.0)
    } else if pan < 0.0 {
        (1.0, 1.0 + pan.max(-1.0))
    } else {
        (1.0 - pan.min(1.0), 1.0)
    }
}

/// One live playback in the mixer's active table.
pub(crate) struct Block<'a> {
    pub source: Source<'a>,
    /// Frames available in `source`.
    pub sample_len: usize,
    pub stable: bool,
    pub channels: Channels,
    pub first: f32,
    pub start_time: Tick,
    pub duration: u64,
    pub step: f32,
    pub fadein: Fade,
    pub fadein_start: Tick,
    pub fadein_len: u64,
    pub fadeout: Fade,
    pub fadeout_start: Tick,
    pub fadeout_len: u64,
    pub vol: f32,
    pub lpan: f32,
    pub rpan: f32,
    pub group: Option<GroupId>,
}

impl<'a> Block<'a> {
    pub fn from_playback(pb: Playback<'a>) -> Self {
        let sample_len = pb.source.len() / pb.channels.count();
        let (lpan, rpan) = pan_gains(pb.pan);
        Block {
            source: pb.source,
            sample_len,
            stable: pb.stable,
            channels: pb.channels,
            first: pb.first,
            start_time: pb.start_time,
            duration: pb.duration,
            step: pb.step,
            fadein: pb.fadein,
            fadein_start: pb.fadein_start,
            fadein_len: pb.fadein_len,
            fadeout: Fade::None,
            fadeout_start: Tick::MAX,
            fadeout_len: 0,
            vol: pb.volume,
            lpan,
            rpan,
            group: pb.group,
        }
    }

    /// Envelope level at tick `t`: 0 before the fade-in, the fade-in curve
    /// across it, 1 in the body, the fade-out curve run backwards across the
    /// fade-out, 0 after.
    pub fn fade_at(&self, t: Tick) -> f32 {
        if t < self.fadein_start + self.fadein_len {
            if t < self.fadein_start {
                return 0.0;
            }
            return self
                .fadein
                .apply((t - self.fadein_start) as f32 / self.fadein_len as f32);
        }
        if t > self.fadeout_start {
            if t > self.fadeout_start + self.fadeout_len {
                return 0.0;
            }
            return self
                .fadeout
                .apply(1.0 - (t - self.fadeout_start) as f32 / self.fadeout_len as f32);
        }
        1.0
    }

    /// Copy borrowed source data into owned storage, trimmed to the frames
    /// this playback can actually read. No-op for `stable` or already-owned
    /// sources.
    pub fn snapshot_source(&mut self) {
        if self.stable {
            return;
        }
        let frames = if self.step == 1.0 {
            self.first.ceil() as usize + self.duration as usize
        } else {
            (self.first + self.duration as f32 * self.step + 1.0).ceil() as usize
        };
        let frames = frames.min(self.sample_len);
        let n = frames * self.channels.count();
        let copied = match &mut self.source {
            Source::I16(data) => match data {
                Cow::Borrowed(s) => {
                    *data = Cow::Owned(s[..n].to_vec());
                    true
                }
                Cow::Owned(_) => false,
            },
            Source::F32(data) => match data {
                Cow::Borrowed(s) => {
                    *data = Cow::Owned(s[..n].to_vec());
                    true
                }
                Cow::Owned(_) => false,
            },
        };
        if copied {
            self.sample_len = frames;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_center_is_unity() {
        assert_eq!(pan_gains(0.0), (1.0, 1.0));
    }

    #[test]
    fn pan_extremes_mute_one_side() {
        assert_eq!(pan_gains(-1.0), (1.0, 0.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
        // Out-of-range input clamps
        assert_eq!(pan_gains(-3.0), (1.0, 0.0));
        assert_eq!(pan_gains(3.0), (0.0, 1.0));
    }

    #[test]
    fn snapshot_trims_to_frames_read() {
        let data: Vec<i16> = (0..1000).collect();
        let pb = Playback::new(&data[..], Channels::Mono, 0, 100).offset(0.5);
        let mut block = Block::from_playback(pb);
        block.snapshot_source();
        // step == 1: ceil(first) + duration frames
        assert_eq!(block.sample_len, 101);
        assert!(matches!(block.source, Source::I16(Cow::Owned(_))));
    }

    #[test]
    fn snapshot_skips_stable_sources() {
        let data: Vec<i16> = vec![0; 100];
        let pb = Playback::new(&data[..], Channels::Mono, 0, 50).stable();
        let mut block = Block::from_playback(pb);
        block.snapshot_source();
        assert!(matches!(block.source, Source::I16(Cow::Borrowed(_))));
    }

    #[test]
    fn snapshot_sizing_with_resampling() {
        let data: Vec<i16> = vec![0; 1000];
        let pb = Playback::new(&data[..], Channels::Mono, 0, 100).step(2.0);
        let mut block = Block::from_playback(pb);
        block.snapshot_source();
        // ceil(first + duration*step + 1)
        assert_eq!(block.sample_len, 201);
    }

    #[test]
    fn fade_at_covers_lifecycle() {
        let data: Vec<i16> = vec![0; 2000];
        let pb = Playback::new(&data[..], Channels::Mono, 0, 2000).fade_in(Fade::Linear, 100, 200);
        let mut block = Block::from_playback(pb);
        assert_eq!(block.fade_at(50), 0.0);
        assert!((block.fade_at(200) - 0.5).abs() < 1e-6);
        assert_eq!(block.fade_at(1000), 1.0);

        block.fadeout = Fade::Linear;
        block.fadeout_start = 1500;
        block.fadeout_len = 100;
        assert!((block.fade_at(1550) - 0.5).abs() < 1e-6);
        assert_eq!(block.fade_at(1601), 0.0);
    }
}
