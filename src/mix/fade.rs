//! Fade curves applied over a playback's fade-in and fade-out regions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The shape of a fade, evaluated over normalized time `t ∈ [0, 1]`.
///
/// `t = 0` is silence and `t = 1` is full level for every curve; fade-outs
/// run the curve backwards.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fade {
    /// No fade. Only valid as the inert fade-out of a playback that has not
    /// been released; evaluating it is a programming error.
    #[default]
    None,
    /// Straight line.
    Linear,
    /// Cubic with the same endpoints and first derivatives as sin(t·π/2).
    EqualPower,
    /// Pseudo-logarithmic decay.
    Release,
    /// [`Fade::Release`] with a small volume bump at the start, good for
    /// bowed sounds.
    PulseRelease,
}

impl Fade {
    /// Evaluate the curve at `t ∈ [0, 1]`.
    pub fn apply(self, t: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&t));
        match self {
            Fade::Linear => t,
            Fade::EqualPower => 1.57 * t + t * t * (-0.43 * t - 0.14),
            Fade::PulseRelease => {
                let d = ((1.0 - t) * 20.0 - 1.0).abs();
                let p = if d < 1.0 {
                    1.0 + (1.0 - (3.0 * d * d - 2.0 * d * d * d)) * 0.2
                } else {
                    1.0
                };
                let r = t * t * t;
                let r = r * r * 0.5;
                let d = if t < 0.95 { 1.0 - (0.95 - t) * 16.0 } else { 1.0 };
                p * r.max(d)
            }
            Fade::Release => {
                let r = t * t * t;
                let r = r * r * 0.5;
                let d = 1.0 - (1.0 - t) * 15.0;
                r.max(d)
            }
            Fade::None => {
                debug_assert!(false, "Fade::None evaluated");
                1.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        for mode in [Fade::Linear, Fade::EqualPower, Fade::Release, Fade::PulseRelease] {
            assert!(mode.apply(0.0).abs() < 1e-3, "{mode:?} should start silent");
            assert!((mode.apply(1.0) - 1.0).abs() < 1e-3, "{mode:?} should end at full level");
        }
    }

    #[test]
    fn equal_power_tracks_sine() {
        // The cubic approximates sin(t·π/2); loose bound away from endpoints.
        for i in 1..10 {
            let t = i as f32 / 10.0;
            let reference = (t * std::f32::consts::FRAC_PI_2).sin();
            assert!((Fade::EqualPower.apply(t) - reference).abs() < 0.03);
        }
    }

    #[test]
    fn curves_stay_in_range() {
        for mode in [Fade::Linear, Fade::EqualPower, Fade::Release] {
            for i in 0..=100 {
                let v = mode.apply(i as f32 / 100.0);
                assert!((-0.001..=1.001).contains(&v), "{mode:?}({i}) = {v}");
            }
        }
    }
}
