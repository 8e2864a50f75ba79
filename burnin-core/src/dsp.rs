//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for hot paths
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Time offsets are `f64` seconds; multi-hour runs exceed `f32` phase
//!   resolution long before a conditioning phase completes.

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// Headroom margin applied to every generated buffer before it reaches the
/// sink's sample format.
pub const HEADROOM: f32 = 0.8;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

/// Clamp a sample into the ±[`HEADROOM`] window.
#[inline]
pub fn clamp_headroom(x: f32) -> f32 {
    clamp(x, -HEADROOM, HEADROOM)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// --------------------------------- Sine by turns ----------------------------------

/// Sine of `ph01` **turns** (one turn = 2π radians), `ph01` in [0, 1).
///
/// Callers reduce absolute phase to a turn fraction in `f64` first; this keeps
/// the argument small so the `f32` evaluation stays accurate at any offset.
#[inline]
pub fn sin_turns(ph01: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // Range reduce to [-π, π].
            let mut xr = TAU * ph01;
            let k = (xr / TAU).round();
            xr -= k * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(TAU * ph01)
        }
    }
}

// --------------------------------- Sweep math ------------------------------------

/// Instantaneous sweep frequency at time offset `t` (seconds).
///
/// The ramp runs linearly from `start_hz` to `end_hz` over `period_s` and
/// repeats; position within the ramp is `t mod period_s`.
#[inline]
pub fn sweep_frequency(start_hz: f32, end_hz: f32, t: f64, period_s: f64) -> f32 {
    let pos = (t.rem_euclid(period_s) / period_s) as f32;
    lerp(start_hz, end_hz, pos)
}

// --------------------------------- Cue envelope ----------------------------------

/// Triangular envelope for notification cues: 0 at both ends, 0.5 at the
/// midpoint of `dur_s`. Matches `min(t/d, (d-t)/d)`, floored at zero.
#[inline]
pub fn cue_envelope(t: f32, dur_s: f32) -> f32 {
    if dur_s <= 0.0 {
        return 0.0;
    }
    let up = t / dur_s;
    let down = (dur_s - t) / dur_s;
    let e = if up < down { up } else { down };
    if e < 0.0 { 0.0 } else { e }
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_orders_bounds() {
        assert_eq!(clamp(2.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-2.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25, -1.0, 1.0), 0.25);
    }

    #[test]
    fn headroom_window() {
        assert_eq!(clamp_headroom(5.0), HEADROOM);
        assert_eq!(clamp_headroom(-5.0), -HEADROOM);
        assert_eq!(clamp_headroom(0.1), 0.1);
    }

    #[test]
    fn sweep_endpoints_and_midpoint() {
        let (f0, f1) = (20.0, 18_000.0);
        assert!((sweep_frequency(f0, f1, 0.0, 5.0) - f0).abs() < 1e-3);
        let mid = sweep_frequency(f0, f1, 2.5, 5.0);
        assert!((mid - 0.5 * (f0 + f1)).abs() < 1.0, "mid={mid}");
        // Ramp repeats after one period.
        assert!((sweep_frequency(f0, f1, 5.0, 5.0) - f0).abs() < 1e-2);
    }

    #[test]
    fn cue_envelope_shape() {
        assert_eq!(cue_envelope(0.0, 0.5), 0.0);
        assert!((cue_envelope(0.25, 0.5) - 0.5).abs() < 1e-6);
        assert!(cue_envelope(0.5, 0.5).abs() < 1e-6);
        // Out-of-window times never go negative.
        assert_eq!(cue_envelope(0.6, 0.5), 0.0);
    }

    #[test]
    fn sin_turns_quarter_points() {
        assert!(sin_turns(0.0).abs() < 1e-6);
        assert!((sin_turns(0.25) - 1.0).abs() < 1e-3);
        assert!((sin_turns(0.5)).abs() < 1e-3);
    }
}
