//! Buffer fills for conditioning signals.
//!
//! These are allocation-free helpers working on caller-owned mono buffers.
//! Absolute time offsets are `f64`; the per-sample phase is reduced to a turn
//! fraction before dropping to `f32`, so a 12-hour phase stays in tune.
//!
//! Contents:
//! - [`fill_sine_abs`]  : single sine evaluated at an absolute time window
//! - [`fill_tone_set`]  : equal-weight sum of sines (volume split across tones)
//! - [`accumulate_pink`]: running sum over white samples (pink-noise proxy)
//! - [`fill_cue_tone`]  : short notification tone with a triangular envelope
//! - [`duplicate_stereo`]: mono → interleaved stereo copy

use crate::dsp::{cue_envelope, sin_turns};

/// Fill `out` with `gain * sin(2π f t)` for `t = t0 + i/sr`.
#[inline]
pub fn fill_sine_abs(out: &mut [f32], freq_hz: f32, t0: f64, sr: f32, gain: f32) {
    let dt = 1.0 / f64::from(sr);
    let f = f64::from(freq_hz);
    for (i, y) in out.iter_mut().enumerate() {
        let t = t0 + i as f64 * dt;
        let ph01 = (f * t).fract() as f32;
        *y = gain * sin_turns(ph01);
    }
}

/// Fill `out` with the sum of unit sines at each frequency in `freqs`, each
/// scaled by `volume / freqs.len()`, over the window starting at `t0`.
///
/// Empty `freqs` produces silence.
pub fn fill_tone_set(out: &mut [f32], freqs: &[f32], t0: f64, sr: f32, volume: f32) {
    for y in out.iter_mut() {
        *y = 0.0;
    }
    if freqs.is_empty() {
        return;
    }
    let gain = volume / freqs.len() as f32;
    let dt = 1.0 / f64::from(sr);
    for &freq in freqs {
        let f = f64::from(freq);
        for (i, y) in out.iter_mut().enumerate() {
            let t = t0 + i as f64 * dt;
            let ph01 = (f * t).fract() as f32;
            *y += gain * sin_turns(ph01);
        }
    }
}

/// Overwrite `out` with the running sum of `white`, scaled by `gain`.
///
/// The accumulator starts at zero for every call; callers decide whether to
/// chain buffers. `out` and `white` must have equal length.
#[inline]
pub fn accumulate_pink(out: &mut [f32], white: &[f32], gain: f32) {
    debug_assert_eq!(out.len(), white.len());
    let mut acc = 0.0f32;
    for (y, &w) in out.iter_mut().zip(white.iter()) {
        acc += w;
        *y = acc * gain;
    }
}

/// Fill `out` with a notification tone: `amp * sin(2π f t)` shaped by the
/// triangular [`cue_envelope`] spanning the whole buffer.
pub fn fill_cue_tone(out: &mut [f32], freq_hz: f32, sr: f32, amp: f32) {
    if out.is_empty() {
        return;
    }
    let dur = out.len() as f32 / sr;
    let dt = 1.0 / f64::from(sr);
    let f = f64::from(freq_hz);
    for (i, y) in out.iter_mut().enumerate() {
        let t = i as f64 * dt;
        let ph01 = (f * t).fract() as f32;
        *y = amp * sin_turns(ph01) * cue_envelope(t as f32, dur);
    }
}

/// Copy a mono buffer into an interleaved stereo buffer, both channels
/// identical. `out.len()` must be `2 * mono.len()`.
#[inline]
pub fn duplicate_stereo(mono: &[f32], out: &mut [f32]) {
    debug_assert_eq!(out.len(), mono.len() * 2);
    for (frame, &s) in out.chunks_exact_mut(2).zip(mono.iter()) {
        frame[0] = s;
        frame[1] = s;
    }
}

// --------------------------------- Tests (std only) ------------------------------
