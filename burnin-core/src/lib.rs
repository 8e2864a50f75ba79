#![cfg_attr(not(feature = "std"), no_std)]
//! Burnin Core — no_std-ready DSP primitives for headphone conditioning signals.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` as the math backend
//! - `fast-math`: enable approximations (polys) for trig in buffer fills
//!
//! Modules
//! - [`dsp`]  : math backend, utils (clamp/headroom, sweep math, cue envelope)
//! - [`tone`] : buffer fills (tone sums, absolute-time sines, pink shaping)
//!
//! Design
//! - No heap allocations; callers own the buffers being filled
//! - Absolute-time phase evaluation so multi-hour runs keep phase accuracy
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod tone;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp, clamp_headroom, cue_envelope, lerp, sin_turns, sweep_frequency, HEADROOM, TAU,
    };
    pub use crate::tone::{
        accumulate_pink, duplicate_stereo, fill_cue_tone, fill_sine_abs, fill_tone_set,
    };
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = clamp_headroom(1.2);
        let _ = sweep_frequency(20.0, 18_000.0, 2.5, 5.0);
        let mut buf = [0.0f32; 64];
        fill_sine_abs(&mut buf, 440.0, 0.0, 48_000.0, 0.3);
    }
}
