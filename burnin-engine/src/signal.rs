//! Chunk renderer for the three waveform families.
//!
//! The generator turns a [`PhaseConfig`] plus a running time offset into one
//! interleaved stereo buffer. Tone and sweep output is a pure function of the
//! offset; the noise waveform draws fresh randomness each call.

use burnin_core::dsp::{clamp_headroom, sweep_frequency};
use burnin_core::tone::{
    accumulate_pink, duplicate_stereo, fill_cue_tone, fill_sine_abs, fill_tone_set,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{PhaseConfig, Waveform};

/// Sweep ramp period: the frequency runs start → end over this many seconds,
/// then repeats.
pub const SWEEP_PERIOD_SECS: f64 = 5.0;

/// Start-of-phase notification tone.
pub const CUE_START_HZ: f32 = 880.0;
/// End-of-phase notification tone.
pub const CUE_END_HZ: f32 = 440.0;
/// Notification tone length.
pub const CUE_SECS: f32 = 0.5;
/// Notification tone amplitude before the envelope.
pub const CUE_AMP: f32 = 0.3;

/// Uniform deviates in ±√3 have unit variance.
const UNIT_VARIANCE_SPAN: f32 = 1.732_050_8;

/// Renders conditioning chunks for one phase at a time.
pub struct SignalGenerator {
    sample_rate: u32,
    mono: Vec<f32>,
    white: Vec<f32>,
    rng: SmallRng,
}

impl SignalGenerator {
    pub fn new(sample_rate: u32, chunk_frames: usize) -> Self {
        Self {
            sample_rate,
            mono: vec![0.0; chunk_frames],
            white: vec![0.0; chunk_frames],
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render the window `[t_offset, t_offset + frames/sr)` of `phase` into
    /// `out` (interleaved stereo, so `frames = out.len() / 2`).
    ///
    /// Every sample is clamped to the ±0.8 headroom window and duplicated to
    /// both channels.
    pub fn render_into(&mut self, phase: &PhaseConfig, t_offset: f64, out: &mut [f32]) {
        let frames = out.len() / 2;
        self.ensure_scratch(frames);
        let sr = self.sample_rate as f32;

        match &phase.waveform {
            Waveform::ToneSet { freqs } => {
                fill_tone_set(&mut self.mono[..frames], freqs, t_offset, sr, phase.volume);
            }
            Waveform::Sweep { start_hz, end_hz } => {
                let freq = sweep_frequency(*start_hz, *end_hz, t_offset, SWEEP_PERIOD_SECS);
                fill_sine_abs(&mut self.mono[..frames], freq, t_offset, sr, phase.volume);
            }
            Waveform::PinkNoise => {
                let white = &mut self.white[..frames];
                let rng = &mut self.rng;
                for w in white.iter_mut() {
                    *w = rng.gen_range(-UNIT_VARIANCE_SPAN..UNIT_VARIANCE_SPAN);
                }
                accumulate_pink(
                    &mut self.mono[..frames],
                    &self.white[..frames],
                    phase.volume / 3.0,
                );
            }
        }

        for s in &mut self.mono[..frames] {
            *s = clamp_headroom(*s);
        }
        duplicate_stereo(&self.mono[..frames], out);
    }

    /// Render a notification cue as a fresh interleaved stereo buffer.
    pub fn render_cue(&self, freq_hz: f32, dur_secs: f32) -> Vec<f32> {
        let frames = (self.sample_rate as f32 * dur_secs) as usize;
        let mut mono = vec![0.0f32; frames];
        fill_cue_tone(&mut mono, freq_hz, self.sample_rate as f32, CUE_AMP);
        let mut out = vec![0.0f32; frames * 2];
        duplicate_stereo(&mono, &mut out);
        out
    }

    fn ensure_scratch(&mut self, frames: usize) {
        if self.mono.len() < frames {
            self.mono.resize(frames, 0.0);
            self.white.resize(frames, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Waveform;
    use burnin_core::dsp::HEADROOM;

    const SR: u32 = 44_100;
    const CHUNK: usize = 1024;

    fn phase(waveform: Waveform, volume: f32) -> PhaseConfig {
        PhaseConfig::new(300.0, waveform, volume, "test").unwrap()
    }

    fn peak(buf: &[f32]) -> f32 {
        buf.iter().fold(0.0f32, |m, &y| m.max(y.abs()))
    }

    #[test]
    fn tone_set_never_exceeds_headroom() {
        // Two aligned tones at full volume sum past 0.8 before the clamp.
        let p = phase(
            Waveform::ToneSet {
                freqs: vec![100.0, 100.0],
            },
            1.0,
        );
        let mut gen = SignalGenerator::new(SR, CHUNK);
        let mut out = vec![0.0f32; CHUNK * 2];
        gen.render_into(&p, 0.0, &mut out);
        let peak = peak(&out);
        assert!(peak <= HEADROOM + 1e-6, "peak={peak}");
        assert!((peak - HEADROOM).abs() < 1e-3, "clamp engaged, peak={peak}");
    }

    #[test]
    fn tone_set_is_deterministic() {
        let p = phase(
            Waveform::ToneSet {
                freqs: vec![20.0, 200.0, 2000.0, 8000.0],
            },
            0.4,
        );
        let mut gen = SignalGenerator::new(SR, CHUNK);
        let mut a = vec![0.0f32; CHUNK * 2];
        let mut b = vec![0.0f32; CHUNK * 2];
        gen.render_into(&p, 77.7, &mut a);
        gen.render_into(&p, 77.7, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn sweep_starts_at_start_frequency() {
        let p = phase(
            Waveform::Sweep {
                start_hz: 20.0,
                end_hz: 18_000.0,
            },
            0.35,
        );
        let mut gen = SignalGenerator::new(SR, CHUNK);
        let mut out = vec![0.0f32; CHUNK * 2];
        gen.render_into(&p, 0.0, &mut out);

        let mut want = vec![0.0f32; CHUNK];
        burnin_core::tone::fill_sine_abs(&mut want, 20.0, 0.0, SR as f32, 0.35);
        for (i, frame) in out.chunks_exact(2).enumerate() {
            assert!((frame[0] - want[i]).abs() < 1e-6, "i={i}");
        }
    }

    #[test]
    fn sweep_midpoint_frequency() {
        // Half way through the ramp the per-buffer frequency is the midpoint.
        let f = sweep_frequency(20.0, 18_000.0, SWEEP_PERIOD_SECS / 2.0, SWEEP_PERIOD_SECS);
        assert!((f - 0.5 * (20.0 + 18_000.0)).abs() < 1.0, "f={f}");
    }

    #[test]
    fn sweep_is_deterministic() {
        let p = phase(
            Waveform::Sweep {
                start_hz: 20.0,
                end_hz: 18_000.0,
            },
            0.55,
        );
        let mut gen = SignalGenerator::new(SR, CHUNK);
        let mut a = vec![0.0f32; CHUNK * 2];
        let mut b = vec![0.0f32; CHUNK * 2];
        gen.render_into(&p, 3.21, &mut a);
        gen.render_into(&p, 3.21, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn pink_noise_respects_headroom_and_stereo_duplication() {
        let p = phase(Waveform::PinkNoise, 0.7);
        let mut gen = SignalGenerator::new(SR, CHUNK);
        let mut out = vec![0.0f32; CHUNK * 2];
        gen.render_into(&p, 0.0, &mut out);
        assert!(peak(&out) <= HEADROOM + 1e-6);
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        // A random walk over a thousand steps is never all-zero.
        assert!(peak(&out) > 0.0);
    }

    #[test]
    fn cue_buffer_has_expected_shape() {
        let gen = SignalGenerator::new(SR, CHUNK);
        let cue = gen.render_cue(CUE_START_HZ, CUE_SECS);
        assert_eq!(cue.len(), (SR as f32 * CUE_SECS) as usize * 2);
        assert!(peak(&cue) <= CUE_AMP * 0.5 + 1e-3);
        assert!(peak(&cue) > 0.05);
    }
}
