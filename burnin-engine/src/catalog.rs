//! Phase catalog: the static table mapping (preset, phase) to a signal plan.
//!
//! The catalog is built once at startup and never mutated afterwards. Each
//! entry pairs a waveform recipe with a duration, an output volume, and a
//! short description for the presentation layer.

use std::collections::BTreeMap;

use crate::error::EngineError;

/// Short demonstration durations.
pub const PRESET_QUICK_TEST: &str = "Quick Test";
/// Multi-hour conditioning durations.
pub const PRESET_STANDARD: &str = "Standard Burn-in";

pub const PHASE_LOW_FREQ: &str = "Low Frequency Activation";
pub const PHASE_FULL_RANGE: &str = "Full Frequency Expansion";
pub const PHASE_DYNAMIC: &str = "Dynamic Optimization";
pub const PHASE_BREAK_IN: &str = "Natural Break-in";

/// Waveform recipe. Each variant carries only the fields it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// Equal-weight sum of sines; output volume is split across the tones.
    ToneSet { freqs: Vec<f32> },
    /// Single sine whose frequency ramps linearly between the endpoints over
    /// a fixed period, repeating.
    Sweep { start_hz: f32, end_hz: f32 },
    /// Low-pass-shaped random walk approximating pink noise.
    PinkNoise,
}

/// Immutable descriptor of one burn-in phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    pub duration_secs: f64,
    pub waveform: Waveform,
    pub volume: f32,
    pub description: String,
}

impl PhaseConfig {
    /// Validated constructor. Rejects non-positive durations, volumes outside
    /// [0, 1], and tone sets without frequencies.
    pub fn new(
        duration_secs: f64,
        waveform: Waveform,
        volume: f32,
        description: impl Into<String>,
    ) -> Result<Self, EngineError> {
        if duration_secs <= 0.0 {
            return Err(EngineError::Config(format!(
                "phase duration must be positive, got {duration_secs}"
            )));
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(EngineError::Config(format!(
                "volume must be within [0, 1], got {volume}"
            )));
        }
        match &waveform {
            Waveform::ToneSet { freqs } if freqs.is_empty() => {
                return Err(EngineError::Config(
                    "tone set requires at least one frequency".into(),
                ));
            }
            Waveform::Sweep { start_hz, end_hz } if *start_hz <= 0.0 || *end_hz <= 0.0 => {
                return Err(EngineError::Config(format!(
                    "sweep endpoints must be positive, got {start_hz}..{end_hz}"
                )));
            }
            _ => {}
        }
        Ok(Self {
            duration_secs,
            waveform,
            volume,
            description: description.into(),
        })
    }
}

/// Static lookup table from (preset, phase) to [`PhaseConfig`].
#[derive(Debug, Clone, Default)]
pub struct PhaseCatalog {
    entries: BTreeMap<(String, String), PhaseConfig>,
}

impl PhaseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped presets crossed with the four conditioning phases.
    pub fn builtin() -> Self {
        // Static entries are built directly; `PhaseConfig::new` validation is
        // for configs assembled at runtime.
        let entry = |duration_secs: f64, waveform: Waveform, volume: f32, desc: &str| PhaseConfig {
            duration_secs,
            waveform,
            volume,
            description: desc.to_string(),
        };
        let tone = |freqs: &[f32]| Waveform::ToneSet {
            freqs: freqs.to_vec(),
        };
        let sweep = || Waveform::Sweep {
            start_hz: 20.0,
            end_hz: 18_000.0,
        };

        let mut cat = Self::new();
        let quick = [
            (PHASE_LOW_FREQ, tone(&[20.0, 50.0, 100.0]), 0.3, "Quickly activate low-frequency response"),
            (PHASE_FULL_RANGE, tone(&[20.0, 200.0, 2000.0, 8000.0]), 0.4, "Quickly balance full frequency range"),
            (PHASE_DYNAMIC, sweep(), 0.35, "Quickly optimize dynamic range"),
            (PHASE_BREAK_IN, Waveform::PinkNoise, 0.5, "Quickly simulate music signals"),
        ];
        for (phase, wf, vol, desc) in quick {
            cat.insert(PRESET_QUICK_TEST, phase, entry(300.0, wf, vol, desc));
        }

        let hours = |h: f64| h * 3600.0;
        let standard = [
            (PHASE_LOW_FREQ, tone(&[20.0, 50.0, 100.0]), hours(10.0), 0.5, "Deeply activate low-frequency response"),
            (PHASE_FULL_RANGE, tone(&[20.0, 200.0, 2000.0, 8000.0]), hours(12.0), 0.6, "Fully balance frequency response"),
            (PHASE_DYNAMIC, sweep(), hours(10.0), 0.55, "Enhance transient response"),
            (PHASE_BREAK_IN, Waveform::PinkNoise, hours(8.0), 0.7, "Simulate real music playback"),
        ];
        for (phase, wf, dur, vol, desc) in standard {
            cat.insert(PRESET_STANDARD, phase, entry(dur, wf, vol, desc));
        }
        cat
    }

    pub fn insert(&mut self, preset: &str, phase: &str, config: PhaseConfig) {
        self.entries
            .insert((preset.to_string(), phase.to_string()), config);
    }

    pub fn get(&self, preset: &str, phase: &str) -> Result<&PhaseConfig, EngineError> {
        self.entries
            .get(&(preset.to_string(), phase.to_string()))
            .ok_or_else(|| EngineError::UnknownPhase {
                preset: preset.to_string(),
                phase: phase.to_string(),
            })
    }

    /// Preset names, deduplicated, in sorted order.
    pub fn presets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|(p, _)| p.as_str()).collect();
        names.dedup();
        names
    }

    /// Phase names available under `preset`, in sorted order.
    pub fn phases(&self, preset: &str) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(p, _)| p == preset)
            .map(|(_, ph)| ph.as_str())
            .collect()
    }
}
