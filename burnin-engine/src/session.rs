//! Resumable session bookkeeping on disk.
//!
//! One JSON record tracks how far a conditioning run has progressed so an
//! interrupted session can be offered for resume on the next launch. A
//! corrupt or missing record is never an error: `load` falls back to
//! defaults and logs what happened.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::PRESET_STANDARD;
use crate::error::EngineError;

/// On-disk subset of the session state plus bookkeeping stamps.
///
/// Unknown fields are ignored and missing fields defaulted, so records from
/// older builds still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub total_elapsed: f64,
    pub phase_elapsed: f64,
    pub last_preset: String,
    pub last_phase: String,
    pub work_interval: f64,
    pub rest_interval: f64,
    pub device_id: Option<String>,
    /// Unix seconds at save time; see [`unix_now`].
    pub saved_at: u64,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            total_elapsed: 0.0,
            phase_elapsed: 0.0,
            last_preset: PRESET_STANDARD.to_string(),
            last_phase: String::new(),
            work_interval: 45.0 * 60.0,
            rest_interval: 15.0 * 60.0,
            device_id: None,
            saved_at: 0,
        }
    }
}

/// Current time as unix seconds, for stamping [`PersistedState::saved_at`].
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Durable storage for one [`PersistedState`] record.
///
/// Writes go through a sibling `.tmp` file followed by a rename, so a
/// concurrent reader never sees a half-written record.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a resumable record exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the record, falling back to defaults on a missing or unreadable
    /// file. Never propagates an error.
    pub fn load(&self) -> PersistedState {
        if !self.exists() {
            return PersistedState::default();
        }
        match self.try_load() {
            Ok(state) => state,
            Err(err) => {
                warn!("failed to load session state, using defaults: {err}");
                PersistedState::default()
            }
        }
    }

    fn try_load(&self) -> Result<PersistedState, EngineError> {
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the record. Failures are logged, not propagated.
    pub fn save(&self, state: &PersistedState) {
        match self.try_save(state) {
            Ok(()) => info!("session state saved to {}", self.path.display()),
            Err(err) => error!("failed to save session state: {err}"),
        }
    }

    fn try_save(&self, state: &PersistedState) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Remove the record. A missing file is fine; other failures are logged.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("session state cleared"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => error!("failed to clear session state: {err}"),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_path(tag: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "burnin-session-{}-{}-{}.json",
            tag,
            std::process::id(),
            n
        ))
    }

    #[test]
    fn round_trip_preserves_fields() {
        let store = StateStore::new(scratch_path("roundtrip"));
        let state = PersistedState {
            total_elapsed: 1234.5,
            phase_elapsed: 42.25,
            last_preset: "Quick Test".into(),
            last_phase: "Dynamic Optimization".into(),
            work_interval: 60.0,
            rest_interval: 30.0,
            device_id: Some("USB DAC".into()),
            saved_at: unix_now(),
        };
        store.save(&state);
        assert_eq!(store.load(), state);
        store.clear();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = StateStore::new(scratch_path("missing"));
        assert!(!store.exists());
        assert_eq!(store.load(), PersistedState::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let store = StateStore::new(scratch_path("corrupt"));
        fs::write(store.path(), b"{\"total_elapsed\": 12.5, \"last_pre").unwrap();
        assert_eq!(store.load(), PersistedState::default());
        store.clear();
    }

    #[test]
    fn partial_record_fills_in_defaults() {
        let store = StateStore::new(scratch_path("partial"));
        fs::write(store.path(), b"{\"total_elapsed\": 12.5}").unwrap();
        let state = store.load();
        assert_eq!(state.total_elapsed, 12.5);
        assert_eq!(state.work_interval, 45.0 * 60.0);
        assert_eq!(state.last_preset, PRESET_STANDARD);
        store.clear();
    }

    #[test]
    fn save_leaves_no_tmp_file_behind() {
        let store = StateStore::new(scratch_path("tmp"));
        store.save(&PersistedState::default());
        assert!(store.exists());
        assert!(!store.tmp_path().exists());
        store.clear();
    }

    #[test]
    fn clear_is_idempotent() {
        let store = StateStore::new(scratch_path("clear"));
        store.clear();
        store.save(&PersistedState::default());
        store.clear();
        assert!(!store.exists());
        store.clear();
    }
}
