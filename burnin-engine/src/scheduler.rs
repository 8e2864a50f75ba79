//! Burn-in scheduler: the control loop that drives a phase end to end.
//!
//! Threading model mirrors a UI/worker bridge: the presentation side sends
//! `Pause`/`Resume`/`Stop` over an mpsc channel, the worker consumes them at
//! loop checkpoints, publishes readback through atomics, and surfaces
//! discrete events (progress, reminders, completion, fatal errors) over an
//! event channel.
//!
//! The worker owns the audio sink for the duration of a phase; the sink is
//! released on every exit path. Persistence is only ever written from the
//! worker, so state writes are serialized by construction.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::catalog::{PhaseCatalog, PhaseConfig};
use crate::error::EngineError;
use crate::session::{unix_now, PersistedState, StateStore};
use crate::signal::{SignalGenerator, CUE_END_HZ, CUE_SECS, CUE_START_HZ};
use crate::sink::{SinkProvider, StreamSpec};

/// Sleep step for the pause and rest wait branches.
const POLL: Duration = Duration::from_millis(50);

const SECS_PER_DAY: f64 = 86_400.0;

/// Minimum wall-clock gap between progress events.
const PROGRESS_THROTTLE: Duration = Duration::from_millis(200);

/// Scheduler tuning. An explicit value handed in at construction; there is
/// no process-wide configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub sample_rate: u32,
    pub chunk_frames: usize,
    /// Continuous playback before an automatic rest break, seconds.
    pub work_interval: f64,
    /// Rest break length, wall-clock seconds.
    pub rest_interval: f64,
    /// Accumulated playback between temperature reminders, seconds.
    pub reminder_interval: f64,
    /// Accumulated playback between automatic state saves, seconds.
    pub autosave_interval: f64,
    /// Maximum playback per day, seconds. The run stops (resumably) once the
    /// day's accumulated playback approaches this cap.
    pub max_daily_runtime: f64,
    /// Fraction of the daily cap held back as a safety margin.
    pub daily_margin: f64,
    /// Where the resumable session record lives.
    pub state_path: PathBuf,
    /// Output device by name; `None` picks the default.
    pub device_name: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            chunk_frames: 1024,
            work_interval: 45.0 * 60.0,
            rest_interval: 15.0 * 60.0,
            reminder_interval: 30.0 * 60.0,
            autosave_interval: 300.0,
            max_daily_runtime: 8.0 * 3600.0,
            daily_margin: 0.1,
            state_path: PathBuf::from("burnin_state.json"),
            device_name: None,
        }
    }
}

/// Commands consumed by the worker at loop checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
}

/// Events surfaced to the presentation layer. Delivered from the worker
/// thread; receivers marshal onto their own event loop before touching UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress {
        fraction: f64,
        phase: String,
        on_break: bool,
    },
    TemperatureReminder,
    /// The day's runtime cap was reached; the run stopped resumably.
    DailyCapReached,
    PhaseComplete,
    FatalError(String),
}

/// Read-only progress snapshot for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub running: bool,
    pub paused: bool,
    pub on_break: bool,
    pub preset: String,
    pub phase: String,
    pub elapsed_in_phase: f64,
    pub total_elapsed: f64,
    pub duration_secs: f64,
    pub fraction: f64,
}

/// Lock-free worker → presentation readback. f64 values are stored as bit
/// patterns (no AtomicF64 in std).
struct SharedProgress {
    running: AtomicBool,
    paused: AtomicBool,
    on_break: AtomicBool,
    elapsed_bits: AtomicU64,
    total_bits: AtomicU64,
}

impl SharedProgress {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            on_break: AtomicBool::new(false),
            elapsed_bits: AtomicU64::new(0.0_f64.to_bits()),
            total_bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    fn set_elapsed(&self, v: f64) {
        self.elapsed_bits.store(v.to_bits(), Ordering::Relaxed);
    }

    fn elapsed(&self) -> f64 {
        f64::from_bits(self.elapsed_bits.load(Ordering::Relaxed))
    }

    fn set_total(&self, v: f64) {
        self.total_bits.store(v.to_bits(), Ordering::Relaxed);
    }

    fn total(&self) -> f64 {
        f64::from_bits(self.total_bits.load(Ordering::Relaxed))
    }
}

/// State machine driving a burn-in run: Idle → Running → {Paused ⇄ Running}
/// → Stopping → Idle, with an `OnBreak` sub-state entered automatically.
pub struct Scheduler {
    config: SchedulerConfig,
    catalog: PhaseCatalog,
    store: StateStore,
    provider: Arc<dyn SinkProvider>,
    shared: Arc<SharedProgress>,
    event_tx: Sender<EngineEvent>,
    event_rx: Option<Receiver<EngineEvent>>,
    command_tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    current: Option<(String, String, f64)>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, catalog: PhaseCatalog, provider: Arc<dyn SinkProvider>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let store = StateStore::new(config.state_path.clone());
        Self {
            config,
            catalog,
            store,
            provider,
            shared: Arc::new(SharedProgress::new()),
            event_tx,
            event_rx: Some(event_rx),
            command_tx: None,
            worker: None,
            current: None,
        }
    }

    /// The event receiver. Can be taken once, before starting a run.
    pub fn events(&mut self) -> Option<Receiver<EngineEvent>> {
        self.event_rx.take()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Whether an interrupted session record exists on disk.
    pub fn has_resumable_session(&self) -> bool {
        self.store.exists()
    }

    /// Begin a phase. Valid only from Idle; calling while Running is a no-op
    /// with a warning and leaves all counters untouched.
    pub fn start(&mut self, preset: &str, phase: &str, resume: bool) -> Result<(), EngineError> {
        if self.is_running() {
            warn!("burn-in already running; ignoring start request");
            return Ok(());
        }
        self.join();

        let phase_cfg = self.catalog.get(preset, phase)?.clone();
        let (elapsed0, total0) = if resume && self.store.exists() {
            let rec = self.store.load();
            info!(
                "resuming session: {:.0}s into phase, {:.0}s overall",
                rec.phase_elapsed, rec.total_elapsed
            );
            (rec.phase_elapsed.min(phase_cfg.duration_secs), rec.total_elapsed)
        } else {
            (0.0, 0.0)
        };

        self.shared.set_elapsed(elapsed0);
        self.shared.set_total(total0);
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.on_break.store(false, Ordering::Relaxed);
        self.shared.running.store(true, Ordering::Relaxed);
        self.current = Some((preset.to_string(), phase.to_string(), phase_cfg.duration_secs));

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let worker = Worker {
            config: self.config.clone(),
            phase_cfg,
            preset_name: preset.to_string(),
            phase_name: phase.to_string(),
            provider: Arc::clone(&self.provider),
            store: self.store.clone(),
            shared: Arc::clone(&self.shared),
            events: self.event_tx.clone(),
            commands: cmd_rx,
            elapsed_in_phase: elapsed0,
            total_elapsed: total0,
            paused: false,
            stop: false,
            daily_cap: false,
            since_reminder: 0.0,
            since_save: 0.0,
            last_emit: None,
        };

        info!("starting burn-in phase {phase:?} ({preset:?})");
        let handle = thread::Builder::new()
            .name("burnin-worker".into())
            .spawn(move || worker.run());
        match handle {
            Ok(handle) => {
                self.worker = Some(handle);
                self.command_tx = Some(cmd_tx);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Relaxed);
                self.current = None;
                Err(err.into())
            }
        }
    }

    /// No-op while Idle.
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// No-op while Idle.
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Cooperative stop: the worker observes the request at the next
    /// iteration boundary, bounded by one buffer duration.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    fn send(&self, cmd: Command) {
        if !self.is_running() {
            return;
        }
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(cmd);
        }
    }

    /// Snapshot of the current run for display.
    pub fn progress(&self) -> Progress {
        let (preset, phase, duration_secs) = self
            .current
            .clone()
            .unwrap_or((String::new(), String::new(), 0.0));
        let elapsed = self.shared.elapsed();
        let fraction = if duration_secs > 0.0 {
            (elapsed / duration_secs).min(1.0)
        } else {
            0.0
        };
        Progress {
            running: self.is_running(),
            paused: self.shared.paused.load(Ordering::Relaxed),
            on_break: self.shared.on_break.load(Ordering::Relaxed),
            preset,
            phase,
            elapsed_in_phase: elapsed,
            total_elapsed: self.shared.total(),
            duration_secs,
            fraction,
        }
    }

    /// Wait for the worker to quiesce after completion or a stop request.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.command_tx = None;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Dropping the command sender disconnects the channel; the worker
        // treats that as a stop request.
        self.command_tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// How a run ended, for the exit-path bookkeeping.
enum Outcome {
    Completed,
    Stopped,
    DailyCap,
    Fatal(String),
    InitFailed(String),
}

struct Worker {
    config: SchedulerConfig,
    phase_cfg: PhaseConfig,
    preset_name: String,
    phase_name: String,
    provider: Arc<dyn SinkProvider>,
    store: StateStore,
    shared: Arc<SharedProgress>,
    events: Sender<EngineEvent>,
    commands: Receiver<Command>,
    elapsed_in_phase: f64,
    total_elapsed: f64,
    paused: bool,
    stop: bool,
    daily_cap: bool,
    since_reminder: f64,
    since_save: f64,
    last_emit: Option<Instant>,
}

impl Worker {
    fn run(mut self) {
        let outcome = self.run_phase();
        match outcome {
            Outcome::Completed => {
                info!("phase {:?} completed", self.phase_name);
                self.store.clear();
                let _ = self.events.send(EngineEvent::PhaseComplete);
            }
            Outcome::Stopped => {
                info!("phase {:?} stopped by request", self.phase_name);
                self.store.clear();
            }
            Outcome::DailyCap => {
                warn!("daily maximum runtime reached; stopping resumably");
                self.save_snapshot();
                let _ = self.events.send(EngineEvent::DailyCapReached);
            }
            Outcome::Fatal(msg) => {
                error!("phase {:?} aborted: {msg}", self.phase_name);
                self.save_snapshot();
                let _ = self.events.send(EngineEvent::FatalError(msg));
            }
            Outcome::InitFailed(msg) => {
                error!("phase {:?} could not start: {msg}", self.phase_name);
                let _ = self.events.send(EngineEvent::FatalError(msg));
            }
        }
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.on_break.store(false, Ordering::Relaxed);
        self.shared.running.store(false, Ordering::Relaxed);
    }

    fn run_phase(&mut self) -> Outcome {
        let spec = StreamSpec {
            sample_rate: self.config.sample_rate,
            channels: 2,
            chunk_frames: self.config.chunk_frames,
            device_name: self.config.device_name.clone(),
        };
        let mut sink = match self.provider.open(&spec) {
            Ok(sink) => sink,
            Err(err) => return Outcome::InitFailed(err.to_string()),
        };

        let mut gen = SignalGenerator::new(self.config.sample_rate, self.config.chunk_frames);
        let cue = gen.render_cue(CUE_START_HZ, CUE_SECS);
        if let Err(err) = sink.write(&cue) {
            warn!("start cue playback failed: {err}");
        }

        let chunk_secs = self.config.chunk_frames as f64 / f64::from(self.config.sample_rate);
        let mut out = vec![0.0f32; self.config.chunk_frames * 2];

        let outcome = loop {
            self.drain_commands();
            if self.stop {
                break Outcome::Stopped;
            }
            if self.paused {
                thread::sleep(POLL);
                continue;
            }

            gen.render_into(&self.phase_cfg, self.elapsed_in_phase, &mut out);
            if let Err(err) = sink.write(&out) {
                warn!("audio write failed: {err}; attempting stream recovery");
                match sink.recover() {
                    Ok(()) => {
                        info!("output stream recovered");
                        continue;
                    }
                    Err(rerr) => {
                        break Outcome::Fatal(format!("audio output lost: {rerr}"));
                    }
                }
            }

            self.advance(chunk_secs);
            if self.elapsed_in_phase >= self.phase_cfg.duration_secs {
                break Outcome::Completed;
            }
            self.check_safety();
            if self.daily_cap {
                break Outcome::DailyCap;
            }
            if self.stop {
                break Outcome::Stopped;
            }
            if self.since_save >= self.config.autosave_interval {
                self.since_save = 0.0;
                self.save_snapshot();
            }
            self.emit_progress(false, false);
        };

        if !matches!(outcome, Outcome::Fatal(_)) {
            let cue = gen.render_cue(CUE_END_HZ, CUE_SECS);
            if let Err(err) = sink.write(&cue) {
                warn!("end cue playback failed: {err}");
            }
        }
        // `sink` drops here on every path, releasing the device.
        outcome
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Pause) => {
                    if !self.paused {
                        self.paused = true;
                        self.shared.paused.store(true, Ordering::Relaxed);
                        info!("burn-in paused");
                        self.save_snapshot();
                    }
                }
                Ok(Command::Resume) => {
                    if self.paused {
                        self.paused = false;
                        self.shared.paused.store(false, Ordering::Relaxed);
                        info!("burn-in resumed");
                    }
                }
                Ok(Command::Stop) => {
                    info!("stop requested");
                    self.stop = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Scheduler handle is gone; quiesce instead of playing on.
                    self.stop = true;
                    break;
                }
            }
        }
    }

    fn advance(&mut self, chunk_secs: f64) {
        self.elapsed_in_phase += chunk_secs;
        self.total_elapsed += chunk_secs;
        self.since_reminder += chunk_secs;
        self.since_save += chunk_secs;
        self.shared.set_elapsed(self.elapsed_in_phase);
        self.shared.set_total(self.total_elapsed);
    }

    /// Once per iteration: daily cap, periodic temperature reminder, and the
    /// automatic rest break when the work interval has been played through.
    fn check_safety(&mut self) {
        let daily = self.total_elapsed % SECS_PER_DAY;
        if daily >= self.config.max_daily_runtime * (1.0 - self.config.daily_margin) {
            self.daily_cap = true;
            return;
        }
        if self.since_reminder >= self.config.reminder_interval {
            self.since_reminder = 0.0;
            let _ = self.events.send(EngineEvent::TemperatureReminder);
        }
        // Elapsed phase time is intentionally not reset by the break, so a
        // long phase keeps re-triggering breaks once past the threshold;
        // total phase duration still bounds the run.
        if self.elapsed_in_phase >= self.config.work_interval {
            self.take_break();
        }
    }

    fn take_break(&mut self) {
        info!(
            "work interval reached after {:.0}s; resting for {:.0}s",
            self.elapsed_in_phase, self.config.rest_interval
        );
        self.shared.on_break.store(true, Ordering::Relaxed);
        self.emit_progress(true, true);
        let rest_start = Instant::now();
        while rest_start.elapsed().as_secs_f64() < self.config.rest_interval {
            self.drain_commands();
            if self.stop {
                break;
            }
            thread::sleep(POLL);
        }
        self.shared.on_break.store(false, Ordering::Relaxed);
    }

    fn emit_progress(&mut self, on_break: bool, force: bool) {
        let due = force
            || self
                .last_emit
                .map_or(true, |t| t.elapsed() >= PROGRESS_THROTTLE);
        if !due {
            return;
        }
        self.last_emit = Some(Instant::now());
        let fraction = (self.elapsed_in_phase / self.phase_cfg.duration_secs).min(1.0);
        let _ = self.events.send(EngineEvent::Progress {
            fraction,
            phase: self.phase_name.clone(),
            on_break,
        });
    }

    fn save_snapshot(&self) {
        let rec = PersistedState {
            total_elapsed: self.total_elapsed,
            phase_elapsed: self.elapsed_in_phase,
            last_preset: self.preset_name.clone(),
            last_phase: self.phase_name.clone(),
            work_interval: self.config.work_interval,
            rest_interval: self.config.rest_interval,
            device_id: self.config.device_name.clone(),
            saved_at: unix_now(),
        };
        self.store.save(&rec);
    }
}
