//! Burnin CLI — terminal runner for headphone conditioning phases.

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use burnin_engine::catalog::PhaseCatalog;
use burnin_engine::scheduler::{EngineEvent, Scheduler, SchedulerConfig};
use burnin_engine::session::StateStore;
use burnin_engine::signal::SignalGenerator;
use burnin_engine::sink::{AudioSink, CpalOutput, SinkProvider, StreamSpec};

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    list_phases: bool,
    test_tone: bool,
    device_name: Option<String>,
    preset: Option<String>,
    phase: Option<String>,
    resume: bool,
    fresh: bool,
    sample_rate: Option<u32>,
    chunk: Option<usize>,
    state_file: Option<PathBuf>,
    work_interval: Option<f64>,
    rest_interval: Option<f64>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--list-phases"  { a.list_phases = true;  continue; }
        if s == "--test-tone"    { a.test_tone = true;    continue; }
        if s == "--resume"       { a.resume = true;       continue; }
        if s == "--fresh"        { a.fresh = true;        continue; }
        if let Some(rest) = s.strip_prefix("--device=")        { a.device_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--preset=")        { a.preset       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--phase=")         { a.phase        = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=")   { a.sample_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--chunk=")         { a.chunk        = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--state-file=")    { a.state_file   = Some(rest.into());      continue; }
        if let Some(rest) = s.strip_prefix("--work-interval=") { a.work_interval = rest.parse().ok();     continue; }
        if let Some(rest) = s.strip_prefix("--rest-interval=") { a.rest_interval = rest.parse().ok();     continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn format_hms(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// One-second 440 Hz tone through the selected device, for checking the
/// headphone path before committing to a long phase.
fn play_test_tone(device_name: Option<String>) -> Result<(), Box<dyn Error>> {
    let spec = StreamSpec {
        sample_rate: 44_100,
        channels: 2,
        chunk_frames: 1024,
        device_name,
    };
    let provider = CpalOutput::new();
    let mut sink = provider.open(&spec)?;
    let gen = SignalGenerator::new(spec.sample_rate, spec.chunk_frames);
    sink.write(&gen.render_cue(440.0, 1.0))?;
    // Let the queued samples drain before the stream drops.
    std::thread::sleep(Duration::from_millis(1200));
    println!("Played a 440 Hz test tone; check that both channels sound clean.");
    Ok(())
}

fn list_phases(catalog: &PhaseCatalog) -> Result<(), Box<dyn Error>> {
    for preset in catalog.presets() {
        println!("{preset}:");
        for phase in catalog.phases(preset) {
            let cfg = catalog.get(preset, phase)?;
            println!(
                "  - {phase} ({}, vol {:.2}): {}",
                format_hms(cfg.duration_secs),
                cfg.volume,
                cfg.description
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = parse_args();

    if args.list_devices {
        println!("Available output devices:");
        for name in CpalOutput::list_devices()? {
            println!("- {name}");
        }
        return Ok(());
    }

    let catalog = PhaseCatalog::builtin();
    if args.list_phases {
        return list_phases(&catalog);
    }

    if args.test_tone {
        return play_test_tone(args.device_name.clone());
    }

    println!("burnin-cli — headphone conditioning runner\n");

    let Some(phase) = args.phase.clone() else {
        eprintln!("[warn] no phase selected; pass --phase=... (see --list-phases)");
        return Err("no phase selected".into());
    };

    let state_path = args
        .state_file
        .clone()
        .unwrap_or_else(|| PathBuf::from("burnin_state.json"));
    let store = StateStore::new(state_path.clone());

    let resume = if store.exists() {
        if args.resume {
            true
        } else {
            if args.fresh {
                store.clear();
            } else {
                eprintln!(
                    "[warn] found an interrupted session; pass --resume to continue it or --fresh to discard"
                );
            }
            false
        }
    } else {
        false
    };

    // Last-used preset and intervals seed the defaults.
    let persisted = store.load();
    let preset = args.preset.clone().unwrap_or(persisted.last_preset);

    let defaults = SchedulerConfig::default();
    let config = SchedulerConfig {
        sample_rate: args.sample_rate.unwrap_or(defaults.sample_rate),
        chunk_frames: args.chunk.unwrap_or(defaults.chunk_frames),
        work_interval: args.work_interval.unwrap_or(persisted.work_interval),
        rest_interval: args.rest_interval.unwrap_or(persisted.rest_interval),
        state_path,
        device_name: args.device_name.clone(),
        ..defaults
    };

    let phase_cfg = catalog.get(&preset, &phase)?.clone();
    println!("Preset:   {preset}");
    println!("Phase:    {phase}");
    println!("Duration: {}", format_hms(phase_cfg.duration_secs));
    println!("Detail:   {}", phase_cfg.description);
    if let Some(dev) = &args.device_name {
        println!("Device:   {dev}");
    }
    println!("\nPress Ctrl+C to interrupt; the session autosaves and can be resumed.\n");

    let mut scheduler = Scheduler::new(config, catalog, Arc::new(CpalOutput::new()));
    let events = scheduler
        .events()
        .ok_or("event channel already taken")?;
    scheduler.start(&preset, &phase, resume)?;

    let mut fatal: Option<String> = None;
    loop {
        match events.recv_timeout(Duration::from_millis(500)) {
            Ok(EngineEvent::Progress { fraction, on_break, .. }) => {
                let p = scheduler.progress();
                let remaining = (p.duration_secs - p.elapsed_in_phase).max(0.0);
                let state = if on_break { "On Break" } else { "Running " };
                print!(
                    "\r{state}  elapsed {}  remaining {}  {:5.1}%   ",
                    format_hms(p.elapsed_in_phase),
                    format_hms(remaining),
                    fraction * 100.0
                );
                std::io::stdout().flush().ok();
            }
            Ok(EngineEvent::TemperatureReminder) => {
                eprintln!("\n[reminder] please check earpad temperature");
            }
            Ok(EngineEvent::DailyCapReached) => {
                println!("\n\nDaily runtime cap reached; progress saved. Resume tomorrow with --resume.");
                break;
            }
            Ok(EngineEvent::PhaseComplete) => {
                println!("\n\nPhase complete.");
                break;
            }
            Ok(EngineEvent::FatalError(msg)) => {
                fatal = Some(msg);
                break;
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if !scheduler.is_running() {
                    break;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    scheduler.join();

    if let Some(msg) = fatal {
        eprintln!("\n[error] {msg}");
        return Err(msg.into());
    }
    Ok(())
}
