use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use crabscan::analysis::DetectorSet;
use crabscan::testing::{synthetic_nv21_frame, wait_until, Behavior, ScriptedCamera, ScriptedDetector};
use crabscan::{AnalysisKind, CameraEvent, CameraSession, ChannelEmitter, ScanConfig};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Args {
    frames: u64,
    fps: u32,
    kinds: Vec<AnalysisKind>,
    delay_ms: u64,
    width: u32,
    height: u32,
    config: Option<String>,
    json: bool,
}

fn usage() -> &'static str {
    "Usage: crabscan-sim [--frames <n>] [--fps <n>] [--kinds <kind,...>] [--delay-ms <n>] \
     [--size <w>x<h>] [--config <path>] [--json]"
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        frames: 300,
        fps: 30,
        kinds: AnalysisKind::all().collect(),
        delay_ms: 50,
        width: 640,
        height: 480,
        config: None,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value\n{}", args[i], usage()))
        };
        match args[i].as_str() {
            "--frames" => {
                parsed.frames = value(i)?.parse().context("--frames")?;
                i += 1;
            }
            "--fps" => {
                parsed.fps = value(i)?.parse().context("--fps")?;
                i += 1;
            }
            "--delay-ms" => {
                parsed.delay_ms = value(i)?.parse().context("--delay-ms")?;
                i += 1;
            }
            "--kinds" => {
                parsed.kinds = value(i)?
                    .split(',')
                    .map(|name| AnalysisKind::parse(name.trim()).ok_or_else(|| anyhow!("unknown kind: {}", name)))
                    .collect::<Result<_>>()?;
                i += 1;
            }
            "--size" => {
                let size = value(i)?;
                let (w, h) = size
                    .split_once('x')
                    .ok_or_else(|| anyhow!("--size expects <w>x<h>, got {}", size))?;
                parsed.width = w.parse().context("--size width")?;
                parsed.height = h.parse().context("--size height")?;
                i += 1;
            }
            "--config" => {
                parsed.config = Some(value(i)?);
                i += 1;
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}\n{}", other, usage()),
        }
        i += 1;
    }

    if parsed.fps == 0 {
        bail!("--fps must be at least 1");
    }
    Ok(parsed)
}

#[derive(Debug, serde::Serialize)]
struct KindReport {
    kind: AnalysisKind,
    dispatched: u64,
    succeeded: u64,
    failed: u64,
    events: u64,
}

#[derive(Debug, serde::Serialize)]
struct Report {
    started_at: DateTime<Utc>,
    frames_sent: u64,
    frames_idle: u64,
    frames_malformed: u64,
    elapsed_ms: u128,
    kinds: Vec<KindReport>,
}

fn main() -> Result<()> {
    crabscan::init_logging();
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => ScanConfig::load_from_file(path)?,
        None => ScanConfig::default(),
    };
    for kind in AnalysisKind::all() {
        config.analysis.set(kind, args.kinds.contains(&kind));
    }

    let mut detectors = DetectorSet::new();
    for kind in &args.kinds {
        let (detector, _probe) = ScriptedDetector::new(*kind, Behavior::Slow(Duration::from_millis(args.delay_ms)));
        detectors.insert(*kind, Arc::new(detector));
    }

    let (emitter, events) = ChannelEmitter::new();
    let (camera, _camera_probe) = ScriptedCamera::new();
    let session = CameraSession::builder(camera)
        .detectors(detectors)
        .emitter(Arc::new(emitter))
        .config(config)
        .build()?;
    session.on_host_resume();

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let interval = Duration::from_secs_f64(1.0 / args.fps as f64);
    let started_at = Utc::now();
    let start = Instant::now();
    let mut sent = 0;
    for n in 0..args.frames {
        if stop_flag.load(Ordering::SeqCst) {
            log::info!("stopping early after {} frames", n);
            break;
        }
        session.on_frame(synthetic_nv21_frame(n, args.width, args.height));
        sent += 1;

        let next = interval * (n as u32 + 1);
        if let Some(wait) = next.checked_sub(start.elapsed()) {
            std::thread::sleep(wait);
        }
    }

    wait_until(Duration::from_secs(10), || session.busy_kinds().is_empty());
    let elapsed = start.elapsed();

    let mut event_counts = [0u64; AnalysisKind::COUNT];
    for event in events.try_iter() {
        if let CameraEvent::Analysis { kind, .. } | CameraEvent::AnalysisError { kind, .. } = event {
            event_counts[kind.index()] += 1;
        }
    }

    let frame_stats = session.frame_stats();
    let report = Report {
        started_at,
        frames_sent: sent,
        frames_idle: frame_stats.idle,
        frames_malformed: frame_stats.malformed,
        elapsed_ms: elapsed.as_millis(),
        kinds: args
            .kinds
            .iter()
            .map(|kind| {
                let stats = session.task_stats().get(*kind);
                KindReport {
                    kind: *kind,
                    dispatched: stats.dispatched,
                    succeeded: stats.succeeded,
                    failed: stats.failed,
                    events: event_counts[kind.index()],
                }
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} frames in {} ms from {} ({} idle, {} malformed)",
            report.frames_sent,
            report.elapsed_ms,
            report.started_at.format("%H:%M:%S"),
            report.frames_idle,
            report.frames_malformed
        );
        for k in &report.kinds {
            println!(
                "  {:<15} dispatched {:>5}  ok {:>5}  failed {:>3}  events {:>5}",
                k.kind.as_str(),
                k.dispatched,
                k.succeeded,
                k.failed,
                k.events
            );
        }
    }

    session.on_host_destroy();
    Ok(())
}
