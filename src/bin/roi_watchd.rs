//! roi_watchd - ROI watch daemon
//!
//! This daemon:
//! 1. Pulls frames from the configured camera source
//! 2. Reads ROI commands (`begin x y`, `update x y`, `end x y`, `clear`, `quit`)
//!    from stdin
//! 3. Runs the selected detector on the ROI only
//! 4. Sends one notification per appearance episode, with cached location

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use roi_watch::location::{DisabledProvider, GeoProvider, IpInfoProvider};
use roi_watch::notify::{DeliveryWorker, IdGenerator};
use roi_watch::{
    open_source, AppConfig, BackendRegistry, ControlFlow, Delivery, Dispatcher, FramePipeline,
    HttpTransport, LabelFilter, LocationCache, RoiCommand, RoiManager,
};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "ROI_WATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the camera source URL.
    #[arg(long)]
    camera_url: Option<String>,

    /// Deliver notifications from a background worker.
    #[arg(long)]
    background: bool,

    /// Skip geolocation; notifications carry null coordinates.
    #[arg(long)]
    no_location: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = AppConfig::load_from(args.config.as_deref())?;
    if let Some(url) = args.camera_url {
        cfg.camera.url = url;
    }
    if args.background {
        cfg.notify.background = true;
    }
    if args.no_location {
        cfg.location.enabled = false;
    }

    let registry = BackendRegistry::with_builtin();
    let detector = registry.select(&cfg.detection.backend)?;
    log::info!(
        "detector backend: {} (model {})",
        cfg.detection.backend,
        cfg.detection.model_path.display()
    );

    let mut source = open_source(&cfg.camera)?;
    source
        .connect()
        .with_context(|| format!("failed to connect camera {}", cfg.camera.id))?;

    let provider: Box<dyn GeoProvider> = if cfg.location.enabled {
        Box::new(IpInfoProvider::new(&cfg.location.url, cfg.location.timeout))
    } else {
        Box::new(DisabledProvider)
    };
    let provider_name = provider.name().to_string();
    let location = Arc::new(LocationCache::new(provider, cfg.location.ttl));
    log::info!(
        "location provider: {} (ttl {}s)",
        provider_name,
        location.ttl().as_secs()
    );

    if cfg.notify.api_key.is_empty() {
        log::warn!("ROI_WATCH_API_KEY is not set; notifications are sent with an empty bearer token");
    }
    let transport = HttpTransport::new(&cfg.notify.api_url, &cfg.notify.api_key, cfg.notify.timeout);
    let dispatcher = Dispatcher::new(Box::new(transport), IdGenerator::new(cfg.notify.id_length));
    let delivery = if cfg.notify.background {
        Delivery::Background(DeliveryWorker::spawn(
            dispatcher,
            location.clone(),
            cfg.notify.queue_capacity,
        ))
    } else {
        Delivery::Inline(dispatcher)
    };

    let roi = Arc::new(RoiManager::new(cfg.roi.min_size));
    log::info!("roi minimum size: {} px", roi.min_size());
    let filter = LabelFilter::new(&cfg.detection.labels, cfg.detection.confidence_threshold);
    let mut pipeline = FramePipeline::new(
        roi.clone(),
        detector,
        filter,
        location,
        delivery,
        cfg.camera.id.clone(),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("error setting Ctrl-C handler")?;
    }
    spawn_control_reader(roi.clone(), shutdown.clone());

    log::info!(
        "roi_watchd running: camera {} ({}), {} fps, notifying {}",
        cfg.camera.id,
        cfg.camera.url,
        cfg.camera.target_fps,
        cfg.notify.api_url
    );
    log::info!("waiting for an ROI: send 'begin x y' then 'end x y' on stdin");

    let frame_interval = Duration::from_millis(1000 / cfg.camera.target_fps.max(1) as u64);
    let mut last_health_log = Instant::now();
    let mut episode_count: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) {
        let tick = Instant::now();

        match source.next_frame() {
            Ok(Some(frame)) => {
                let report = pipeline.process(&frame);
                episode_count += report.episodes.len() as u64;
                log::debug!(
                    "frame {}: {:?}, {} detections",
                    report.sequence,
                    report.state,
                    report.detections.len()
                );
            }
            Ok(None) => log::debug!("no frame this tick"),
            Err(e) => log::warn!("frame capture failed: {:#}", e),
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = source.stats();
            log::info!(
                "camera health={} frames={} url={} roi={} episodes={} location={:?}",
                source.is_healthy(),
                stats.frames_captured,
                stats.url,
                roi.current()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                episode_count,
                pipeline.location().last_known().map(|c| c.to_array())
            );
            last_health_log = Instant::now();
        }

        if let Some(remaining) = frame_interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    log::info!("shutdown requested, stopping...");
    if let Some(stats) = pipeline.shutdown()? {
        log::info!(
            "delivery worker stopped: {} delivered, {} failed",
            stats.delivered,
            stats.failed
        );
    }
    Ok(())
}

fn spawn_control_reader(roi: Arc<RoiManager>, shutdown: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("control input closed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match RoiCommand::parse(&line) {
                Ok(command) => {
                    if command.apply(&roi) == ControlFlow::Quit {
                        shutdown.store(true, Ordering::SeqCst);
                        break;
                    }
                }
                Err(e) => log::warn!("ignoring control command '{}': {}", line.trim(), e),
            }
        }
    });
}
