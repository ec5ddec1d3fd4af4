//! detection_viewer - Render a live detection stream.
//!
//! This binary:
//! 1. Loads viewer config (OVERLAY_CONFIG file, env, CLI flags)
//! 2. Connects to the detection event stream
//! 3. Renders every frame onto a raster surface and logs its listing
//! 4. Writes PNG snapshots if configured
//! 5. Tears down on Ctrl-C or when the connection is lost (no reconnect)

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use detection_overlay::config::ViewerConfig;
use detection_overlay::{present, PumpExit, RasterSurface};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a live object-detection stream")]
struct Args {
    /// Event stream URL (overrides config).
    #[arg(long, env = "OVERLAY_STREAM_URL")]
    url: Option<String>,

    /// PNG path for the rendered overlay, written at exit.
    #[arg(long, env = "OVERLAY_SNAPSHOT_PATH")]
    snapshot: Option<PathBuf>,

    /// Rewrite the snapshot after every frame.
    #[arg(long, env = "OVERLAY_SNAPSHOT_EVERY_FRAME")]
    snapshot_every_frame: bool,

    /// Surface width (overrides config).
    #[arg(long, env = "OVERLAY_SURFACE_WIDTH")]
    width: Option<u32>,

    /// Surface height (overrides config).
    #[arg(long, env = "OVERLAY_SURFACE_HEIGHT")]
    height: Option<u32>,
}

/// Flags (or their env fallbacks) win over the loaded config.
fn apply_args(cfg: &mut ViewerConfig, args: Args) {
    if let Some(url) = args.url {
        cfg.stream_url = url;
    }
    if let Some(path) = args.snapshot {
        cfg.snapshot.path = Some(path);
    }
    if args.snapshot_every_frame {
        cfg.snapshot.every_frame = true;
    }
    if let Some(width) = args.width {
        cfg.surface_width = width;
    }
    if let Some(height) = args.height {
        cfg.surface_height = height;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = ViewerConfig::load()?;
    apply_args(&mut cfg, args);
    cfg.validate()?;

    log::info!("detection viewer starting");
    log::info!("  Stream: {}", cfg.stream_url);
    log::info!("  Surface: {}x{}", cfg.surface_width, cfg.surface_height);
    log::info!(
        "  Snapshot: {}",
        cfg.snapshot
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let surface = Rc::new(RefCell::new(RasterSurface::new(
        cfg.surface_width,
        cfg.surface_height,
    )));
    let mut pipeline = detection_overlay::activate(&cfg.stream_url, Rc::clone(&surface))?;

    let interrupter = pipeline.interrupter();
    ctrlc::set_handler(move || {
        interrupter.interrupt();
    })
    .context("set Ctrl-C handler")?;

    pipeline.subscribe(|frame| {
        for line in present::describe(frame) {
            log::info!("{}", line);
        }
    });

    if cfg.snapshot.every_frame {
        if let Some(path) = cfg.snapshot.path.clone() {
            let target = Rc::clone(&surface);
            pipeline.subscribe(move |_| {
                if let Err(e) = target.borrow().save_png(&path) {
                    log::warn!("snapshot failed: {:#}", e);
                }
            });
        }
    }

    pipeline.on_connection_lost(|err| {
        log::error!("{}; not reconnecting", err);
    });

    let exit = pipeline.pump();
    pipeline.teardown();

    if let Some(path) = &cfg.snapshot.path {
        surface.borrow().save_png(path)?;
        log::info!("snapshot written to {}", path.display());
    }

    match exit {
        PumpExit::ConnectionLost => Err(anyhow!("connection to {} lost", cfg.stream_url)),
        PumpExit::Interrupted | PumpExit::TornDown => {
            log::info!("shutdown complete");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 5] = [
        "OVERLAY_STREAM_URL",
        "OVERLAY_SNAPSHOT_PATH",
        "OVERLAY_SNAPSHOT_EVERY_FRAME",
        "OVERLAY_SURFACE_WIDTH",
        "OVERLAY_SURFACE_HEIGHT",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn env_fills_unset_flags() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("OVERLAY_STREAM_URL", "http://cam.local:9000/stream");
        std::env::set_var("OVERLAY_SNAPSHOT_PATH", "/tmp/env.png");
        std::env::set_var("OVERLAY_SNAPSHOT_EVERY_FRAME", "true");
        std::env::set_var("OVERLAY_SURFACE_WIDTH", "320");
        std::env::set_var("OVERLAY_SURFACE_HEIGHT", "240");

        let args = Args::try_parse_from(["detection_viewer"]).unwrap();
        let mut cfg = ViewerConfig::default();
        apply_args(&mut cfg, args);
        clear_env();

        assert_eq!(cfg.stream_url, "http://cam.local:9000/stream");
        assert_eq!(cfg.snapshot.path, Some(PathBuf::from("/tmp/env.png")));
        assert!(cfg.snapshot.every_frame);
        assert_eq!((cfg.surface_width, cfg.surface_height), (320, 240));
        cfg.validate().unwrap();
    }

    #[test]
    fn flags_override_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("OVERLAY_STREAM_URL", "http://env.local/stream");
        std::env::set_var("OVERLAY_SURFACE_WIDTH", "320");

        let args = Args::try_parse_from([
            "detection_viewer",
            "--url",
            "http://flag.local/stream",
            "--width",
            "800",
        ])
        .unwrap();
        let mut cfg = ViewerConfig::default();
        apply_args(&mut cfg, args);
        clear_env();

        assert_eq!(cfg.stream_url, "http://flag.local/stream");
        assert_eq!(cfg.surface_width, 800);
        assert_eq!(cfg.surface_height, 480);
        assert!(cfg.snapshot.path.is_none());
    }

    #[test]
    fn no_flags_or_env_keeps_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let args = Args::try_parse_from(["detection_viewer"]).unwrap();
        let mut cfg = ViewerConfig::default();
        apply_args(&mut cfg, args);

        assert_eq!(cfg.stream_url, ViewerConfig::default().stream_url);
        assert!(!cfg.snapshot.every_frame);
    }
}
