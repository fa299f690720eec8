mod renderer;
mod ui;

use lightbridge::audio::{CaptureSettings, Engine, EngineConfig, SourcePipe};
use lightbridge::utils::{Config, ConfigWatcher};
use lightbridge::PeerLink;
use nannou::prelude::*;
use renderer::{DebugInfo, DebugOverlay, LedStrip, Resolution};
use std::env;
use ui::bindings::{parse_key, Action};

fn main() {
    if env::var("RUST_LOG").is_ok() {
        env_logger::init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let args: Vec<String> = env::args().collect();
    if args.contains(&"--list-devices".to_string()) {
        SourcePipe::list_devices();
        return;
    }

    nannou::app(model).update(update).run();
}

struct Model {
    config: Config,
    watcher: ConfigWatcher,
    source: SourcePipe,
    engine: Engine,
    strip: LedStrip,
    debug: DebugOverlay,
    /// Reused buffer for the chunk taken from the capture thread
    chunk: Vec<i16>,
    /// Fed by the external link transport; stays local-only without one
    link: PeerLink,
}

fn build_engine(config: &Config) -> Engine {
    match Engine::new(config.private.engine_config()) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Invalid analysis settings ({}), using defaults", e);
            match Engine::new(EngineConfig::default()) {
                Ok(engine) => engine,
                Err(e) => {
                    log::error!("Default analysis settings rejected: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Capture settings matching the bank the engine actually runs
fn capture_settings(config: &Config, engine: &Engine) -> CaptureSettings {
    let bank = &engine.config().bank;
    CaptureSettings {
        sample_rate: bank.sample_rate,
        chunk_size: bank.chunk_size,
        ..config.private.capture_settings()
    }
}

fn model(app: &App) -> Model {
    let args: Vec<String> = env::args().collect();
    let resolution = Resolution::current();
    app.set_exit_on_escape(false);

    let window = app
        .new_window()
        .title("lightbridge")
        .view(view)
        .key_pressed(key_pressed)
        .size(resolution.width, resolution.height)
        .min_size(200, 80)
        .build();
    if let Err(e) = window {
        log::error!("Could not open preview window: {}", e);
        std::process::exit(1);
    }

    let config = Config::load();
    let mut engine = build_engine(&config);
    let bank = &engine.config().bank;
    log::info!(
        "Analyzing {} notes from {:.1} Hz to {:.1} Hz at {:.0} frames/s",
        bank.note_count,
        bank.lowest_frequency(),
        bank.highest_frequency(),
        bank.frame_rate()
    );

    if args.contains(&"--calibrate".to_string()) {
        engine.trigger_calibration();
    }

    let source = SourcePipe::new(capture_settings(&config, &engine));
    let mut debug = DebugOverlay::new();
    if args.contains(&"--debug".to_string()) || args.contains(&"-d".to_string()) {
        debug.toggle();
    }

    Model {
        watcher: ConfigWatcher::new(),
        strip: LedStrip::new(config.private.led_count()),
        chunk: Vec::with_capacity(engine.config().bank.chunk_size),
        link: PeerLink::new(config.private.is_main_unit()),
        source,
        engine,
        debug,
        config,
    }
}

fn apply_config(model: &mut Model, config: Config) {
    match model.engine.configure(config.private.engine_config()) {
        Ok(true) => log::info!("Analysis settings changed, filter bank rebuilt"),
        Ok(false) => {}
        Err(e) => log::error!("Keeping previous analysis settings: {}", e),
    }
    model.source.apply_settings(capture_settings(&config, &model.engine));
    model.strip.resize(config.private.led_count());
    model.link.set_main_unit(config.private.is_main_unit());
    model.config = config;
}

fn update(_app: &App, model: &mut Model, _update: Update) {
    if let Some(config) = model.watcher.poll() {
        apply_config(model, config);
    }

    // Size mismatches are logged by the engine and only skip this frame
    if model.source.take_latest(&mut model.chunk) {
        let _ = model.engine.process_chunk(&model.chunk);
    }

    let frame = model.engine.renderer_frame(model.link.flags(), model.link.mirrored());
    model.strip.update(&frame, &model.config.synced);

    if model.debug.visible {
        let calibrator = model.engine.calibrator();
        let zones = model.engine.bank().zone_count();
        model.debug.update(DebugInfo {
            device: model.source.device_name().map(str::to_string),
            stats: model.engine.stats(),
            overruns: model.source.overruns(),
            clipped: model.source.clipped(),
            calibration: Some(calibrator.state()),
            calibration_progress: calibrator.progress(),
            calibrated: calibrator.is_calibrated(),
            zone_followers: model.engine.normalizer().zone_followers()[..zones].to_vec(),
            following_main: model.link.following_main(),
        });
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    let bounds = app.window_rect();

    model.strip.draw(&draw, bounds);
    model.debug.draw(&draw, bounds);

    if let Err(e) = draw.to_frame(app, &frame) {
        log::warn!("Failed to draw frame: {:?}", e);
    }
}

fn key_pressed(app: &App, model: &mut Model, key: Key) {
    match parse_key(key, app.keys.mods.shift()) {
        Some(Action::Quit) => app.quit(),
        Some(Action::Recalibrate) => model.engine.trigger_calibration(),
        Some(Action::CancelCalibration) => model.engine.cancel_calibration(),
        Some(Action::ToggleMirror) => {
            model.config.synced.mirror_enabled = !model.config.synced.mirror_enabled;
        }
        Some(Action::ToggleDebug) => model.debug.toggle(),
        Some(Action::CycleMode) => {
            let mode = model.config.synced.lightshow_mode.next();
            model.config.synced.lightshow_mode = mode;
            log::info!("Lightshow mode: {:?}", mode);
        }
        Some(Action::SelectDevice(idx)) => match model.source.select_device(idx) {
            Some((name, true)) => {
                model.config.set_device(&name);
                model.watcher.mark_seen();
            }
            Some((name, false)) => log::warn!("[{}] {} - FAILED", idx, name),
            None => log::warn!("[{}] no such device", idx),
        },
        None => {}
    }
}
