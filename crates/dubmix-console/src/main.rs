//! dubmix: headless live dub mixing console

mod command;
mod config;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use dubmix_core::FrequencyBand;
use dubmix_services::{MeterState, MixEngine};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use command::{parse_command, Command, HELP};
use config::ConsoleConfig;

fn main() -> anyhow::Result<()> {
    let config = config::load_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    info!(config = %config::config_path().display(), "Starting dubmix console");

    let mut engine = MixEngine::new();
    engine.initialize().context("Failed to open audio output")?;
    apply_config(&mut engine, &config);

    if let Some(path) = std::env::args_os().nth(1) {
        load(&mut engine, Path::new(&path));
    }

    println!("{HELP}");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(&mut engine, command),
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
        io::stdout().flush().ok();
    }

    info!("Shutting down");
    Ok(())
}

fn apply_config(engine: &mut MixEngine, config: &ConsoleConfig) {
    for band in FrequencyBand::ALL {
        engine.set_band_gain(band, config.bands.get(band));
    }
    for (index, &gain_db) in config.eq_db.iter().enumerate() {
        engine.set_eq_gain(index, gain_db);
    }
    engine.set_siren_params(config.siren);
    engine.set_delay_params(config.delay);
}

fn load(engine: &mut MixEngine, path: &Path) {
    match engine.load_source(path) {
        Ok(()) => println!("loaded {}", path.display()),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Load failed");
            println!("load failed: {e}");
        }
    }
}

fn execute(engine: &mut MixEngine, command: Command) {
    match command {
        Command::Play => {
            if let Err(e) = engine.play() {
                println!("not playing: {e}");
            }
        }
        Command::Pause => engine.pause(),
        Command::Stop => engine.stop(),
        Command::Gain(band, gain) => engine.set_band_gain(band, gain),
        Command::Mute(band, muted) => engine.set_band_muted(band, muted),
        Command::Eq(index, gain_db) => engine.set_eq_gain(index, gain_db),
        Command::SirenGate(active) => engine.set_siren_active(active),
        Command::Siren(params) => engine.set_siren_params(params),
        Command::Delay(params) => engine.set_delay_params(params),
        Command::SirenModel(model) => engine.set_siren_model(model),
        Command::DelayModel(model) => engine.set_delay_model(model),
        Command::Load(path) => load(engine, &path),
        Command::Meters => print_meters(engine),
        Command::Status => print_status(engine),
        Command::Help => println!("{HELP}"),
        // handled by the input loop
        Command::Quit => {}
    }
}

fn meter_line(label: &str, meter: &MeterState) -> String {
    let clip = if meter.is_clipped() { " CLIP" } else { "" };
    format!(
        "{label:<6} peak {:>6.1} dB  rms {:>6.1} dB{clip}",
        meter.peak_db(),
        meter.rms_db()
    )
}

fn print_meters(engine: &MixEngine) {
    if let Some(master) = engine.master_meter() {
        println!("{}", meter_line("MASTER", &master));
        master.clear_clip();
    }
    for band in FrequencyBand::ALL {
        if let Some(meter) = engine.band_meter(band) {
            println!("{}", meter_line(band.label(), &meter));
        }
    }
}

fn print_status(engine: &MixEngine) {
    let state = if engine.is_playing() { "playing" } else { "stopped" };
    println!(
        "{} {} [{}] device: {} clock: {}",
        state,
        engine.position_label(),
        engine.source_name().unwrap_or("no source"),
        engine.device_name().unwrap_or("none"),
        engine.sample_clock(),
    );
    for band in FrequencyBand::ALL {
        if let Some(bs) = engine.band_state(band) {
            let mute = if bs.muted { " (muted)" } else { "" };
            println!("  {:<6} {:.2}{mute}", band.label(), bs.gain);
        }
    }
    if let Some(gains) = engine.eq_gains() {
        let gains: Vec<String> = gains.iter().map(|g| format!("{g:+.1}")).collect();
        println!("  eq     {}", gains.join(" "));
    }
    if let Some(siren) = engine.siren_params() {
        println!(
            "  siren  {} {:.0} Hz lfo {:.2} Hz level {:.2} [{}]",
            siren.mode,
            siren.frequency_hz,
            siren.lfo_rate_hz,
            siren.level,
            engine.siren_phase()
        );
    }
    if let Some(delay) = engine.delay_params() {
        println!(
            "  delay  {:.2}s fb {:.2} ret {:.2} send {:.2}/{:.2} hp {:.0} lp {:.0}",
            delay.time_secs,
            delay.feedback,
            delay.return_level,
            delay.music_send,
            delay.siren_send,
            delay.highpass_hz,
            delay.lowpass_hz
        );
    }
    if let (Some(siren_model), Some(delay_model)) = (engine.siren_model(), engine.delay_model()) {
        println!("  models {siren_model:?} / {delay_model:?}");
    }
}
