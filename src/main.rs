mod config;
mod controller;
mod core;
mod engine;
mod highlight;
mod imgui_renderer;
mod info_text;
mod logging;
mod material;
mod mesh;
mod orbit;
mod picking;
mod popup;
mod scene;
mod starfield;
mod ui;

use config::{AppConfig, DEFAULT_CONFIG_PATH};
use engine::Engine;
use logging::LoggingConfig;

fn main() -> anyhow::Result<()> {
    logging::init_logging(LoggingConfig::default());

    // Optional first argument: path to the scene config
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_or_default(&config_path);

    log::info!("starting {}", config.window.title);
    let engine = Engine::new(config)?;
    engine.run()?;
    log::info!("shutdown complete");
    Ok(())
}
