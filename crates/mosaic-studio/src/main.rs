//! Mosaic studio: an interactive viewer for the tile renderers.
//!
//! Keys: `Tab` toggles the debug-index view, `S` switches its fragment mode,
//! `U` toggles sprite UV output, `+`/`-` zoom, `Esc` quits.

mod app;
mod scene;

use anyhow::Result;
use mosaic_engine::device::GpuInit;
use mosaic_engine::logging::{LoggingConfig, init_logging};
use mosaic_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use app::{Options, Studio};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let options = Options::parse(std::env::args().skip(1));
    log::info!("starting mosaic studio: {options:?}");

    let studio = Studio::new(options)?;
    let config = RuntimeConfig {
        title: "Mosaic Studio".to_string(),
        initial_size: LogicalSize::new(1024.0, 768.0),
    };
    Runtime::run(config, GpuInit::default(), studio)
}
