pub mod api;
pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod map;
pub mod notification;
pub mod state;
pub use error::{AppError, AppResult};

use std::sync::Arc;

use api::HttpShapeApi;
use app::console::{self, ConsoleMap};
use app::{Dispatch, Session};

/// Entrypoint used by the console binary.
pub fn run() -> AppResult<()> {
    logging::init();
    let config = config::load_app_config();
    tracing::info!(api = %config.api_base_url, "starting polydraw");

    match api::imagery_tiles_url(&config) {
        Some(tiles) => tracing::info!(%tiles, "imagery layer source"),
        None => tracing::info!("no imagery layer configured"),
    }
    if let Some(basemap) = &config.basemap_url {
        tracing::info!(%basemap, "basemap layer source");
    }

    let api = Arc::new(HttpShapeApi::new(&config)?);
    let mut session = Session::new(config, ConsoleMap::new(), api.clone(), Dispatch::Background);
    session.mount(api.as_ref());

    let stdin = std::io::stdin();
    console::run(&mut session, stdin.lock(), std::io::stdout())?;

    tracing::info!("session closed with {}", session.coordinator());
    Ok(())
}
