mod app;
mod config;
mod error;
mod extension;
mod logging;
mod messages;
mod stats;
mod sync_core;
mod welcome;
mod widget;

use app::App;
use config::PanelConfig;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    if let Err(err) = logging::init() {
        web_sys::console::warn_1(&format!("console logging unavailable: {err}").into());
    }
    let config = PanelConfig::from_document();
    logging::set_level(config.level_filter());
    mount_to_body(move || view! { <App config=config /> });
}
