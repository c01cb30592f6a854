//! lightbench: a cube and a floor under one switchable light.
//!
//! - winit 0.30 window and event loop
//! - wgpu forward renderer with depth-map shadows and contact shadows
//! - egui toolbar, controls panel and stats overlay
//!
//! Pick the light kind from the toolbar and tune it live in the panel.

mod app;
mod config;
mod render;
mod scene;
mod ui;

fn main() {
    if let Err(err) = app::run() {
        log::error!("lightbench failed: {err}");
        std::process::exit(1);
    }
}
