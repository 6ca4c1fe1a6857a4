//! sotto — terminal live speech-to-text.

mod app;
mod audio;
mod clipboard;
mod commands;
mod config;
mod engine;
mod logging;
mod session;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
