// What you SEE:
// • Live camera is always the base image.
// • Detected nails are tinted with the polish colour; edges are feathered.
// • S segments once, Space toggles real-time segmentation, [ ] change its cadence.
// • C cycles colours, Up/Down intensity, G/H gloss, M/N metallic, X clears. ESC quits.

use clap::Parser;
use nail_preview::config::Config;
use nail_preview::error::Error;
use nail_preview::session::Session;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate()?;

    // Scheduler trigger and segmentation rounds run here; the window stays on the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("segmentation")
        .enable_all()
        .build()?;

    let mut session = Session::start(&config, runtime.handle().clone()).inspect_err(|e| error!("{e}"))?;
    let result = session.run();
    session.shutdown();
    runtime.shutdown_background();

    result.inspect_err(|e| error!("{e}"))
}
