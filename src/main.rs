mod api;
mod app;
mod config;
mod messages;
mod services;
mod shortcuts;
mod status;
mod terminal;

use app::App;
use config::Config;
use status::StatusLine;
use terminal::CbreakGuard;

use anyhow::Result;
use std::os::fd::AsRawFd;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let status = StatusLine::stdout();

    // Initialize tracing; events are printed above the status line
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(status.clone())
        .with_target(false)
        .init();

    let config = Config::default();
    config.validate()?;

    // Restores the terminal when dropped, including on early return
    let guard = CbreakGuard::enable(std::io::stdin().as_raw_fd())?;

    let app = App::new(config, status.clone())?;

    tokio::select! {
        result = app.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Received Ctrl+C, shutting down");
        }
    }

    drop(guard);
    status.finish();
    status.println("Bye!");
    Ok(())
}
