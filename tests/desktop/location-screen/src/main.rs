//! Desktop harness for the geokit location screen.
//!
//! Run with: cargo run -p geokit-location-screen-test -- fetch
//!       or: cargo run -p geokit-location-screen-test -- watch --updates 3

use std::time::Duration;

use anyhow::{Result, bail};
use async_channel::Sender;
use clap::{Parser, Subcommand};
use geokit_location::SystemPositionSource;
use geokit_notification::SystemToasts;
use geokit_permission::SystemPermissionGate;
use geokit_screen::{Intent, LocationScreen, Outcome, ScreenConfig, ScreenView};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "location-screen")]
#[command(about = "Drive the location screen against the real platform", long_about = None)]
struct Cli {
    /// One-shot timeout in milliseconds
    #[arg(long, default_value_t = 15_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single position
    Fetch,
    /// Track the device until enough updates arrive
    Watch {
        /// Number of updates to print before stopping
        #[arg(long, default_value_t = 3)]
        updates: usize,
    },
}

fn print_view(view: &ScreenView) {
    println!(
        "[fetch:{} start:{} stop:{} loading:{}]",
        view.fetch_enabled, view.start_enabled, view.stop_enabled, view.loading
    );
    println!("{}\n", view.body);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = ScreenConfig::default();
    config.one_shot = config.one_shot.with_timeout(Duration::from_millis(cli.timeout_ms));

    let mut screen = LocationScreen::with_config(
        SystemPermissionGate::new(),
        SystemPositionSource::new(),
        SystemToasts::new(),
        config,
    );

    println!("=== Geokit Location Screen ===\n");
    print_view(&screen.view());

    match cli.command {
        Commands::Fetch => {
            if screen.fetch_once().await == Outcome::PermissionRefused {
                bail!("location permission refused");
            }
            print_view(&screen.view());
        }
        Commands::Watch { updates } => watch(&mut screen, updates).await?,
    }

    println!("=== Done ===");
    Ok(())
}

async fn watch(
    screen: &mut LocationScreen<SystemPermissionGate, SystemPositionSource, SystemToasts>,
    updates: usize,
) -> Result<()> {
    if screen.start_continuous_updates().await == Outcome::PermissionRefused {
        bail!("location permission refused");
    }
    if !screen.state().updates_enabled() {
        print_view(&screen.view());
        bail!("platform refused to start tracking");
    }

    let states = screen.observe();
    let (intents, inbox) = async_channel::unbounded();

    let printer = async move {
        let mut seen = 0;
        while let Ok(state) = states.recv().await {
            print_view(&state.view());
            if !state.updates_enabled() {
                break;
            }
            if state.location.is_some() {
                seen += 1;
            }
            if seen >= updates {
                info!("{seen} updates received, stopping");
                request_stop(&intents).await;
                break;
            }
        }
    };

    tokio::join!(screen.run(inbox), printer);
    Ok(())
}

/// Ask the running screen to stop tracking. Returns whether it was listening.
async fn request_stop(intents: &Sender<Intent>) -> bool {
    match intents.send(Intent::StopUpdates).await {
        Ok(()) => true,
        Err(err) => {
            warn!("stop intent not delivered: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_reaches_a_listening_screen() {
        let (intents, inbox) = async_channel::unbounded();
        assert!(request_stop(&intents).await);
        assert_eq!(inbox.try_recv(), Ok(Intent::StopUpdates));
    }

    #[tokio::test]
    async fn stop_to_a_finished_screen_is_reported() {
        let (intents, inbox) = async_channel::unbounded();
        drop(inbox);
        assert!(!request_stop(&intents).await);
    }
}
