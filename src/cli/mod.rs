use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::calendar::{CalendarProvider, LocalZone};
use crate::core::AppConfig;
use crate::google::{CredentialStore, GoogleCalendar};

pub mod auth;
pub mod chat;
pub mod slots;

#[derive(Subcommand)]
enum Command {
    /// Start an interactive booking session
    Chat {},
    /// Authorize access to Google Calendar and save the token
    Auth {},
    /// List free 1-hour slots between two times without the model
    Slots {
        /// Start of the window, e.g. 2025-03-10T09:00:00
        #[arg(long)]
        start: String,
        /// End of the window, e.g. 2025-03-10T17:00:00
        #[arg(long)]
        end: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    // Logs go to stderr so they don't interleave with the chat
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The configured calendar and the zone naive times are read in.
pub fn calendar_from_config(config: &AppConfig) -> Result<(Arc<dyn CalendarProvider>, LocalZone)> {
    let zone = LocalZone::from_name(config.timezone.as_deref())?;
    let credentials = CredentialStore::new(&config.token_path, &config.credentials_path);
    let calendar = GoogleCalendar::new(
        &config.google_api_base_url,
        &config.calendar_id,
        credentials,
        zone.clone(),
    );
    Ok((Arc::new(calendar), zone))
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();
    let config = AppConfig::default();

    match args.command {
        Some(Command::Chat {}) => {
            chat::run(&config).await?;
        }
        Some(Command::Auth {}) => {
            auth::run(&config).await?;
        }
        Some(Command::Slots { start, end }) => {
            slots::run(&config, &start, &end).await?;
        }
        None => {}
    }

    Ok(())
}
