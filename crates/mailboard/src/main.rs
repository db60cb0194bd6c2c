//! `mailboard` - read and triage an IMAP mailbox from the terminal.
//!
//! Every subcommand prints the JSON envelope it received on stdout and
//! exits non-zero when the envelope reports failure. Logs go to stderr.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mailboard_core::{Cache, FileStorage, ImapConnector, MailFeed, MailService};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli
        .connection
        .mail_config(|name| std::env::var(name).ok())
        .context("invalid mail configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let feed = MailFeed::new(MailService::from_config(&config), open_cache(&cli));
    let result = run(&feed, cli.command).await;
    feed.service().disconnect().await;

    Ok(if result? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "mailboard=info,mailboard_core=info",
        1 => "mailboard=debug,mailboard_core=debug,mailboard_imap=debug",
        _ => "mailboard=trace,mailboard_core=trace,mailboard_imap=trace,mailboard_mime=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The on-disk cache unless disabled. A directory that cannot be created
/// leaves the cache disabled.
fn open_cache(cli: &Cli) -> Cache {
    if cli.no_cache {
        return Cache::disabled();
    }

    let Some(dir) = cli.cache_dir.clone().or_else(FileStorage::default_location) else {
        tracing::warn!("no cache directory available, caching disabled");
        return Cache::disabled();
    };

    match FileStorage::new(&dir) {
        Ok(storage) => {
            tracing::debug!(dir = %dir.display(), "using file cache");
            Cache::new(Arc::new(storage))
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cache unavailable, caching disabled");
            Cache::disabled()
        }
    }
}

/// Runs one subcommand and prints its result. Returns whether it succeeded.
async fn run(feed: &MailFeed<ImapConnector>, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Folders => {
            let response = feed.folders().await;
            print_json(&response)?;
            Ok(response.success)
        }
        Command::Emails(args) => {
            let response = feed.emails(&args.into()).await;
            print_json(&response)?;
            Ok(response.success)
        }
        Command::Suggest(args) => {
            let response = feed.suggestions(&args.into()).await;
            print_json(&response)?;
            Ok(response.success)
        }
        Command::Read { uid } => report(&feed.mark_as_read(uid).await),
        Command::Unread { uid } => report(&feed.mark_as_unread(uid).await),
        Command::Delete { uid } => report(&feed.delete(uid).await),
        Command::Status => {
            let response = feed.check_connection().await;
            print_json(&response)?;
            Ok(response.success)
        }
        Command::Test => report(&feed.service().test_connection().await),
    }
}

fn report(envelope: &mailboard_core::Envelope<()>) -> anyhow::Result<bool> {
    print_json(envelope)?;
    Ok(envelope.success)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{json}");
    Ok(())
}
