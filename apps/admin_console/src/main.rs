use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use client_core::{
    load_settings, start_user_list, AddUserForm, FormError, ListScreen, UserAdminClient,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod view;

use commands::{parse_command, ConsoleCommand, HELP};
use view::render_snapshot;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Screen {
    Customers,
    Users,
}

impl From<Screen> for ListScreen {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Customers => ListScreen::Customers,
            Screen::Users => ListScreen::Users,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "TicketNest admin list console")]
struct Args {
    /// Backend base URL; overrides config file and environment.
    #[arg(long)]
    server_url: Option<String>,
    /// TOML settings file (defaults to ./ticketnest.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "customers")]
    screen: Screen,
    #[arg(long)]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }
    settings.validate()?;

    let screen = ListScreen::from(args.screen);
    let policy = settings.activity_policy();
    let session = start_user_list(&settings, screen).context("failed to start list session")?;
    let admin = UserAdminClient::from_settings(&settings)?;
    tracing::info!(server_url = %settings.server_url, screen = screen.title(), "console ready");

    let mut snapshots = session.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.model.is_loading() {
                continue;
            }
            println!(
                "{}",
                render_snapshot(screen, &snapshot, &policy, chrono::Utc::now())
            );
        }
    });

    println!("{HELP}");
    let mut form = AddUserForm::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            ConsoleCommand::List(intent) => {
                if session.send(intent).await.is_err() {
                    tracing::error!("list session stopped unexpectedly");
                    break;
                }
            }
            ConsoleCommand::FormField { name, value } => form.set_field(name, value),
            ConsoleCommand::SubmitForm => match admin.add_user(&form).await {
                Ok(redirect) => {
                    println!("user created; returning to {}", redirect.to);
                    form.reset();
                    let _ = session.refresh().await;
                }
                Err(FormError::Validation { field, message }) => {
                    println!("{field} {message}");
                }
                Err(FormError::Fetch(err)) => println!("{}", err.user_message()),
            },
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    session.shutdown().await;
    printer.abort();
    Ok(())
}
