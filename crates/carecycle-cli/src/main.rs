use std::sync::Arc;

use carecycle_core::db;
use carecycle_core::error::CoreError;
use carecycle_core::repository::SqliteRepository;
use chrono::Local;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARECYCLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "invalid configuration, using defaults");
            config::Config::default()
        }
    };

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let repository = Arc::new(SqliteRepository::new(db_pool, config.queue_config()));

    let ctx = commands::Context {
        json: cli.json || config.json,
        today: Local::now().date_naive(),
        config,
    };

    let result = match cli.command {
        cli::Commands::Item(command) => commands::item::item_command(&*repository, command, &ctx).await,
        cli::Commands::Recur(command) => commands::recur::recur_command(&*repository, command, &ctx).await,
        cli::Commands::Do(command) => commands::r#do::do_item(&*repository, command, &ctx).await,
        cli::Commands::Process(command) => {
            commands::process::process_events(Arc::clone(&repository), command, &ctx).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(items) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in items {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::Validation(field_errors) => {
                eprintln!("{}", "Error: Invalid recurrence rule.".style(error_style));
                for field_error in field_errors {
                    eprintln!("  {} {}", field_error.field.yellow(), field_error.message);
                }
            }
            CoreError::RuleAlreadyExists(id) => {
                eprintln!(
                    "{} Item {} already repeats; use 'recur set' on it to change the rule",
                    "Error:".style(error_style),
                    id.yellow()
                );
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
