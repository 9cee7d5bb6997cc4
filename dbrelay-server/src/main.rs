//! dbrelay: database actions for tool-calling clients over stdio.
//!
//! # Security Guarantees
//! - Identifiers are validated and values bound, never interpolated
//! - No credentials logged or echoed in responses
//! - Protocol frames on stdout only; logs go to stderr

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dbrelay_core::{ConnectionManager, DatabaseActions, SqlxConnectionFactory, init_logging};
use dbrelay_server::cli::{Cli, Command};
use dbrelay_server::tools::{initialize_validators, tool_definitions};
use dbrelay_server::{ToolDispatcher, serve_stdio};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;
    initialize_validators().context("Failed to initialize tool schemas")?;

    match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Tools => {
            let listing = serde_json::to_string_pretty(&tool_definitions())
                .context("Failed to encode tool registry")?;
            println!("{}", listing);
            Ok(())
        }
        Command::Serve => {
            let defaults = cli.database.to_db_config();
            info!(
                "Query timeout {}s, default driver {}",
                cli.query_timeout,
                defaults.driver.map_or_else(|| "unset".to_string(), |d| d.to_string())
            );

            let manager = Arc::new(ConnectionManager::new(Arc::new(SqlxConnectionFactory)));
            let actions =
                DatabaseActions::new(manager, defaults).with_query_timeout(cli.query_timeout());
            serve_stdio(Arc::new(ToolDispatcher::new(actions)))
                .await
                .context("Protocol stream failed")?;
            Ok(())
        }
    }
}
