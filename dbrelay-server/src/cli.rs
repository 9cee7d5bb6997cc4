//! Command-line interface.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dbrelay_core::{DbConfig, Driver};

#[derive(Debug, Parser)]
#[command(name = "dbrelay")]
#[command(about = "Database tool server speaking MCP over stdio")]
#[command(version)]
#[command(long_about = "
dbrelay - database actions for tool-calling clients

Reads JSON-RPC requests from stdin and writes responses to stdout. Logs go
to stderr.

SAFETY:
- Table and column names are validated before use
- Values are always bound as parameters
- UPDATE and DELETE require a WHERE condition
- Passwords are never logged or echoed

DEFAULT CONNECTION SETTINGS:
  DB_DRIVER, DB_HOST, DB_PORT, DB_DATABASE, DB_USER, DB_PASSWORD

EXAMPLES:
  DB_DRIVER=sqlite DB_DATABASE=app.db dbrelay
  dbrelay tools
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub database: DatabaseDefaults,

    /// Query timeout in seconds
    #[arg(
        long,
        env = "DBRELAY_QUERY_TIMEOUT",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds to wait for a single database round trip"
    )]
    pub query_timeout: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve tool calls on stdio (default)
    Serve,
    /// Print the tool registry as JSON and exit
    Tools,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Fallback connection settings for `dbConfig` and `connect_database`.
#[derive(Debug, Args)]
pub struct DatabaseDefaults {
    #[arg(long = "db-driver", env = "DB_DRIVER", help = "Default driver (mysql, postgres, sqlite)")]
    pub driver: Option<Driver>,

    #[arg(long = "db-host", env = "DB_HOST", help = "Default database host")]
    pub host: Option<String>,

    #[arg(long = "db-port", env = "DB_PORT", help = "Default database port")]
    pub port: Option<u16>,

    #[arg(long = "db-database", env = "DB_DATABASE", help = "Default database name or SQLite path")]
    pub database: Option<String>,

    #[arg(long = "db-user", env = "DB_USER", help = "Default database user")]
    pub user: Option<String>,

    #[arg(
        long = "db-password",
        env = "DB_PASSWORD",
        hide_env_values = true,
        help = "Default database password (prefer the environment variable)"
    )]
    pub password: Option<String>,
}

impl DatabaseDefaults {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            driver: self.driver,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}
