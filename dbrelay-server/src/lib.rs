//! MCP tool server for dbrelay.
//!
//! Exposes the actions of [`dbrelay_core`] as JSON-RPC 2.0 tools over a
//! line-delimited stream (stdio in production).
//!
//! # Module Structure
//! - `protocol`: JSON-RPC and MCP message types
//! - `tools`: tool registry and argument schemas
//! - `dispatch`: request routing onto core actions
//! - `server`: the concurrent read/dispatch/write loop
//! - `cli`: command-line arguments and environment defaults

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use dispatch::ToolDispatcher;
pub use error::{Result, ServerError};
pub use server::{serve, serve_stdio};
