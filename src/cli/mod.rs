//! # CLI Module
//!
//! Command line front end shared by every binary built on this crate. A
//! binary declares its services with an
//! [`ApplicationBuilder`](crate::app::ApplicationBuilder) and hands it to
//! [`run`]:
//!
//! ```rust,ignore
//! fn main() -> anyhow::Result<()> {
//!     tagroute::cli::run(my_services())
//! }
//! ```
//!
//! ## Commands
//!
//! - `serve`: load the configuration and serve it over HTTP
//! - `routes`: print the compiled route table in match order
//! - `check`: build the application and the metadata of every routed
//!   method, reporting the first problem
//!
//! Every command takes `--config <FILE>` (or `TAGROUTE_CONFIG`) and
//! `--env <NAME>` (or `TAGROUTE_ENV`).

mod commands;


pub use commands::{run, run_cli, Cli, Commands, ConfigArgs};
