//! Command-line interface components
//!
//! This module contains CLI-specific code for the FHIR query builder,
//! including argument parsing and command handlers.

pub mod args;
pub mod commands;

pub use args::{CapabilitiesArgs, Cli, Commands, GlobalArgs, ParamArg, ParamsArgs, QueryArgs};
pub use commands::{handle_capabilities, handle_init, handle_params, handle_query, handle_servers};
