//! Command-line argument parsing for the FHIR query builder
//!
//! This module defines the CLI structure using clap derive macros: server
//! listing, capability inspection, parameter discovery, and query building.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::{Include, SortOption};

/// FHIR Query Builder - build and run search queries against FHIR servers
#[derive(Parser, Debug)]
#[command(
    name = "fhir_query_builder",
    version,
    about = "Build FHIR search queries from what a server says it supports",
    long_about = "Reads a FHIR server's capability statement, shows the search parameters it
declares for each resource type, and compiles and optionally runs search queries."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered servers
    Servers,

    /// Show a server's capability statement summary
    Capabilities(CapabilitiesArgs),

    /// List the search parameters a server declares for a resource type
    Params(ParamsArgs),

    /// Compile a search query and optionally run it
    Query(QueryArgs),

    /// Write the default configuration file
    Init,
}

/// Arguments for the capabilities command
#[derive(Args, Debug, Clone)]
pub struct CapabilitiesArgs {
    /// Server id or name (defaults to the first configured server)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Ignore the cached statement and fetch again
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the params command
#[derive(Args, Debug, Clone)]
pub struct ParamsArgs {
    /// Server id or name (defaults to the first configured server)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Resource type, e.g. Patient
    #[arg(short, long)]
    pub resource: String,
}

/// Arguments for the query command
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Server id or name (defaults to the first configured server)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Resource type, e.g. Patient
    #[arg(short, long)]
    pub resource: String,

    /// Search criterion; a value like `ge|1990-01-01` carries a comparison prefix
    #[arg(
        short,
        long = "param",
        value_name = "NAME[:MODIFIER]=VALUE",
        value_parser = parse_param
    )]
    pub params: Vec<ParamArg>,

    /// Include referenced resources
    #[arg(long, value_name = "RESOURCE:PARAM", value_parser = parse_include)]
    pub include: Vec<Include>,

    /// Include resources that reference the matches
    #[arg(long, value_name = "RESOURCE:PARAM", value_parser = parse_include)]
    pub revinclude: Vec<Include>,

    /// Sort key; prefix with `-` for descending
    #[arg(
        long,
        value_name = "[-]PARAM",
        value_parser = parse_sort,
        allow_hyphen_values = true
    )]
    pub sort: Vec<SortOption>,

    /// Page size
    #[arg(long)]
    pub count: Option<u32>,

    /// Number of matches to skip
    #[arg(long)]
    pub offset: Option<u32>,

    /// Run the query instead of only printing its URL
    #[arg(short, long)]
    pub execute: bool,

    /// Print the result bundle as JSON
    #[arg(long, requires = "execute")]
    pub raw: bool,
}

/// One `--param` value before catalog resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamArg {
    pub name: String,
    pub modifier: Option<String>,
    pub value: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether any verbosity flag was given
    pub fn has_verbosity_flag(&self) -> bool {
        self.global.quiet || self.global.very_verbose || self.global.verbose
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

fn parse_param(raw: &str) -> Result<ParamArg, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME[:MODIFIER]=VALUE, got '{}'", raw))?;
    let (name, modifier) = match key.split_once(':') {
        Some((name, modifier)) => (name, Some(modifier.to_string())),
        None => (key, None),
    };
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    Ok(ParamArg {
        name: name.to_string(),
        modifier: modifier.filter(|m| !m.is_empty()),
        value: value.to_string(),
    })
}

fn parse_include(raw: &str) -> Result<Include, String> {
    Include::parse(raw).ok_or_else(|| format!("expected RESOURCE:PARAM, got '{}'", raw))
}

fn parse_sort(raw: &str) -> Result<SortOption, String> {
    SortOption::parse(raw).ok_or_else(|| format!("expected [-]PARAM, got '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("birthdate=ge|1990-01-01").unwrap(),
            ParamArg {
                name: "birthdate".to_string(),
                modifier: None,
                value: "ge|1990-01-01".to_string(),
            }
        );

        let exact = parse_param("name:exact=John=Smith").unwrap();
        assert_eq!(exact.name, "name");
        assert_eq!(exact.modifier.as_deref(), Some("exact"));
        assert_eq!(exact.value, "John=Smith");

        assert!(parse_param("name").is_err());
        assert!(parse_param("=value").is_err());
    }

    #[test]
    fn test_query_command_parsing() {
        let cli = Cli::try_parse_from([
            "fhir_query_builder",
            "query",
            "--server",
            "hapi",
            "--resource",
            "Observation",
            "-p",
            "code=1234-5",
            "--include",
            "Observation:subject",
            "--sort",
            "-date",
            "--count",
            "20",
        ])
        .unwrap();

        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.server.as_deref(), Some("hapi"));
        assert_eq!(args.resource, "Observation");
        assert_eq!(args.params.len(), 1);
        assert_eq!(args.include, vec![Include::new("Observation", "subject")]);
        assert_eq!(args.sort, vec![SortOption::descending("date")]);
        assert_eq!(args.count, Some(20));
        assert!(!args.execute);
    }

    #[test]
    fn test_raw_requires_execute() {
        let result = Cli::try_parse_from([
            "fhir_query_builder",
            "query",
            "--resource",
            "Patient",
            "--raw",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: true,
                config: None,
            },
            command: Commands::Servers,
        };

        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                very_verbose: false,
                quiet: false,
                config: None,
            },
            command: Commands::Servers,
        };

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
        assert!(cli_verbose.has_verbosity_flag());
    }
}
