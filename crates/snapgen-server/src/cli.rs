//! Command line
//!
//! ```text
//! snapgen serve  [--config FILE] [--port N] [--public-dir DIR] [--log-file FILE] [--log-format text|json]
//! snapgen replay <PAYLOAD> [same options]
//! ```

use crate::telemetry::LogFormat;
use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use snapgen_core::SnapgenConfig;
use std::path::PathBuf;

fn common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_parser(value_parser!(u16))
                .help("Listening port (default 3000)"),
        )
        .arg(
            Arg::new("public-dir")
                .long("public-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Directory served as static files; snapshots go under snapshot/"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_parser(value_parser!(PathBuf))
                .help("Append operational logs to this file"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .default_value("text")
                .value_parser(value_parser!(LogFormat))
                .help("Log line format"),
        )
}

/// Top-level command
#[must_use]
pub fn command() -> Command {
    Command::new("snapgen")
        .version(snapgen_core::VERSION)
        .about("Commit snapshot generator for W3C specification repositories")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(common_args(
            Command::new("serve").about("Receive push webhooks and store rendered snapshots"),
        ))
        .subcommand(common_args(
            Command::new("replay")
                .about("Run the snapshot pipeline once for a stored push payload")
                .arg(
                    Arg::new("payload")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Push event JSON file"),
                ),
        ))
}

/// Effective settings of a subcommand
#[derive(Debug, Clone)]
pub struct Settings {
    /// Merged configuration
    pub config: SnapgenConfig,
    /// Log line format
    pub log_format: LogFormat,
}

impl Settings {
    /// Load the config file (if any) and apply command line overrides
    ///
    /// # Errors
    /// Fails if the config file cannot be loaded.
    pub fn from_matches(args: &ArgMatches) -> anyhow::Result<Self> {
        let mut config = match args.get_one::<PathBuf>("config") {
            Some(path) => SnapgenConfig::load(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => SnapgenConfig::default(),
        };

        if let Some(port) = args.get_one::<u16>("port") {
            config.port = *port;
        }
        if let Some(dir) = args.get_one::<PathBuf>("public-dir") {
            config.public_dir = dir.clone();
        }
        if let Some(file) = args.get_one::<PathBuf>("log-file") {
            config.log_file = Some(file.clone());
        }

        Ok(Self {
            config,
            log_format: args
                .get_one::<LogFormat>("log-format")
                .copied()
                .unwrap_or_default(),
        })
    }
}
