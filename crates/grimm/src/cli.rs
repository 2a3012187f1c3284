//! Command-line interface handling.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Options that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the application root
    pub root: Option<PathBuf>,
    /// Optional override for the environment name
    pub env: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("grimm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Hierarchical MVC host: loads bundles and serves them over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("grimm.toml"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .help("Application root (contains bundles/, views/, public/, config/)"),
        )
        .arg(
            Arg::new("env")
                .short('e')
                .long("env")
                .value_name("NAME")
                .help("Environment name; selects config/<NAME>.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("grimm.toml")),
            root: matches.get_one::<String>("root").map(PathBuf::from),
            env: matches.get_one::<String>("env").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(&command().get_matches_from(args))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["grimm"]);

        assert_eq!(args.config_path, PathBuf::from("grimm.toml"));
        assert!(args.root.is_none());
        assert!(args.env.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "grimm", "-c", "site.toml", "-r", "/srv/site", "-e", "production", "-l", "debug",
            "--json-logs",
        ]);

        assert_eq!(args.config_path, PathBuf::from("site.toml"));
        assert_eq!(args.root, Some(PathBuf::from("/srv/site")));
        assert_eq!(args.env.as_deref(), Some("production"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }
}
