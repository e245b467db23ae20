//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigFormat;

/// Eavesdrop live-reload supervisor CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: .eavesdrop.{json,toml,yaml} in the
    /// working directory)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands; none means "load the config and start watching"
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a default config file
    #[command(visible_alias = "i")]
    Init {
        /// Directory to write the config into
        #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
        out: PathBuf,

        /// Config file format
        #[arg(short, long, default_value = "json")]
        ext: ConfigFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_has_no_command() {
        let cli = Cli::parse_from(["eavesdrop"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_init_defaults() {
        let cli = Cli::parse_from(["eavesdrop", "init"]);
        match cli.command {
            Some(Commands::Init { out, ext }) => {
                assert_eq!(out, PathBuf::from("."));
                assert_eq!(ext, ConfigFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_init_with_format() {
        let cli = Cli::parse_from(["eavesdrop", "init", "--out", "proj", "--ext", "yaml"]);
        match cli.command {
            Some(Commands::Init { out, ext }) => {
                assert_eq!(out, PathBuf::from("proj"));
                assert_eq!(ext, ConfigFormat::Yaml);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::parse_from(["eavesdrop", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
