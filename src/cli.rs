// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchsup`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchsup",
    version,
    about = "Watch a directory and restart supervisord programs on changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory path to watch for changes.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Supervisor program names to restart.
    #[arg(value_name = "PROG")]
    pub programs: Vec<String>,

    /// Supervisor group names to restart.
    #[arg(short = 'g', long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Restart any child of this supervisor.
    #[arg(short = 'a', long)]
    pub any: bool,

    /// Disable functionality if the flag is not set.
    ///
    /// Intended for `--enable %(ENV_FLAG)s` style supervisord config lines,
    /// where the environment decides whether watching is active.
    #[arg(short = 'e', long, value_name = "FLAG")]
    pub enable: Option<i32>,

    /// Disable functionality if the flag is set.
    #[arg(
        long,
        value_name = "FLAG",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub disable: Option<i32>,

    /// Reload the supervisord configuration before restarting.
    #[arg(long)]
    pub reload: bool,

    /// Recognize changes to file paths matching this glob pattern.
    ///
    /// May be given multiple times. Without any pattern every path is
    /// recognized.
    #[arg(short = 'r', long = "recognize", value_name = "PATTERN")]
    pub recognize: Vec<String>,

    /// Ignore changes to file paths matching this glob pattern.
    #[arg(short = 'i', long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Recognize changes to file paths matching this regular expression.
    #[arg(long = "recognize-regex", value_name = "REGEX")]
    pub recognize_regex: Vec<String>,

    /// Ignore changes to file paths matching this regular expression.
    #[arg(long = "ignore-regex", value_name = "REGEX")]
    pub ignore_regex: Vec<String>,

    /// Recognize changes to hidden files.
    #[arg(short = 'f', long = "hidden-files")]
    pub hidden_files: bool,

    /// Case insensitive file path matching.
    #[arg(short = 'c', long = "case-insensitive")]
    pub case_insensitive: bool,

    /// Recognize changes to directories.
    #[arg(short = 'd', long)]
    pub directories: bool,

    /// Don't watch for changes in subdirectories.
    #[arg(long = "no-recursion")]
    pub no_recursion: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHSUP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Whether watching is switched off by the enable/disable toggles.
    ///
    /// `--enable 0` and `--disable <nonzero>` both mean "run idle until a
    /// termination signal arrives".
    pub fn is_disabled(&self) -> bool {
        self.enable == Some(0) || self.disable.unwrap_or(0) != 0
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Run semantic validation against parsed arguments.
///
/// This checks:
/// - `--enable` and `--disable` are not combined
/// - glob patterns and regex patterns are not mixed
/// - exactly one of PROG, `--group`, `--any` selects the restart targets
pub fn validate_args(args: &CliArgs) -> Result<()> {
    if args.enable.is_some() && args.disable.is_some() {
        return Err(anyhow!("argument --enable not allowed with --disable"));
    }

    let has_globs = !args.recognize.is_empty() || !args.ignore.is_empty();
    let has_regexes = !args.recognize_regex.is_empty() || !args.ignore_regex.is_empty();
    if has_globs && has_regexes {
        return Err(anyhow!(
            "arguments --recognize and --ignore not allowed with \
             --recognize-regex and --ignore-regex"
        ));
    }

    if args.any && !args.programs.is_empty() {
        return Err(anyhow!("argument PROG not allowed with --any"));
    }
    if args.any && !args.groups.is_empty() {
        return Err(anyhow!("argument --group not allowed with --any"));
    }
    if !args.programs.is_empty() && !args.groups.is_empty() {
        return Err(anyhow!("argument PROG not allowed with --group"));
    }
    if args.programs.is_empty() && args.groups.is_empty() && !args.any {
        return Err(anyhow!(
            "one of the arguments PROG --group --any is required"
        ));
    }

    Ok(())
}
