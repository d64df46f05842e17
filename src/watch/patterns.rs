// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};

/// Glob pattern appended to the ignore list when hidden paths are ignored.
const HIDDEN_GLOB: &str = "*/.*";

/// Regex appended to the ignore list when hidden paths are ignored.
const HIDDEN_REGEX: &str = r".*/\..*";

/// Raw filter configuration as it comes from the CLI.
///
/// `recognize` / `ignore` are interpreted as globs in glob mode and as
/// regular expressions in regex mode; the two modes are mutually exclusive
/// and CLI validation rejects mixing them.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub recognize: Vec<String>,
    pub ignore: Vec<String>,
    pub use_regex: bool,
    pub ignore_hidden: bool,
    pub case_sensitive: bool,
}

/// Compiled recognize/ignore patterns applied to changed paths.
///
/// Paths are matched as full path strings with forward slashes, mirroring
/// how the watcher hands them over. An empty recognize set matches
/// everything.
pub enum ChangeFilter {
    Glob {
        recognize: Option<GlobSet>,
        ignore: GlobSet,
    },
    Regex {
        recognize: Vec<Regex>,
        ignore: Vec<Regex>,
    },
}

impl fmt::Debug for ChangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            ChangeFilter::Glob { .. } => "glob",
            ChangeFilter::Regex { .. } => "regex",
        };
        f.debug_struct("ChangeFilter").field("mode", &mode).finish()
    }
}

impl ChangeFilter {
    /// Compile a filter from raw options.
    ///
    /// Fails on an invalid glob or regular expression; pattern errors are a
    /// startup problem, not something to discover at event time.
    pub fn new(options: &FilterOptions) -> Result<Self> {
        if options.use_regex {
            Self::build_regex(options)
        } else {
            Self::build_glob(options)
        }
    }

    fn build_glob(options: &FilterOptions) -> Result<Self> {
        let recognize = if options.recognize.is_empty() {
            None
        } else {
            Some(build_globset(&options.recognize, options.case_sensitive)?)
        };

        let mut ignore = options.ignore.clone();
        if options.ignore_hidden {
            ignore.push(HIDDEN_GLOB.to_string());
        }
        let ignore = build_globset(&ignore, options.case_sensitive)?;

        Ok(ChangeFilter::Glob { recognize, ignore })
    }

    fn build_regex(options: &FilterOptions) -> Result<Self> {
        let recognize = build_regexes(&options.recognize, options.case_sensitive)?;

        let mut ignore = options.ignore.clone();
        if options.ignore_hidden {
            ignore.push(HIDDEN_REGEX.to_string());
        }
        let ignore = build_regexes(&ignore, options.case_sensitive)?;

        Ok(ChangeFilter::Regex { recognize, ignore })
    }

    /// Returns true if a change to `path` should trigger a restart cycle.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ChangeFilter::Glob { recognize, ignore } => {
                let recognized = match recognize {
                    Some(set) => set.is_match(path),
                    None => true,
                };
                recognized && !ignore.is_match(path)
            }
            ChangeFilter::Regex { recognize, ignore } => {
                let recognized =
                    recognize.is_empty() || recognize.iter().any(|re| re.is_match(path));
                recognized && !ignore.iter().any(|re| re.is_match(path))
            }
        }
    }
}

/// Build a GlobSet from simple string patterns.
///
/// `literal_separator` stays off so `*` crosses `/`, matching full paths the
/// way shell-style filename patterns traditionally do.
fn build_globset(patterns: &[String], case_sensitive: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .case_insensitive(!case_sensitive)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn build_regexes(patterns: &[String], case_sensitive: bool) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pat| {
            RegexBuilder::new(pat)
                .case_insensitive(!case_sensitive)
                .build()
                .with_context(|| format!("invalid regular expression: {pat}"))
        })
        .collect()
}
