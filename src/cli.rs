// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use parley_core::{Position, Range};

#[derive(Parser, Debug)]
#[command(
    name = "parley",
    about = "An assistant chat panel for code editors",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Initial message.  In the TUI it is submitted on startup; in headless
    /// mode it is the one message of the run.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Run headless (no TUI); prints the reply to stdout
    #[arg(long, short = 'H')]
    pub headless: bool,

    /// File backing the editor buffer: attached as context and the target of
    /// code inserts (written back on insert)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Pre-select a region of the file before the first message,
    /// as LINE:COL-LINE:COL with 1-based lines and columns
    #[arg(long, value_name = "RANGE", requires = "file")]
    pub select: Option<String>,

    /// Model name override, e.g. "gpt-4o"
    #[arg(long, short = 'M', env = "PARLEY_MODEL")]
    pub model: Option<String>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit
    ShowConfig,
}

impl Cli {
    /// Returns true if the run should be headless.
    /// Headless is triggered by --headless or when stdin is not a terminal.
    pub fn is_headless(&self) -> bool {
        self.headless || !std::io::stdin().is_terminal()
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "parley", &mut std::io::stdout());
}

/// Parse a `--select` spec like `3:1-5:12` into an editor range.
/// Lines and columns are 1-based on the command line.
pub fn parse_selection(spec: &str) -> anyhow::Result<Range> {
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("expected LINE:COL-LINE:COL, got {spec:?}"))?;
    Ok(Range::new(parse_position(start)?, parse_position(end)?))
}

fn parse_position(spec: &str) -> anyhow::Result<Position> {
    let (line, col) = spec
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected LINE:COL, got {spec:?}"))?;
    let line: usize = line.trim().parse()?;
    let col: usize = col.trim().parse()?;
    anyhow::ensure!(line > 0 && col > 0, "lines and columns start at 1");
    Ok(Position::new(line - 1, col - 1))
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_spec_parses_to_zero_based_range() {
        let r = parse_selection("3:1-5:12").unwrap();
        assert_eq!(r.start, Position::new(2, 0));
        assert_eq!(r.end, Position::new(4, 11));
    }

    #[test]
    fn selection_spec_rejects_malformed_input() {
        assert!(parse_selection("3:1").is_err());
        assert!(parse_selection("a:b-c:d").is_err());
        assert!(parse_selection("0:1-2:2").is_err(), "lines are 1-based");
    }
}
