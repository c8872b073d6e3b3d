// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use parley_core::{BufferEditor, ChatPanel, ReplySegment, SubmitOutcome, TranscriptEntry};
use parley_tui::{App, AppOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = parley_config::load(cli.config.as_deref())?;
                println!("{}", toml::to_string_pretty(&config)?);
                return Ok(());
            }
        }
    }

    let mut config = parley_config::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }

    let mut editor = match &cli.file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            BufferEditor::from_text(&text)
        }
        None => BufferEditor::default(),
    };
    if let Some(spec) = &cli.select {
        editor.select(cli::parse_selection(spec)?);
    }

    let backend = parley_model::from_config(&config.model)?;
    let panel = ChatPanel::new(Arc::from(backend), &config.panel, config.model.stream);

    if cli.is_headless() {
        run_headless(cli, panel, editor).await
    } else {
        run_tui(cli, &config, panel, editor).await
    }
}

/// One submit, reply to stdout, exit.  Prose prints as-is; code blocks are
/// re-fenced so the output stays pipeable markdown.
async fn run_headless(
    cli: Cli,
    mut panel: ChatPanel,
    mut editor: BufferEditor,
) -> anyhow::Result<()> {
    let prompt = match cli.prompt {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading prompt from stdin")?;
            buf
        }
    };

    let outcome = panel.submit(&prompt, &mut editor, |_| {}).await;
    match outcome {
        SubmitOutcome::Completed => {
            let reply = panel
                .transcript()
                .iter()
                .rev()
                .find_map(|e| match e {
                    TranscriptEntry::Assistant { segments, .. } => Some(segments),
                    _ => None,
                })
                .expect("completed turn always appends a reply");
            for segment in reply {
                match segment {
                    ReplySegment::Text(t) => println!("{t}\n"),
                    ReplySegment::Code { language, code } => {
                        println!("```{language}\n{code}\n```\n")
                    }
                }
            }
            Ok(())
        }
        SubmitOutcome::RejectedEmpty => anyhow::bail!("empty prompt"),
        SubmitOutcome::Failed | SubmitOutcome::RejectedBusy => {
            anyhow::bail!("request failed, run with -v for details")
        }
    }
}

async fn run_tui(
    cli: Cli,
    config: &parley_config::Config,
    panel: ChatPanel,
    editor: BufferEditor,
) -> anyhow::Result<()> {
    use ratatui::crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
    };

    let terminal = ratatui::init();
    let _ = execute!(std::io::stderr(), EnableMouseCapture);

    let opts = AppOptions {
        panel: config.panel.clone(),
        file: cli.file.clone(),
        initial_prompt: cli.prompt,
    };

    let app = App::new(panel, editor, opts);
    let result = app.run(terminal).await;

    let _ = execute!(std::io::stderr(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
