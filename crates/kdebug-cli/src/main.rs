//! Interactive line-oriented fallback debugger. The pane layout and full
//! curses-style rendering are out of scope; this binary drives the engine
//! through [`kdebug_engine::EngineProcess`] and reprints a plain-text tree
//! view and the selected node's configuration on every change, using
//! `crossterm` purely for raw-mode key capture.

mod view;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::{cursor, execute, queue};

use kdebug_engine::{read_debug_log, EngineProcess, ProcessError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Interactive terminal debugger for the proof engine's interactive session.
#[derive(Debug, Parser)]
#[command(name = "kdebug", version)]
struct Args {
    /// Where every byte sent to and received from the engine is recorded
    #[arg(long, default_value = "debug.log")]
    debug_log: PathBuf,
    /// The engine command and its arguments, e.g. `kdebug -- kore-repl spec.k`
    #[arg(trailing_var_arg = true, required = true)]
    engine_argv: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Tree,
    Konfig,
}

fn main() -> ExitCode {
    let filter = std::env::var("KDEBUG_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(filter)).init();

    let args = Args::parse();

    match run(&args) {
        Ok(status) if status.success() => ExitCode::SUCCESS,
        Ok(status) => {
            eprintln!("engine exited with {status}");
            if let Ok(lines) = read_debug_log(&args.debug_log) {
                for line in lines.iter().rev().take(40).collect::<Vec<_>>().into_iter().rev() {
                    eprintln!("{line}");
                }
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<std::process::ExitStatus, CliError> {
    let process = EngineProcess::spawn(&args.engine_argv, &args.debug_log)?;
    let ui_result = run_ui(&process);
    if let Err(err) = &ui_result {
        eprintln!("error: {err}");
    }
    let status = process.wait()?;
    ui_result?;
    Ok(status)
}

/// Enters raw mode and the alternate screen, runs the key/redraw loop until
/// F10 or the engine dies, then always restores the terminal on the way out.
fn run_ui(process: &EngineProcess) -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen, cursor::Hide)?;
    let result = key_loop(process);
    let _ = execute!(io::stdout(), cursor::Show, crossterm::terminal::LeaveAlternateScreen);
    let _ = disable_raw_mode();
    result
}

/// Polls for key input on a short tick and redraws every tick, since the
/// bus-backed [`EngineProcess::wait_for_tree_change`] blocks indefinitely
/// and has no way to be woken by "the user asked to quit" — that signal
/// stays reserved for a future push-driven UI with its own dispatch thread.
fn key_loop(process: &EngineProcess) -> io::Result<()> {
    let mut selected: u64 = 0;
    let mut focus = Focus::Tree;
    let mut konfig_scroll: usize = 0;

    redraw(process, selected, focus, konfig_scroll)?;

    while process.life().is_alive() {
        if !event::poll(Duration::from_millis(100))? {
            redraw(process, selected, focus, konfig_scroll)?;
            continue;
        }
        let TermEvent::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ids = {
            let scheduler = process.scheduler().lock().expect("scheduler mutex poisoned");
            let graph = process.graph().lock().expect("graph mutex poisoned");
            view::tree_lines(scheduler.tree(), &graph).into_iter().map(|(id, _)| id).collect::<Vec<_>>()
        };
        let current_index = ids.iter().position(|&id| id == selected).unwrap_or(0);
        let previous_selected = selected;

        match key.code {
            KeyCode::F(10) => break,
            KeyCode::F(9) => {}
            KeyCode::Tab => focus = Focus::Konfig,
            KeyCode::BackTab => focus = Focus::Tree,
            KeyCode::Up if focus == Focus::Tree => {
                if let Some(&id) = current_index.checked_sub(1).and_then(|i| ids.get(i)) {
                    selected = id;
                    konfig_scroll = 0;
                }
            }
            KeyCode::Down if focus == Focus::Tree => {
                if let Some(&id) = ids.get(current_index + 1) {
                    selected = id;
                    konfig_scroll = 0;
                }
            }
            KeyCode::PageUp if focus == Focus::Tree => {
                let idx = current_index.saturating_sub(10);
                selected = ids.get(idx).copied().unwrap_or(selected);
                konfig_scroll = 0;
            }
            KeyCode::PageDown if focus == Focus::Tree => {
                let idx = (current_index + 10).min(ids.len().saturating_sub(1));
                selected = ids.get(idx).copied().unwrap_or(selected);
                konfig_scroll = 0;
            }
            KeyCode::Home if focus == Focus::Tree => {
                selected = ids.first().copied().unwrap_or(selected);
                konfig_scroll = 0;
            }
            KeyCode::End if focus == Focus::Tree => {
                selected = ids.last().copied().unwrap_or(selected);
                konfig_scroll = 0;
            }
            KeyCode::Up if focus == Focus::Konfig => konfig_scroll = konfig_scroll.saturating_sub(1),
            KeyCode::Down if focus == Focus::Konfig => konfig_scroll += 1,
            KeyCode::Char(' ') => {
                let mut scheduler = process.scheduler().lock().expect("scheduler mutex poisoned");
                let _ = scheduler.toggle_collapsed(selected);
            }
            _ => continue,
        }

        if selected != previous_selected {
            let has_konfig = process
                .scheduler()
                .lock()
                .expect("scheduler mutex poisoned")
                .tree()
                .find_node(selected)
                .is_some_and(|n| n.configuration().is_some());
            if !has_konfig {
                process.request_konfig(selected);
            }
        }

        redraw(process, selected, focus, konfig_scroll)?;
    }

    Ok(())
}

/// Default configuration column budget (original hardcodes 30 in its demo;
/// the shipped tool takes terminal width, with this as the no-terminal fallback).
const DEFAULT_COLUMN_BUDGET: usize = 100;

fn redraw(process: &EngineProcess, selected: u64, focus: Focus, konfig_scroll: usize) -> io::Result<()> {
    let column_budget =
        crossterm::terminal::size().map(|(cols, _)| cols as usize).unwrap_or(DEFAULT_COLUMN_BUDGET);
    let (tree_text, konfig_text) = {
        let scheduler = process.scheduler().lock().expect("scheduler mutex poisoned");
        let graph = process.graph().lock().expect("graph mutex poisoned");
        let tree = scheduler.tree();
        (view::tree_lines(tree, &graph), view::konfig_lines(tree, selected, column_budget))
    };

    let mut out = io::stdout();
    queue!(out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
    for (id, line) in &tree_text {
        let marker = if *id == selected { ">" } else { " " };
        queue!(out, crossterm::style::Print(format!("{marker}{line}\r\n")))?;
    }
    queue!(out, crossterm::style::Print("\r\n-- configuration --\r\n"))?;
    for line in konfig_text.iter().skip(konfig_scroll) {
        queue!(out, crossterm::style::Print(format!("{line}\r\n")))?;
    }
    let focus_label = match focus {
        Focus::Tree => "tree",
        Focus::Konfig => "konfig",
    };
    queue!(out, crossterm::style::Print(format!("\r\n[focus: {focus_label}] F9-Repaint F10-Quit\r\n")))?;
    out.flush()
}
