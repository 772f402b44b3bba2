// repl.rs

use std::io::{self, BufRead, StdinLock};
use std::sync::Arc;
use anyhow::Context as _;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use crate::builtins;
use crate::completion::ShellHelper;
use crate::config::{EditMode, ShellConfig};
use crate::error::Result;
use crate::expand::expand;
use crate::history::HistoryStore;
use crate::parser::build;
use crate::pipeline::{execute, ExitStatus, Reaper};
use crate::prompt;
use crate::signals::{ActiveProcess, InterruptWatcher};
use crate::tokenizer::WHITESPACE;
use crate::util::report;
use nix::sys::signal::Signal;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineOutcome {
    Continue,
    Exit(i32),
}

/// Shell state that outlives a single line.
pub struct Shell {
    config: ShellConfig,
    history: HistoryStore,
    active: Arc<ActiveProcess>,
    reaper: Reaper,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Result<Self> {
        let history = HistoryStore::new(config.history_capacity)?;
        Ok(Self {
            config,
            history,
            active: Arc::new(ActiveProcess::new()),
            reaper: Reaper::new(),
        })
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn active(&self) -> Arc<ActiveProcess> {
        Arc::clone(&self.active)
    }

    /// Interior pipeline stages not yet reaped.
    pub fn pending_stages(&self) -> usize {
        self.reaper.pending()
    }

    pub fn next_command_number(&self) -> u64 {
        self.history.last_sequence_number() + 1
    }

    /// Expands, records and runs one newline-stripped input line.
    pub fn run_line(&mut self, line: &str) -> LineOutcome {
        log::debug!("input: {:?}", line);
        self.reaper.reap();
        if let Some(code) = builtins::exit_request(line) {
            return LineOutcome::Exit(code);
        }
        if line.trim_matches(WHITESPACE).is_empty() {
            return LineOutcome::Continue;
        }

        let expanded = expand(line, &self.history, self.config.prefix_scope);
        log::debug!("expanded: {:?}", expanded);
        let is_history = builtins::is_history_command(&expanded);
        if !is_history && !expanded.trim().is_empty() {
            self.history.add(expanded.as_str());
        }
        if is_history {
            builtins::run_history(&expanded, &self.history, io::stdout());
            return LineOutcome::Continue;
        }

        let pipeline = match build(&expanded, self.config.max_args) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                report(&err);
                return LineOutcome::Continue;
            }
        };
        for (i, node) in pipeline.nodes().iter().enumerate() {
            log::debug!("stage {}: {}", i + 1, node);
        }
        if pipeline.first().program() == Some("cd") {
            builtins::change_directory(&pipeline.first().argv[1..]);
            return LineOutcome::Continue;
        }
        if pipeline.is_blank() {
            return LineOutcome::Continue;
        }

        match execute(&pipeline, &self.active, &mut self.reaper) {
            Ok(Some(status)) => {
                log::debug!("pipeline finished: {}", status);
                match status {
                    ExitStatus::Signaled(Signal::SIGINT) => eprintln!(),
                    ExitStatus::Signaled(_) => eprintln!("[{}]", status),
                    ExitStatus::Exited(_) => {}
                }
            }
            Ok(None) => log::debug!("pipeline had no terminal command"),
            Err(err) => report(&err),
        }
        LineOutcome::Continue
    }

    pub fn shutdown(&mut self) {
        let reaped = self.reaper.reap();
        log::debug!("reaped {} stages at shutdown, {} still running", reaped, self.reaper.pending());
        self.history.teardown();
    }
}

/// Where input lines come from: the line editor on a terminal, plain
/// stdin otherwise.
enum LineSource {
    Interactive(Box<Editor<ShellHelper, DefaultHistory>>),
    Script(StdinLock<'static>),
}

impl LineSource {
    fn open(config: &ShellConfig) -> anyhow::Result<Self> {
        if !nix::unistd::isatty(libc::STDIN_FILENO).unwrap_or(false) {
            log::debug!("stdin is not a terminal, reading plain lines");
            return Ok(LineSource::Script(io::stdin().lock()));
        }
        let edit_mode = match config.edit_mode {
            EditMode::Vi => rustyline::EditMode::Vi,
            EditMode::Emacs => rustyline::EditMode::Emacs,
        };
        let rl_config = Config::builder()
            .completion_type(CompletionType::List)
            .edit_mode(edit_mode)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(rl_config).context("failed to create line editor")?;
        editor.set_helper(Some(ShellHelper::new()));
        Ok(LineSource::Interactive(Box::new(editor)))
    }

    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self {
            LineSource::Interactive(editor) => loop {
                match editor.readline(prompt) {
                    Ok(line) => return Ok(Some(line)),
                    // Ctrl-C at the prompt only discards the line.
                    Err(ReadlineError::Interrupted) => continue,
                    Err(ReadlineError::Eof) => return Ok(None),
                    Err(err) => return Err(err.into()),
                }
            },
            LineSource::Script(stdin) => {
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                if line.ends_with('\n') {
                    line.pop();
                }
                Ok(Some(line))
            }
        }
    }

    fn remember(&mut self, line: &str) {
        if let LineSource::Interactive(editor) = self {
            let _ = editor.add_history_entry(line);
        }
    }
}

/// Runs the read loop until `exit` or end of input; returns the exit code.
pub fn start_repl(config: ShellConfig) -> anyhow::Result<i32> {
    let mut shell = Shell::new(config.clone()).context("failed to initialise history")?;
    let watcher = InterruptWatcher::spawn(shell.active()).context("failed to install SIGINT handler")?;
    let mut input = LineSource::open(&config)?;
    let code = loop {
        let prompt = prompt::render(shell.next_command_number());
        let line = match input.read_line(&prompt) {
            Ok(Some(line)) => line,
            Ok(None) => break 0,
            Err(err) => {
                eprintln!("bangsh: {:#}", err);
                break 1;
            }
        };
        let before = shell.history().last_sequence_number();
        if let LineOutcome::Exit(code) = shell.run_line(&line) {
            break code;
        }
        let last = shell.history().last_sequence_number();
        if last != before {
            if let Some(text) = shell.history().lookup_by_number(last) {
                input.remember(text);
            }
        }
    };
    log::info!("leaving shell with code {}", code);
    shell.shutdown();
    watcher.stop();
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn shell() -> Shell {
        Shell::new(ShellConfig::default()).unwrap()
    }

    fn texts(shell: &Shell) -> Vec<String> {
        shell.history().iter().map(|e| e.text.clone()).collect()
    }

    #[test]
    fn zero_capacity_fails_startup() {
        let config = ShellConfig { history_capacity: 0, ..ShellConfig::default() };
        assert!(Shell::new(config).is_err());
    }

    #[test]
    fn blank_lines_are_not_recorded() {
        let mut shell = shell();
        assert_eq!(shell.run_line(""), LineOutcome::Continue);
        assert_eq!(shell.run_line(" \t "), LineOutcome::Continue);
        assert!(shell.history().is_empty());
        assert_eq!(shell.next_command_number(), 1);
    }

    #[test]
    fn expanded_lines_are_recorded_in_order() {
        let mut shell = shell();
        shell.run_line("true");
        shell.run_line("echo hi # note");
        shell.run_line("!!");
        shell.run_line("!t");
        assert_eq!(texts(&shell), vec!["true", "echo hi # note", "echo hi # note", "true"]);
        assert_eq!(shell.next_command_number(), 5);
    }

    #[test]
    fn unmatched_reference_leaves_nothing_to_record() {
        let mut shell = shell();
        assert_eq!(shell.run_line("!9"), LineOutcome::Continue);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn history_command_is_not_recorded() {
        let mut shell = shell();
        shell.run_line("true");
        shell.run_line("history");
        assert_eq!(texts(&shell), vec!["true"]);
    }

    #[test]
    fn exit_ends_the_loop() {
        let mut shell = shell();
        assert_eq!(shell.run_line("exit"), LineOutcome::Exit(0));
        assert_eq!(shell.run_line("exit 4"), LineOutcome::Exit(4));
        assert!(shell.history().is_empty());
    }

    #[test]
    fn oversized_command_is_recorded_but_not_run() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        let config = ShellConfig { max_args: 2, ..ShellConfig::default() };
        let mut shell = Shell::new(config).unwrap();
        let line = format!("echo a b > {}", out.display());
        assert_eq!(shell.run_line(&line), LineOutcome::Continue);
        assert!(!out.exists());
        assert_eq!(shell.history().len(), 1);
    }

    #[test]
    fn runs_pipelines_with_redirects() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        let mut shell = shell();
        shell.run_line(&format!("echo one two | wc -w > {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "2");
    }

    #[test]
    fn prompt_returns_before_interior_stages_finish() {
        let mut shell = shell();
        let started = std::time::Instant::now();
        assert_eq!(shell.run_line("sleep 2 | true"), LineOutcome::Continue);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(shell.pending_stages(), 1);
        std::thread::sleep(std::time::Duration::from_millis(2500));
        shell.run_line("true");
        assert_eq!(shell.pending_stages(), 0);
    }

    #[test]
    fn shutdown_releases_history() {
        let mut shell = shell();
        shell.run_line("true");
        shell.shutdown();
        shell.shutdown();
        assert!(shell.history().is_empty());
    }
}
