// completion.rs

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::{Helper, Context};
use rustyline::hint::Hinter;
use rustyline::highlight::Highlighter;
use rustyline::validate::{Validator, ValidationContext, ValidationResult};
use rustyline::error::ReadlineError;
use std::os::unix::fs::PermissionsExt;

pub const BUILTINS: [&str; 3] = ["cd", "exit", "history"];

/// Completes command names in command position and file names elsewhere.
pub struct ShellHelper {
    files: FilenameCompleter,
}

impl ShellHelper {
    pub fn new() -> Self {
        Self { files: FilenameCompleter::new() }
    }
}

impl Default for ShellHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// Builtins and executables on `path_var` starting with `prefix`, sorted.
pub fn command_candidates(prefix: &str, path_var: &str) -> Vec<String> {
    let mut names: Vec<String> = BUILTINS
        .iter()
        .filter(|b| b.starts_with(prefix))
        .map(|b| b.to_string())
        .collect();
    for dir in path_var.split(':').filter(|d| !d.is_empty()) {
        let Ok(entries) = std::fs::read_dir(dir) else { continue };
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            if !name.starts_with(prefix) {
                continue;
            }
            // metadata() follows symlinks
            if let Ok(meta) = std::fs::metadata(entry.path()) {
                if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

fn word_start(line: &str, pos: usize) -> usize {
    line[..pos].rfind([' ', '\t']).map_or(0, |i| i + 1)
}

fn in_command_position(line: &str, start: usize) -> bool {
    let before = line[..start].trim_end();
    before.is_empty() || before.ends_with('|')
}

impl Completer for ShellHelper {
    type Candidate = Pair;
    fn complete(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let start = word_start(line, pos);
        if !in_command_position(line, start) {
            return self.files.complete(line, pos, ctx);
        }
        let path_var = std::env::var("PATH").unwrap_or_default();
        let completions = command_candidates(&line[start..pos], &path_var)
            .into_iter()
            .map(|n| Pair { display: n.clone(), replacement: format!("{} ", n) })
            .collect();
        Ok((start, completions))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> Result<ValidationResult, ReadlineError> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Helper for ShellHelper {}
