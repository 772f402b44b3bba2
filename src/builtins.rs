// builtins.rs

use std::env;
use std::io::Write;
use std::path::PathBuf;
use crate::history::HistoryStore;
use crate::util::writeln_ignore_broken_pipe;

const EXIT_BAD_ARGUMENT: i32 = 255;

/// `Some(code)` when the line's first word is `exit`.
pub fn exit_request(line: &str) -> Option<i32> {
    let mut words = line.split_whitespace();
    if words.next()? != "exit" {
        return None;
    }
    Some(match words.next() {
        None => 0,
        Some(code) => code.parse::<i32>().unwrap_or_else(|_| {
            eprintln!("exit: {}: numeric argument required", code);
            EXIT_BAD_ARGUMENT
        }),
    })
}

pub fn is_history_command(line: &str) -> bool {
    line.split_whitespace().next() == Some("history")
}

/// `history` prints everything retained, `history N` the last N entries.
pub fn run_history<W: Write>(line: &str, history: &HistoryStore, out: W) {
    let args: Vec<&str> = line.split_whitespace().skip(1).collect();
    let result = match args.as_slice() {
        [] => history.print_all(out),
        [count] => match count.parse::<usize>() {
            Ok(n) => history.print_recent(out, n),
            Err(_) => {
                eprintln!("history: {}: numeric argument required", count);
                return;
            }
        },
        _ => {
            eprintln!("history: too many arguments");
            return;
        }
    };
    if let Err(e) = result {
        eprintln!("history: {}", e);
    }
}

/// `cd` with no argument goes to `$HOME`.
pub fn change_directory(args: &[String]) {
    let home = env::var_os("HOME").map(PathBuf::from);
    let target = match args {
        [] => match home {
            Some(home) => home,
            None => {
                log::debug!("cd without argument and no HOME set");
                let _ = writeln_ignore_broken_pipe(std::io::stderr(), "cd: HOME not set");
                return;
            }
        },
        [dir] => expand_tilde(dir, home),
        _ => {
            let _ = writeln_ignore_broken_pipe(std::io::stderr(), "cd: too many arguments");
            return;
        }
    };
    log::debug!("changing directory to {}", target.display());
    if let Err(e) = env::set_current_dir(&target) {
        let _ = writeln_ignore_broken_pipe(std::io::stderr(), format!("cd: {}: {}", target.display(), e));
    }
}

fn expand_tilde(dir: &str, home: Option<PathBuf>) -> PathBuf {
    match (dir, home) {
        ("~", Some(home)) => home,
        (rest, Some(home)) if rest.starts_with("~/") => home.join(&rest[2..]),
        (other, _) => PathBuf::from(other),
    }
}
