// prompt.rs

use std::env;
use std::path::Path;

/// `[<cwd> | <user>@<host> | <next command number>]$ `
pub fn render(next_command: u64) -> String {
    let cwd = env::current_dir().unwrap_or_default();
    let home = env::var_os("HOME");
    let user = env::var("LOGNAME").unwrap_or_default();
    let host = nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format_prompt(&cwd, home.as_deref().map(Path::new), &user, &host, next_command)
}

pub fn format_prompt(cwd: &Path, home: Option<&Path>, user: &str, host: &str, next_command: u64) -> String {
    let dir = match home.and_then(|home| cwd.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => cwd.display().to_string(),
    };
    format!("[{} | {}@{} | {}]$ ", dir, user, host, next_command)
}
