// config.rs

use std::env;
use crate::error::{Result, ShellError};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_MAX_ARGS: usize = 256;

/// Where a `!prefix` reference takes its search text from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PrefixScope {
    /// Only the suffix of the bang token itself.
    #[default]
    Token,
    /// Everything after the `!` up to the end of the line, so the words
    /// following the token become part of the prefix.
    RestOfLine,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

#[derive(Clone, Debug)]
pub struct ShellConfig {
    pub history_capacity: usize,
    pub max_args: usize,
    pub prefix_scope: PrefixScope,
    pub edit_mode: EditMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_args: DEFAULT_MAX_ARGS,
            prefix_scope: PrefixScope::default(),
            edit_mode: EditMode::default(),
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("BANGSH_HISTSIZE") {
            config.history_capacity = parse_positive("BANGSH_HISTSIZE", &raw)?;
        }
        if let Some(raw) = lookup("BANGSH_MAX_ARGS") {
            config.max_args = parse_positive("BANGSH_MAX_ARGS", &raw)?;
        }
        config.prefix_scope = match lookup("BANGSH_BANG_PREFIX").as_deref().map(str::trim) {
            None | Some("") | Some("token") => PrefixScope::Token,
            Some("line") => PrefixScope::RestOfLine,
            Some(other) => {
                return Err(ShellError::Config(format!(
                    "BANGSH_BANG_PREFIX must be `token` or `line`, got `{}`",
                    other
                )))
            }
        };
        config.edit_mode = match lookup("BANGSH_EDITMODE").as_deref() {
            Some("vi") | Some("VI") => EditMode::Vi,
            _ => EditMode::Emacs,
        };
        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ShellError::Config(format!("{} must be greater than zero", key))),
        Ok(n) => Ok(n),
        Err(_) => Err(ShellError::Config(format!("{} is not a number: `{}`", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ShellConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ShellConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.max_args, DEFAULT_MAX_ARGS);
        assert_eq!(config.prefix_scope, PrefixScope::Token);
        assert_eq!(config.edit_mode, EditMode::Emacs);
    }

    #[test]
    fn zero_history_size_is_rejected() {
        let err = config_from(&[("BANGSH_HISTSIZE", "0")]).unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
    }

    #[test]
    fn garbage_max_args_is_rejected() {
        assert!(config_from(&[("BANGSH_MAX_ARGS", "lots")]).is_err());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("BANGSH_HISTSIZE", " 5 "),
            ("BANGSH_MAX_ARGS", "512"),
            ("BANGSH_BANG_PREFIX", "line"),
            ("BANGSH_EDITMODE", "vi"),
        ])
        .unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.max_args, 512);
        assert_eq!(config.prefix_scope, PrefixScope::RestOfLine);
        assert_eq!(config.edit_mode, EditMode::Vi);
    }

    #[test]
    fn unknown_prefix_scope_is_rejected() {
        assert!(config_from(&[("BANGSH_BANG_PREFIX", "word")]).is_err());
    }
}
