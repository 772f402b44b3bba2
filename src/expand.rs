// expand.rs

use std::fmt;
use crate::config::PrefixScope;
use crate::history::HistoryStore;
use crate::tokenizer::{Tokenizer, SPACE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HistoryRef<'a> {
    Previous,
    Number(u64),
    Prefix(&'a str),
}

impl fmt::Display for HistoryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryRef::Previous => write!(f, "!!"),
            HistoryRef::Number(n) => write!(f, "!{}", n),
            HistoryRef::Prefix(prefix) => write!(f, "!{}", prefix),
        }
    }
}

/// Classifies a single token. `rest_of_line` starts at the token itself and
/// is only consulted for `PrefixScope::RestOfLine`.
pub fn parse_reference<'a>(token: &'a str, rest_of_line: &'a str, scope: PrefixScope) -> Option<HistoryRef<'a>> {
    if token.len() < 2 || !token.starts_with('!') {
        return None;
    }
    let body = &token[1..];
    if body == "!" {
        return Some(HistoryRef::Previous);
    }
    if body.starts_with(|c: char| c.is_ascii_digit()) {
        let digits = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
        // Too large to be any sequence number; resolves to a miss.
        let n = body[..digits].parse::<u64>().unwrap_or(u64::MAX);
        return Some(HistoryRef::Number(n));
    }
    match scope {
        PrefixScope::Token => Some(HistoryRef::Prefix(body)),
        PrefixScope::RestOfLine => Some(HistoryRef::Prefix(&rest_of_line[1..])),
    }
}

pub fn resolve<'h>(reference: HistoryRef<'_>, history: &'h HistoryStore) -> Option<&'h str> {
    match reference {
        HistoryRef::Previous => history.lookup_by_number(history.last_sequence_number()),
        HistoryRef::Number(n) => history.lookup_by_number(n),
        HistoryRef::Prefix(prefix) => history.lookup_by_prefix(prefix),
    }
}

/// Rewrites every bang reference in `line`.
///
/// Whitespace between tokens is kept as typed. A token starting with `#`
/// ends expansion and the comment is copied through untouched. References
/// that match nothing expand to nothing.
pub fn expand(line: &str, history: &HistoryStore, scope: PrefixScope) -> String {
    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    let mut tokens = Tokenizer::new(line, SPACE);
    while let Some((start, token)) = tokens.next_spanned() {
        out.push_str(&line[copied..start]);
        if token.starts_with('#') {
            out.push_str(&line[start..]);
            return out;
        }
        match parse_reference(token, &line[start..], scope) {
            Some(reference) => match resolve(reference, history) {
                Some(text) => {
                    log::debug!("expanded {} to {:?}", reference, text);
                    out.push_str(text);
                }
                None => log::debug!("no history entry matches {}", reference),
            },
            None => out.push_str(token),
        }
        copied = start + token.len();
    }
    out.push_str(&line[copied..]);
    out
}
