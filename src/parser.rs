// parser.rs

use std::fmt;
use std::path::{Path, PathBuf};
use itertools::Itertools;
use crate::error::{Result, ShellError};
use crate::tokenizer::{Tokenizer, WHITESPACE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputMode { Truncate, Append }

/// One stage of a pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandNode {
    pub argv: Vec<String>,
    pub stdin_redirect: Option<PathBuf>,
    pub stdout_redirect: Option<(PathBuf, OutputMode)>,
}

impl CommandNode {
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.argv.iter().join(" "))?;
        if let Some(path) = &self.stdin_redirect {
            write!(f, " < {}", path.display())?;
        }
        if let Some((path, mode)) = &self.stdout_redirect {
            let op = match mode {
                OutputMode::Truncate => ">",
                OutputMode::Append => ">>",
            };
            write!(f, " {} {}", op, path.display())?;
        }
        Ok(())
    }
}

/// Non-empty, ordered chain of command nodes.
///
/// Only the first node's input redirect and the last node's output redirect
/// take effect; interior stages always talk through pipes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline {
    nodes: Vec<CommandNode>,
}

impl Pipeline {
    pub fn nodes(&self) -> &[CommandNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn first(&self) -> &CommandNode {
        &self.nodes[0]
    }

    pub fn last(&self) -> &CommandNode {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn input_redirect(&self) -> Option<&Path> {
        self.first().stdin_redirect.as_deref()
    }

    pub fn output_redirect(&self) -> Option<(&Path, OutputMode)> {
        self.last().stdout_redirect.as_ref().map(|(path, mode)| (path.as_path(), *mode))
    }

    /// A blank or comment-only line.
    pub fn is_blank(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].is_empty()
    }
}

/// Builds the pipeline for one (already expanded) line.
///
/// Malformed pipe syntax produces empty stages rather than an error; a
/// redirect operator with no following path ends the build with whatever
/// was collected so far. A stage with more than `max_args` words rejects
/// the whole line.
pub fn build(line: &str, max_args: usize) -> Result<Pipeline> {
    let mut nodes = vec![CommandNode::default()];
    let mut tokens = Tokenizer::new(line, WHITESPACE);
    while let Some(token) = tokens.next_token() {
        match token {
            "<" => match tokens.next_token() {
                Some(path) => nodes[0].stdin_redirect = Some(PathBuf::from(path)),
                None => break,
            },
            ">" | ">>" => {
                let mode = if token == ">>" { OutputMode::Append } else { OutputMode::Truncate };
                match tokens.next_token() {
                    Some(path) => current(&mut nodes).stdout_redirect = Some((PathBuf::from(path), mode)),
                    None => break,
                }
            }
            "|" => nodes.push(CommandNode::default()),
            _ if token.starts_with('#') => break,
            word => {
                let node = current(&mut nodes);
                if node.argv.len() >= max_args {
                    return Err(ShellError::TooManyArguments {
                        program: node.program().unwrap_or(word).to_string(),
                        limit: max_args,
                    });
                }
                node.argv.push(word.to_string());
            }
        }
    }
    Ok(Pipeline { nodes })
}

fn current(nodes: &mut [CommandNode]) -> &mut CommandNode {
    let last = nodes.len() - 1;
    &mut nodes[last]
}
