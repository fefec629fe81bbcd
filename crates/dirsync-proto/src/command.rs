//! Client command grammar.
//!
//! A command line is split on spaces; the first token selects the opcode
//! and the rest are operands. Operand-count mismatches are rejected here,
//! before any filesystem work happens, with the exact usage string the
//! server sends back as its response line.

use thiserror::Error;

/// Errors produced while turning a raw line into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Known opcode, wrong operand count.
    #[error("Invalid Format (format : {0})")]
    Format(&'static str),

    /// Opcode outside the command vocabulary (covers the empty line too).
    #[error("ERROR : Unknown command")]
    Unknown,
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `mkdir <path>`: create a directory, creating missing parents.
    Mkdir { path: String },
    /// `rm <path>`: recursively remove a directory subtree.
    Remove { path: String },
    /// `mv <src> <dst>`: relocate a directory.
    Move { src: String, dst: String },
    /// `rn <current> <target>`: relabel a directory in place.
    Rename { current: String, target: String },
    /// `cd <path>`: change the working position inside the sandbox.
    ChangeDir { path: String },
    /// `ls [path]`: list immediate children of a directory.
    List { path: Option<String> },
    /// `sync`: begin the directory-subscription sub-protocol.
    Sync,
    /// `dsync <name...>`: drop one or more subscriptions.
    Desync { names: Vec<String> },
    /// `log`: begin the log-inspection / cascading-undo sub-protocol.
    Log,
    /// `quit`: close the session.
    Quit,
}

impl Command {
    /// Parse one wire line into a command.
    ///
    /// Leading/trailing whitespace is ignored; interior runs of spaces are
    /// treated as single separators.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let opcode = tokens.next().ok_or(CommandError::Unknown)?;
        let operands: Vec<&str> = tokens.collect();

        match opcode {
            "mkdir" => match operands.as_slice() {
                [path] => Ok(Self::Mkdir { path: path.to_string() }),
                _ => Err(CommandError::Format("mkdir nameOfDirectory")),
            },
            "rm" => match operands.as_slice() {
                [path] => Ok(Self::Remove { path: path.to_string() }),
                _ => Err(CommandError::Format("rm nameOfDirectory")),
            },
            "mv" => match operands.as_slice() {
                [src, dst] => Ok(Self::Move {
                    src: src.to_string(),
                    dst: dst.to_string(),
                }),
                _ => Err(CommandError::Format("mv source target")),
            },
            "rn" => match operands.as_slice() {
                [current, target] => Ok(Self::Rename {
                    current: current.to_string(),
                    target: target.to_string(),
                }),
                _ => Err(CommandError::Format("rn current target")),
            },
            "cd" => match operands.as_slice() {
                [path] => Ok(Self::ChangeDir { path: path.to_string() }),
                _ => Err(CommandError::Format("cd path")),
            },
            "ls" => match operands.as_slice() {
                [] => Ok(Self::List { path: None }),
                [path] => Ok(Self::List { path: Some(path.to_string()) }),
                _ => Err(CommandError::Format("ls [nameOfDirectory]")),
            },
            "sync" => match operands.as_slice() {
                [] => Ok(Self::Sync),
                _ => Err(CommandError::Format("sync")),
            },
            "dsync" => {
                if operands.is_empty() {
                    Err(CommandError::Format("dsync name [name ...]"))
                } else {
                    Ok(Self::Desync {
                        names: operands.iter().map(|s| s.to_string()).collect(),
                    })
                }
            }
            "log" => match operands.as_slice() {
                [] => Ok(Self::Log),
                _ => Err(CommandError::Format("log")),
            },
            "quit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mutators() {
        assert_eq!(
            Command::parse("mkdir a/b").unwrap(),
            Command::Mkdir { path: "a/b".into() }
        );
        assert_eq!(
            Command::parse("rm a").unwrap(),
            Command::Remove { path: "a".into() }
        );
        assert_eq!(
            Command::parse("mv a b").unwrap(),
            Command::Move { src: "a".into(), dst: "b".into() }
        );
        assert_eq!(
            Command::parse("rn old new").unwrap(),
            Command::Rename { current: "old".into(), target: "new".into() }
        );
    }

    #[test]
    fn test_parse_ls_optional_operand() {
        assert_eq!(Command::parse("ls").unwrap(), Command::List { path: None });
        assert_eq!(
            Command::parse("ls docs").unwrap(),
            Command::List { path: Some("docs".into()) }
        );
        assert!(matches!(
            Command::parse("ls a b"),
            Err(CommandError::Format(_))
        ));
    }

    #[test]
    fn test_operand_count_mismatch() {
        assert!(matches!(Command::parse("mkdir"), Err(CommandError::Format(_))));
        assert!(matches!(Command::parse("mkdir a b"), Err(CommandError::Format(_))));
        assert!(matches!(Command::parse("mv a"), Err(CommandError::Format(_))));
        assert!(matches!(Command::parse("rn a b c"), Err(CommandError::Format(_))));
        assert!(matches!(Command::parse("sync now"), Err(CommandError::Format(_))));
        assert!(matches!(Command::parse("dsync"), Err(CommandError::Format(_))));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(Command::parse("frobnicate x"), Err(CommandError::Unknown));
        assert_eq!(Command::parse(""), Err(CommandError::Unknown));
        assert_eq!(Command::parse("   "), Err(CommandError::Unknown));
    }

    #[test]
    fn test_dsync_multiple_names() {
        assert_eq!(
            Command::parse("dsync a b c").unwrap(),
            Command::Desync { names: vec!["a".into(), "b".into(), "c".into()] }
        );
    }

    #[test]
    fn test_whitespace_tolerance() {
        assert_eq!(
            Command::parse("  mkdir   a  ").unwrap(),
            Command::Mkdir { path: "a".into() }
        );
    }

    #[test]
    fn test_format_error_message() {
        let err = Command::parse("mv a").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Format (format : mv source target)");
    }
}
