//! Server→client synchronization frames.
//!
//! A subscription is replayed to the mirror side as a stream of frames.
//! The snapshot push uses `create`/`enter`/`exit` to walk the subtree in
//! pre-order; subsequent live events arrive as `create`/`remove` with a
//! path relative to the subscriber's home. `remove` is dual-purposed: it
//! both deletes a mirrored entry and precedes a full re-snapshot when the
//! server falls back to a conservative resync.

use std::fmt;

/// One synchronization frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFrame {
    /// Create a directory entry at the given path (parents included).
    Create(String),
    /// Descend into the named directory for the frames that follow.
    Enter(String),
    /// Ascend back out of the current directory.
    Exit,
    /// Remove the subtree at the given path.
    Remove(String),
}

impl SyncFrame {
    /// Parse a wire line as a sync frame.
    ///
    /// Returns `None` for lines that are not frames: the mirror client
    /// treats those as plain response text.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        match (tokens.next()?, tokens.next(), tokens.next()) {
            ("create", Some(path), None) => Some(Self::Create(path.to_string())),
            ("enter", Some(name), None) => Some(Self::Enter(name.to_string())),
            ("exit", None, None) => Some(Self::Exit),
            ("remove", Some(path), None) => Some(Self::Remove(path.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for SyncFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(path) => write!(f, "create {path}"),
            Self::Enter(name) => write!(f, "enter {name}"),
            Self::Exit => write!(f, "exit"),
            Self::Remove(path) => write!(f, "remove {path}"),
        }
    }
}
