//! Wire protocol grammar for dirsync.
//!
//! The protocol is line-oriented UTF-8 text: one message per line, tokens
//! separated by single spaces, first token the opcode. This crate is the
//! leaf that both sides build on: it has **no internal dependencies** and
//! knows nothing about sessions or filesystems.
//!
//! Two vocabularies live here:
//!
//! - [`Command`]: client→server command lines (`mkdir`, `rm`, `mv`, `rn`,
//!   `cd`, `ls`, `sync`, `dsync`, `log`, `quit`).
//! - [`SyncFrame`]: server→client synchronization frames (`create`,
//!   `enter`, `exit`, `remove`) that the mirror side replays against its
//!   local sandbox.
//!
//! Everything else on the wire is plain response text.

pub mod command;
pub mod frame;

pub use command::{Command, CommandError};
pub use frame::SyncFrame;
