//! dirsync server library.
//!
//! Each accepted connection becomes an independent session task: a
//! handshake claims an identity (unique name + single-letter slot), then
//! the session loop alternates between processing one command line at a
//! time and draining pending watch events for the session's directory
//! subscriptions.
//!
//! The pieces:
//!
//! - [`registry`]: the shared name/letter allocation table.
//! - [`oplog`]: per-session causal command log and cascading undo.
//! - [`sync`]: per-session directory subscriptions (snapshot + live
//!   events as [`dirsync_proto::SyncFrame`]s).
//! - [`session`]: the per-connection command processor state machine.
//! - [`server`]: the TCP accept loop.

pub mod constants;
pub mod oplog;
pub mod registry;
pub mod server;
pub mod session;
pub mod sync;

pub use oplog::{CommandLog, LogEntry, OpKind};
pub use registry::Registry;
pub use server::{ServerConfig, serve};
pub use sync::SyncEngine;
