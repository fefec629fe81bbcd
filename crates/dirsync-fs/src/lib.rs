//! Confined per-user directory sandbox.
//!
//! Every connected identity owns a home directory (`Root/<identity>`) and a
//! working position inside it. All path resolution walks segment by segment
//! and re-checks the home boundary on every `..`, so a path can never
//! escape the sandbox, not even transiently in the middle of a
//! multi-segment path.
//!
//! Both sides of the protocol use the same type: the server confines each
//! session to its store home, the mirror client confines frame application
//! to its local mirror home.

pub mod error;
pub mod sandbox;

pub use error::{FsError, FsResult};
pub use sandbox::{Sandbox, remove_tree};
