//! dirsync client library.
//!
//! The mirror side of the synchronization protocol: frames pushed by the
//! server are replayed against a local sandbox so the mirrored copy under
//! `ClientsDir/<letter>` tracks the server-side subtree.

pub mod mirror;

pub use mirror::Mirror;
