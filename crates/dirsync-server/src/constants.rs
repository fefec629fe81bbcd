//! Server configuration constants.

use std::time::Duration;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default server store root; one subdirectory per identity.
pub const DEFAULT_ROOT: &str = "ServerDir";

/// How often an idle session drains pending watch events.
pub const WATCH_DRAIN_INTERVAL: Duration = Duration::from_millis(500);
