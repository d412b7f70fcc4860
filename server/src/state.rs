//! Server state definitions.

use std::fmt;

/// Server operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Store connected, listener not yet serving.
    #[default]
    Starting,
    /// Accepting requests.
    Running,
    /// Shutdown signal received, in-flight calls draining.
    ShuttingDown,
    /// Listener closed.
    Stopped,
}

impl ServerState {
    /// Check if the server is accepting new requests.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, ServerState::Running)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_accepts_requests() {
        assert!(ServerState::Running.accepts_requests());
        for state in [
            ServerState::Starting,
            ServerState::ShuttingDown,
            ServerState::Stopped,
        ] {
            assert!(!state.accepts_requests());
        }
    }
}
