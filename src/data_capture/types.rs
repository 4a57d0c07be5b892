//! Common data types used across the data_capture subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of TCP flow for captured bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Bytes read from the inbound client and forwarded to the target.
    #[serde(rename = "c2s")]
    ClientToServer,
    /// Bytes read from the target and forwarded back to the client.
    #[serde(rename = "s2c")]
    ServerToClient,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::ClientToServer, Direction::ServerToClient];

    /// Short tag used in blob names and on-disk metadata.
    pub fn tag(self) -> &'static str {
        match self {
            Direction::ClientToServer => "c2s",
            Direction::ServerToClient => "s2c",
        }
    }

    /// Reason recorded when the reading side of this direction reaches EOF.
    pub fn eof_reason(self) -> CloseReason {
        match self {
            Direction::ClientToServer => CloseReason::ClientClosed,
            Direction::ServerToClient => CloseReason::ServerClosed,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Why a capture session reached `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    ClientClosed,
    ServerClosed,
    Interrupted,
    Error,
}

/// Lifecycle of a capture relay.
///
/// `Listening -> Connected -> Relaying -> Closed(reason)`. A relay may also go
/// straight from `Listening` or `Connected` to `Closed` when it is interrupted
/// or a leg fails before any byte is relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Listening,
    Connected,
    Relaying,
    Closed(CloseReason),
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Listening => write!(f, "LISTENING"),
            RelayState::Connected => write!(f, "CONNECTED"),
            RelayState::Relaying => write!(f, "RELAYING"),
            RelayState::Closed(reason) => write!(f, "CLOSED({:?})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_serializes_as_short_tag() {
        assert_eq!(
            serde_json::to_string(&Direction::ClientToServer).unwrap(),
            "\"c2s\""
        );
        let d: Direction = serde_json::from_str("\"s2c\"").unwrap();
        assert_eq!(d, Direction::ServerToClient);
        assert!(serde_json::from_str::<Direction>("\"sideways\"").is_err());
    }

    #[test]
    fn eof_maps_to_closing_side() {
        assert_eq!(
            Direction::ClientToServer.eof_reason(),
            CloseReason::ClientClosed
        );
        assert_eq!(
            Direction::ServerToClient.eof_reason(),
            CloseReason::ServerClosed
        );
    }
}
