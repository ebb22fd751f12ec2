//! WebSocket close codes used by the transport.
//!
//! Only [`CloseCode::NORMAL`] counts as an intentional close. Every other
//! code is treated as a network-induced close and is eligible for
//! reconnection.

use std::fmt;

/// A WebSocket close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Clean, intentional close. Suppresses reconnection.
    pub const NORMAL: Self = Self(1000);
    /// Peer is going away (server shutdown, page navigation).
    pub const GOING_AWAY: Self = Self(1001);
    /// Close frame carried no status code.
    pub const NO_STATUS: Self = Self(1005);
    /// No close frame was received (dial failure, dropped TCP stream).
    pub const ABNORMAL: Self = Self(1006);
    /// Local force close after a missed heartbeat acknowledgment.
    pub const HEARTBEAT_TIMEOUT: Self = Self(4000);

    /// Whether this close was requested on purpose.
    pub fn is_intentional(self) -> bool {
        self == Self::NORMAL
    }

    /// Raw numeric value.
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_normal_is_intentional() {
        assert!(CloseCode::NORMAL.is_intentional());
        assert!(!CloseCode::GOING_AWAY.is_intentional());
        assert!(!CloseCode::ABNORMAL.is_intentional());
        assert!(!CloseCode::HEARTBEAT_TIMEOUT.is_intentional());
        assert!(!CloseCode::from(1011).is_intentional());
    }
}
