//! Session records for connected chat participants
//!
//! Every open connection owns exactly one [`Session`]. The session carries the
//! server-assigned identity (`sid` and `display_id`) plus the user-chosen
//! nickname, which starts unset and may change any number of times.
//!
//! # Nickname transitions
//!
//! ```text
//! None ──identity-set──▶ Some(a)        => NicknameChange::Joined
//! Some(a) ──identity-set──▶ Some(b)     => NicknameChange::Renamed
//! ```

use uuid::Uuid;

/// Prefix for the sequential fallback label (`User1`, `User2`, ...)
pub const DISPLAY_ID_PREFIX: &str = "User";

/// Server-side identity state for one open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque unique identifier, sent to the client in the `meta` frame
    pub sid: Uuid,

    /// Sequential fallback label assigned at connect time
    pub display_id: String,

    /// User-chosen nickname, `None` until the first identity-set frame
    pub nickname: Option<String>,

    /// Liveness flag: cleared before each heartbeat probe, set on pong
    pub alive: bool,
}

/// Result of applying an identity-set frame to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NicknameChange {
    /// First nickname on this session (prior value was unset)
    Joined {
        /// The effective nickname
        nickname: String,
    },
    /// Nickname replaced an earlier one
    Renamed {
        /// Previous nickname
        from: String,
        /// New nickname
        to: String,
    },
}

impl NicknameChange {
    /// Text of the system notice broadcast for this change
    pub fn notice(&self) -> String {
        match self {
            NicknameChange::Joined { nickname } => format!("{} joined.", nickname),
            NicknameChange::Renamed { from, to } => format!("{} renamed to {}.", from, to),
        }
    }

    /// The nickname in effect after the change
    pub fn nickname(&self) -> &str {
        match self {
            NicknameChange::Joined { nickname } => nickname,
            NicknameChange::Renamed { to, .. } => to,
        }
    }
}

impl Session {
    /// Create a fresh session for the `sequence`-th connection of this process
    pub fn new(sequence: u64) -> Self {
        Self {
            sid: Uuid::new_v4(),
            display_id: format!("{}{}", DISPLAY_ID_PREFIX, sequence),
            nickname: None,
            alive: true,
        }
    }

    /// Name shown to other participants: the nickname, or the display id when unset
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.display_id)
    }

    /// Apply a candidate nickname
    ///
    /// The candidate is trimmed; an empty result falls back to the display id.
    /// Join vs. rename is decided solely by whether a nickname was set before.
    pub fn set_nickname(&mut self, candidate: &str) -> NicknameChange {
        let trimmed = candidate.trim();
        let effective = if trimmed.is_empty() {
            self.display_id.clone()
        } else {
            trimmed.to_string()
        };

        match self.nickname.replace(effective.clone()) {
            None => NicknameChange::Joined {
                nickname: effective,
            },
            Some(previous) => NicknameChange::Renamed {
                from: previous,
                to: effective,
            },
        }
    }
}
