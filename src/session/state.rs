use std::fmt;

/// Whether the vault exists and whether it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No vault has been set up in the secret store.
    Uninitialized,
    /// The vault exists; no session key is held.
    Locked,
    /// The session key is held in memory.
    Unlocked,
}

impl SessionState {
    pub fn is_unlocked(self) -> bool {
        self == SessionState::Unlocked
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Locked => "locked",
            SessionState::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}
