//! Join/leave gate in front of the chat view.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionGate {
    #[default]
    NotJoined,
    Joined {
        username: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// Name is empty after trimming whitespace.
    EmptyName,
    AlreadyJoined,
}

impl SessionGate {
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Joined { username } => Some(username),
            Self::NotJoined => None,
        }
    }

    /// Enters the joined state under the trimmed `name`.
    pub fn join(&mut self, name: &str) -> Result<&str, JoinError> {
        if self.is_joined() {
            return Err(JoinError::AlreadyJoined);
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(JoinError::EmptyName);
        }

        *self = Self::Joined {
            username: name.to_owned(),
        };

        Ok(self.username().unwrap_or_default())
    }

    /// Returns to the join form, handing back the name that was in use.
    pub fn leave(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Self::Joined { username } => Some(username),
            Self::NotJoined => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_joined() {
        let gate = SessionGate::default();

        assert!(!gate.is_joined());
        assert_eq!(gate.username(), None);
    }

    #[test]
    fn empty_and_blank_names_never_transition() {
        let mut gate = SessionGate::default();

        assert_eq!(gate.join(""), Err(JoinError::EmptyName));
        assert_eq!(gate.join("   "), Err(JoinError::EmptyName));
        assert_eq!(gate, SessionGate::NotJoined);
    }

    #[test]
    fn join_records_username() {
        let mut gate = SessionGate::default();

        assert_eq!(gate.join("Alice"), Ok("Alice"));

        assert!(gate.is_joined());
        assert_eq!(gate.username(), Some("Alice"));
    }

    #[test]
    fn join_trims_surrounding_whitespace() {
        let mut gate = SessionGate::default();

        gate.join("  Bob \t").expect("join should succeed");

        assert_eq!(gate.username(), Some("Bob"));
    }

    #[test]
    fn join_while_joined_is_rejected() {
        let mut gate = SessionGate::default();
        gate.join("Alice").expect("join should succeed");

        assert_eq!(gate.join("Bob"), Err(JoinError::AlreadyJoined));
        assert_eq!(gate.username(), Some("Alice"));
    }

    #[test]
    fn leave_returns_username_and_resets() {
        let mut gate = SessionGate::default();
        gate.join("Alice").expect("join should succeed");

        assert_eq!(gate.leave(), Some("Alice".to_owned()));
        assert_eq!(gate, SessionGate::NotJoined);
    }

    #[test]
    fn leave_when_not_joined_is_noop() {
        let mut gate = SessionGate::default();

        assert_eq!(gate.leave(), None);
        assert_eq!(gate, SessionGate::NotJoined);
    }

    #[test]
    fn gate_cycles_between_states() {
        let mut gate = SessionGate::default();

        for name in ["Alice", "Bob", "Alice"] {
            gate.join(name).expect("join should succeed");
            assert_eq!(gate.leave().as_deref(), Some(name));
        }
    }
}
