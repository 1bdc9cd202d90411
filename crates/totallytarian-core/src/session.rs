//! Client-owned session identity.
//!
//! Nothing here is ever sent to the server except the identifiers.

use crate::protocol::{LobbyId, PlayerId, Role};

/// Identifiers bound when the player creates or joins a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub lobby_id: LobbyId,
    pub player_id: PlayerId,
    /// Fixed at creation: the creator of a lobby is its host.
    pub is_host: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    membership: Option<Membership>,
    has_confirmed_role: bool,
    player_role: Option<Role>,
}

impl SessionState {
    /// A session that has not joined any lobby yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session bound to a lobby.
    pub fn joined(
        lobby_id: impl Into<LobbyId>,
        player_id: impl Into<PlayerId>,
        is_host: bool,
    ) -> Self {
        Self {
            membership: Some(Membership {
                lobby_id: lobby_id.into(),
                player_id: player_id.into(),
                is_host,
            }),
            ..Self::default()
        }
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    pub fn lobby_id(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.lobby_id.as_str())
    }

    pub fn player_id(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.player_id.as_str())
    }

    pub fn is_host(&self) -> bool {
        self.membership.as_ref().is_some_and(|m| m.is_host)
    }

    pub fn has_confirmed_role(&self) -> bool {
        self.has_confirmed_role
    }

    pub fn player_role(&self) -> Option<Role> {
        self.player_role
    }

    /// Cache the role fetched from the server. The first value wins.
    pub fn cache_role(&mut self, role: Role) {
        if self.player_role.is_none() {
            self.player_role = Some(role);
        }
    }

    /// Record that the player acknowledged their role. One-way.
    pub fn confirm_role(&mut self) {
        self.has_confirmed_role = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_unbound() {
        let session = SessionState::new();
        assert_eq!(session.lobby_id(), None);
        assert_eq!(session.player_id(), None);
        assert!(!session.is_host());
        assert!(!session.has_confirmed_role());
    }

    #[test]
    fn role_is_cached_once_and_confirmation_sticks() {
        let mut session = SessionState::joined("L1", "p1", true);
        assert!(session.is_host());
        session.cache_role(Role::Resistance);
        session.cache_role(Role::ThoughtPolice);
        assert_eq!(session.player_role(), Some(Role::Resistance));

        session.confirm_role();
        session.confirm_role();
        assert!(session.has_confirmed_role());
    }
}
