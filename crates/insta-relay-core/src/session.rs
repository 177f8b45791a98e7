//! Per-user session membership.
//!
//! `/start` activates a user, `/exit` deactivates them. With the gated policy
//! the pipeline ignores links from users who are not active.

use crate::UserId;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::debug;

/// Whether the pipeline consults the [`SessionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePolicy {
    /// Every text message is a candidate request
    Open,
    /// Only active users are served
    Gated,
}

impl GatePolicy {
    /// Policy from the `session_gate` setting.
    #[must_use]
    pub const fn from_flag(gated: bool) -> Self {
        if gated {
            Self::Gated
        } else {
            Self::Open
        }
    }
}

/// Set of users with an active session.
#[derive(Debug, Default)]
pub struct SessionGate {
    active: RwLock<HashSet<UserId>>,
}

impl SessionGate {
    /// Creates an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the user active. Returns `false` if they already were.
    pub async fn activate(&self, user: UserId) -> bool {
        let inserted = self.active.write().await.insert(user);
        debug!(user_id = user, inserted, "Session activated");
        inserted
    }

    /// Marks the user inactive. Returns `false` if they were not active.
    pub async fn deactivate(&self, user: UserId) -> bool {
        let removed = self.active.write().await.remove(&user);
        debug!(user_id = user, removed, "Session deactivated");
        removed
    }

    /// Returns `true` if the user is active.
    pub async fn is_active(&self, user: UserId) -> bool {
        self.active.read().await.contains(&user)
    }

    /// Number of active users.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_activate_and_deactivate() {
        let gate = SessionGate::new();
        assert!(!gate.is_active(1).await);

        assert!(gate.activate(1).await);
        assert!(!gate.activate(1).await);
        assert!(gate.is_active(1).await);

        assert!(gate.deactivate(1).await);
        assert!(!gate.deactivate(1).await);
        assert!(!gate.is_active(1).await);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let gate = SessionGate::new();
        gate.activate(111).await;

        assert!(!gate.is_active(222).await);
        assert_eq!(gate.active_count().await, 1);
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(GatePolicy::from_flag(true), GatePolicy::Gated);
        assert_eq!(GatePolicy::from_flag(false), GatePolicy::Open);
    }
}
