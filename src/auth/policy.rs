//! Who may manage whose sessions.
//!
//! The session manager only asks the questions below; what "elevated" means
//! belongs to the host identity system.

use super::types::Caller;
use crate::db::UserRole;

pub trait SessionPolicy: Send + Sync {
    /// Whether the caller may manage sessions of any user.
    fn is_elevated(&self, caller: &Caller) -> bool;

    /// Whether the caller may list or revoke sessions of `target_user_id`.
    fn can_manage_sessions(&self, caller: &Caller, target_user_id: i64) -> bool {
        caller.user_id == target_user_id || self.is_elevated(caller)
    }
}

/// Default policy: admins are elevated, everybody manages their own sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl SessionPolicy for RolePolicy {
    fn is_elevated(&self, caller: &Caller) -> bool {
        caller.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(user_id: i64, role: UserRole) -> Caller {
        Caller {
            user_id,
            role,
            session_jti: None,
        }
    }

    #[test]
    fn test_user_manages_only_own_sessions() {
        let policy = RolePolicy;
        assert!(policy.can_manage_sessions(&caller(1, UserRole::User), 1));
        assert!(!policy.can_manage_sessions(&caller(1, UserRole::User), 2));
        assert!(!policy.is_elevated(&caller(1, UserRole::User)));
    }

    #[test]
    fn test_admin_manages_everyone() {
        let policy = RolePolicy;
        assert!(policy.can_manage_sessions(&caller(1, UserRole::Admin), 1));
        assert!(policy.can_manage_sessions(&caller(1, UserRole::Admin), 2));
        assert!(policy.is_elevated(&caller(1, UserRole::Admin)));
    }
}
