use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use uuid::Uuid;
use slotbook_shared::Masked;
use crate::CoreResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub role: Role,
}

/// An already-authenticated caller. The booking logic only ever uses `id` as an
/// opaque reference; the rest is carried for display and review screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Masked<String>,
    pub profile: Profile,
}

impl Identity {
    pub fn is_administrator(&self) -> bool {
        self.profile.role == Role::Admin
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the caller behind a presented credential (e.g. a bearer token)
    async fn current_user(&self, credential: &str) -> CoreResult<Identity>;

    fn is_administrator(&self, identity: &Identity) -> bool {
        identity.is_administrator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_role_is_administrator() {
        let mut identity = Identity {
            id: Uuid::new_v4(),
            email: Masked::new("owner@example.com".to_string()),
            profile: Profile { full_name: Some("Venue Owner".to_string()), role: Role::Admin },
        };
        assert!(identity.is_administrator());

        identity.profile.role = Role::Customer;
        assert!(!identity.is_administrator());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(role, Role::Customer);
    }
}
