//! Staff roster and recipient directory collaborators.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Internal roles a notification can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Owner,
    Staff,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Staff => "staff",
        };
        write!(f, "{s}")
    }
}

/// A staff member eligible to review applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub staff_id: String,
    pub name: String,
}

/// The staff roster consumed by the fan-out engine.
#[async_trait]
pub trait StaffRoster: Send + Sync {
    /// Staff members eligible for review work, at the time of the call.
    async fn list_staff(&self) -> Result<Vec<StaffMember>, DirectoryError>;
}

/// Resolves role sets into concrete user ids for notification dispatch.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve_roles(&self, roles: &[Role]) -> Result<Vec<String>, DirectoryError>;
}

/// Fixed in-memory directory, used by tests and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    staff: Vec<StaffMember>,
    role_members: HashMap<Role, Vec<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a staff member (also enrolled in the Staff role).
    pub fn with_staff(mut self, staff_id: impl Into<String>, name: impl Into<String>) -> Self {
        let staff_id = staff_id.into();
        self.role_members
            .entry(Role::Staff)
            .or_default()
            .push(staff_id.clone());
        self.staff.push(StaffMember {
            staff_id,
            name: name.into(),
        });
        self
    }

    /// Builder: enroll a user in a role.
    pub fn with_role_member(mut self, role: Role, user_id: impl Into<String>) -> Self {
        self.role_members.entry(role).or_default().push(user_id.into());
        self
    }
}

#[async_trait]
impl StaffRoster for StaticDirectory {
    async fn list_staff(&self) -> Result<Vec<StaffMember>, DirectoryError> {
        Ok(self.staff.clone())
    }
}

#[async_trait]
impl RecipientResolver for StaticDirectory {
    async fn resolve_roles(&self, roles: &[Role]) -> Result<Vec<String>, DirectoryError> {
        let mut out = Vec::new();
        for role in roles {
            if let Some(members) = self.role_members.get(role) {
                out.extend(members.iter().cloned());
            }
        }
        Ok(out)
    }
}
