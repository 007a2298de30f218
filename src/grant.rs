use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answers whether a role holds a permission.
///
/// Implementations own the role graph, including any inheritance between
/// roles. `context` carries extra assertion data, the authorizer always passes
/// `None`.
pub trait GrantRelation: Send + Sync {
    fn is_granted(&self, role: &str, permission: &str, context: Option<&Value>) -> Result<bool>;
}

impl<F> GrantRelation for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_granted(&self, role: &str, permission: &str, _context: Option<&Value>) -> Result<bool> {
        Ok(self(role, permission))
    }
}

/// Permissions assigned to one role, as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: String,

    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A flat role to permissions table without inheritance.
#[derive(Debug, Clone, Default)]
pub struct StaticGrants {
    roles: HashMap<String, HashSet<String>>,
}

impl StaticGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, keeping the permissions it already holds.
    pub fn add_role(&mut self, role: impl ToString) -> &mut Self {
        self.roles.entry(role.to_string()).or_default();
        self
    }

    pub fn assign(&mut self, role: impl ToString, permission: impl ToString) -> &mut Self {
        self.roles
            .entry(role.to_string())
            .or_default()
            .insert(permission.to_string());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }
}

impl From<&[RoleGrant]> for StaticGrants {
    fn from(grants: &[RoleGrant]) -> Self {
        let mut table = Self::new();
        for grant in grants {
            table.add_role(&grant.role);
            for permission in grant.permissions.iter() {
                table.assign(&grant.role, permission);
            }
        }
        table
    }
}

impl GrantRelation for StaticGrants {
    fn is_granted(&self, role: &str, permission: &str, _context: Option<&Value>) -> Result<bool> {
        Ok(self
            .roles
            .get(role)
            .is_some_and(|permissions| permissions.contains(permission)))
    }
}
