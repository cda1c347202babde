use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability tag carried by a role.
///
/// `Org` marks an owner role: users holding a role with this primitive are
/// the organization's administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessPrimitive {
    Org,
    Apps,
    Resources,
    Profile,
    Devices,
}

impl AccessPrimitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPrimitive::Org => "ORG",
            AccessPrimitive::Apps => "APPS",
            AccessPrimitive::Resources => "RESOURCES",
            AccessPrimitive::Profile => "PROFILE",
            AccessPrimitive::Devices => "DEVICES",
        }
    }
}

impl std::fmt::Display for AccessPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role as seen by the access service: identity plus its primitive set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub organization_id: String,
    pub role_id: String,
    pub name: String,
    pub internal: bool,
    pub primitives: Vec<AccessPrimitive>,
}

impl Role {
    /// Whether this role grants organization ownership.
    pub fn is_owner(&self) -> bool {
        self.primitives.contains(&AccessPrimitive::Org)
    }
}

/// Role as recorded by the role registry (no primitives).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub organization_id: String,
    pub role_id: String,
    pub name: String,
    pub description: String,
    pub internal: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(primitives: Vec<AccessPrimitive>) -> Role {
        Role {
            organization_id: "org-1".to_string(),
            role_id: "role-1".to_string(),
            name: "Operator".to_string(),
            internal: false,
            primitives,
        }
    }

    #[test]
    fn test_role_with_org_primitive_is_owner() {
        assert!(role(vec![AccessPrimitive::Profile, AccessPrimitive::Org]).is_owner());
    }

    #[test]
    fn test_role_without_org_primitive_is_not_owner() {
        assert!(!role(vec![AccessPrimitive::Apps, AccessPrimitive::Resources]).is_owner());
        assert!(!role(vec![]).is_owner());
    }

    #[test]
    fn test_primitive_display() {
        assert_eq!(AccessPrimitive::Org.to_string(), "ORG");
        assert_eq!(AccessPrimitive::Devices.to_string(), "DEVICES");
    }
}
