use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile record held by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub organization_id: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub title: String,
    pub phone: String,
    pub location: String,
    pub photo_base64: String,
    pub member_since: Option<DateTime<Utc>>,
}

/// Input for creating a profile in the directory service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProfileInput {
    pub organization_id: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub title: String,
    pub phone: String,
    pub location: String,
    pub photo_base64: String,
}

/// Input for updating a profile; only fields that are `Some` change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProfileInput {
    pub organization_id: String,
    pub email: String,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub photo_base64: Option<String>,
}

/// Access-side view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAuthxInfo {
    pub organization_id: String,
    pub email: String,
    pub role_id: String,
    pub internal_role: bool,
    pub last_login: Option<DateTime<Utc>>,
}

/// Combined view returned to clients: profile, role assignment and role name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub organization_id: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub title: String,
    pub phone: String,
    pub location: String,
    pub photo_base64: String,
    pub member_since: Option<DateTime<Utc>>,
    pub role_id: String,
    pub role_name: String,
    pub internal_role: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserDetails {
    pub fn from_parts(profile: UserProfile, authx: UserAuthxInfo, role_name: String) -> Self {
        Self {
            organization_id: profile.organization_id,
            email: profile.email,
            name: profile.name,
            last_name: profile.last_name,
            title: profile.title,
            phone: profile.phone,
            location: profile.location,
            photo_base64: profile.photo_base64,
            member_since: profile.member_since,
            role_id: authx.role_id,
            role_name,
            internal_role: authx.internal_role,
            last_login: authx.last_login,
        }
    }
}
