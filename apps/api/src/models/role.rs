use serde::{Deserialize, Serialize};

/// Caller role for archive reads. Every role is an explicit match arm;
/// in particular the superadmin's unscoped listing is a deliberate case,
/// not a fallthrough default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A customer: sees only archived contracts tied to their own customer record.
    User,
    /// A partner admin: sees every archived contract for their partner.
    Admin,
    /// Platform operator: unscoped.
    Superadmin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        })
    }
}
