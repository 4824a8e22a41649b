use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "patient")]
    User,
    #[serde(alias = "staff", alias = "doctor")]
    Clinic,
    Admin,
}

impl Role {
    /// Staff roles act on appointments from the clinic side.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Clinic | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Clinic => "clinic",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "patient" => Ok(Role::User),
            "clinic" | "staff" | "doctor" => Ok(Role::Clinic),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Clinic".parse::<Role>().unwrap(), Role::Clinic);
        assert_eq!("patient".parse::<Role>().unwrap(), Role::User);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_profile_accepts_underscore_id() {
        let profile: UserProfile = serde_json::from_value(json!({
            "_id": "64f0c0ffee",
            "email": "jane@example.com",
            "role": "user"
        }))
        .unwrap();

        assert_eq!(profile.id, "64f0c0ffee");
        assert_eq!(profile.role, Some(Role::User));
        assert_eq!(profile.display_name(), "jane@example.com");
    }
}
