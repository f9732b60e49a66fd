use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application roles as stored on a profile.
///
/// Stored and serialized in SCREAMING_SNAKE_CASE (`SUPER_ADMIN`), which is also
/// the form accepted by `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Director,
    Profesor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::Director,
        Role::Profesor,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Director => "DIRECTOR",
            Role::Profesor => "PROFESOR",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "DIRECTOR" => Ok(Role::Director),
            "PROFESOR" => Ok(Role::Profesor),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_what_it_prints() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let role: Role = serde_json::from_str("\"PROFESOR\"").unwrap();
        assert_eq!(role, Role::Profesor);
    }

    #[test]
    fn rejects_lowercase_and_unknown() {
        assert!("admin".parse::<Role>().is_err());
        assert!("ROOT".parse::<Role>().is_err());
    }
}
