//! Authenticated callers and their roles.

use serde::{Deserialize, Serialize};

/// Back-office role stored in `profiles.role`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Superuser; passes every role check.
    AdminAlfa,
    Admin,
    Editor,
    Finance,
    Author,
    #[default]
    Reader,
}

impl Role {
    /// Unknown or missing roles are `Reader`.
    pub fn from_token(token: Option<&str>) -> Self {
        let token = token.map(|t| t.trim().to_lowercase());
        match token.as_deref() {
            Some("admin_alfa") => Self::AdminAlfa,
            Some("admin") => Self::Admin,
            Some("editor") => Self::Editor,
            Some("finance" | "financeiro") => Self::Finance,
            Some("author" | "autor") => Self::Author,
            _ => Self::Reader,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminAlfa => "admin_alfa",
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Finance => "finance",
            Self::Author => "author",
            Self::Reader => "reader",
        }
    }

    /// `true` when the role is listed or is the superuser.
    pub fn is_any_of(self, allowed: &[Role]) -> bool {
        self == Self::AdminAlfa || allowed.contains(&self)
    }
}

/// The user behind a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
}
