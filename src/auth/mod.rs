//! Authentication and authorization
//!
//! Provides:
//! - Argon2 password hashing
//! - JWT token generation and validation
//! - The `AuthUser` extractor that gates every file operation

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::AuthUser;
pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, verify_password};

use serde::{Deserialize, Serialize};

/// Caller roles. Admins see and fetch every file; users only their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parse a stored role, defaulting unknown values to the least
    /// privileged.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}
