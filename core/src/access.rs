//! Caller identity for mutation entry points.
//!
//! The core does not authenticate anyone. Callers hand in the current user
//! and must pass `ensure_admin` before importing or purging.

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Chef,
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Chef => "chef",
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chef" => Ok(Role::Chef),
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(CatalogError::Forbidden {
                role: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            email: email.trim().to_string(),
            role,
        }
    }
}

pub fn ensure_admin(user: &CurrentUser) -> CatalogResult<()> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        log::warn!("access: {} ({}) refused catalog mutation", user.email, user.role.as_str());
        Err(CatalogError::Forbidden {
            role: user.role.as_str().to_string(),
        })
    }
}
