//! Role Right Model
//!
//! One row per (role, section, route) with independent CRUD flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Section discriminator for backend routes
pub const SECTION_BACKEND: &str = "be";

/// Grant record for one route template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RoleRight {
    pub id: i64,
    pub role_id: i64,
    pub section: String,
    /// Router path template, e.g. `/users/user/{user_id}`
    pub route: String,
    pub r_create: bool,
    pub r_read: bool,
    pub r_update: bool,
    pub r_delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_section() -> String {
    SECTION_BACKEND.to_string()
}

/// Create role right payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleRightCreate {
    #[serde(default = "default_section")]
    #[validate(length(min = 1, max = 20))]
    pub section: String,
    #[validate(length(min = 1, max = 255))]
    pub route: String,
    #[serde(default)]
    pub r_create: bool,
    #[serde(default)]
    pub r_read: bool,
    #[serde(default)]
    pub r_update: bool,
    #[serde(default)]
    pub r_delete: bool,
}

/// Update role right payload (flags only; section and route are the identity)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRightUpdate {
    pub r_create: Option<bool>,
    pub r_read: Option<bool>,
    pub r_update: Option<bool>,
    pub r_delete: Option<bool>,
}
