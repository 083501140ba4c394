//! Role Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role entity: a named permission group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create role payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Update role payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}
