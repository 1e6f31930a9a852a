//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub access_key: String,
    pub secret_key: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            access_key,
            secret_key,
            display_name: None,
            email: None,
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    pub fn root(access_key: String, secret_key: String) -> Self {
        Self {
            id: "root".to_string(),
            access_key,
            secret_key,
            display_name: Some("Root User".to_string()),
            email: None,
            is_admin: true,
            created_at: Utc::now(),
        }
    }
}

impl From<User> for super::acl::Owner {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            display_name: u.display_name,
        }
    }
}
