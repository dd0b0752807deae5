//! Users table.
//!
//! The engine scopes accounts and transactions by `user_id`, which is the
//! username resolved by the HTTP layer.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Public profile of a user (never carries the credential).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for UserProfile {
    fn from(model: Model) -> Self {
        Self {
            username: model.username,
            name: model.name,
            email: model.email,
            image_url: model.image_url,
            updated_at: model.updated_at,
        }
    }
}
