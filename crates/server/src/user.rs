//! Users as seen by the HTTP layer: credential lookup and profile sync.

use api_types::{
    envelope::Envelope,
    user::{UserSync, UserView},
};
use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use sea_orm::entity::prelude::*;

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Identity resolved for the current request, if any.
#[derive(Clone, Debug, Default)]
pub struct Caller(Option<String>);

impl Caller {
    pub fn new(username: Option<String>) -> Self {
        Self(username)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Identity for read-only operations, which skip rate limiting.
    pub(crate) fn require(&self) -> Result<&str, ServerError> {
        self.username()
            .ok_or(ServerError::Guard(crate::GuardError::NotAuthenticated))
    }
}

pub(crate) fn user_view(profile: engine::UserProfile) -> UserView {
    UserView {
        username: profile.username,
        name: profile.name,
        email: profile.email,
        image_url: profile.image_url,
        updated_at: profile.updated_at,
    }
}

/// Refreshes the caller's profile.
pub async fn sync(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<UserSync>, ServerError>,
) -> Result<Json<Envelope<UserView>>, ServerError> {
    let username = state.guard.check(&caller).await?;

    let mut cmd = engine::SyncUserCmd::new(username);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(email) = payload.email {
        cmd = cmd.email(email);
    }
    if let Some(image_url) = payload.image_url {
        cmd = cmd.image_url(image_url);
    }
    let profile = state.engine.sync_user(cmd).await?;

    Ok(Json(Envelope::ok(user_view(profile))))
}

/// Returns the caller's profile.
pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<Envelope<UserView>>, ServerError> {
    let username = caller.require()?;
    let profile = state.engine.user_profile(username).await?;
    Ok(Json(Envelope::ok(user_view(profile))))
}
