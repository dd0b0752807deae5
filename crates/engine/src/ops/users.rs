use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};

use crate::{
    EngineError, ResultEngine, SyncUserCmd, UserProfile, users, util::normalize_optional_text,
};

use super::{Engine, access::require_user, with_tx};

impl Engine {
    /// Returns the profile of a user.
    pub async fn user_profile(&self, username: &str) -> ResultEngine<UserProfile> {
        require_user(&self.database, username)
            .await
            .map(UserProfile::from)
    }

    /// Refreshes the stored profile of the calling user.
    ///
    /// Blank fields keep the stored value. The row is only written when
    /// something actually changed.
    pub async fn sync_user(&self, cmd: SyncUserCmd) -> ResultEngine<UserProfile> {
        let name = normalize_optional_text(cmd.name.as_deref());
        let email = normalize_optional_text(cmd.email.as_deref());
        let image_url = normalize_optional_text(cmd.image_url.as_deref());
        if let Some(email) = email.as_deref()
            && !email.contains('@')
        {
            return Err(EngineError::Validation(format!("invalid email: {email}")));
        }

        with_tx!(self, |db_tx| {
            let user = require_user(&db_tx, &cmd.username).await?;

            let next_name = name.or_else(|| user.name.clone());
            let next_email = email.or_else(|| user.email.clone());
            let next_image = image_url.or_else(|| user.image_url.clone());
            if next_name == user.name && next_email == user.email && next_image == user.image_url {
                return Ok(UserProfile::from(user));
            }

            let mut active: users::ActiveModel = user.into();
            active.name = ActiveValue::Set(next_name);
            active.email = ActiveValue::Set(next_email);
            active.image_url = ActiveValue::Set(next_image);
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;

            Ok(UserProfile::from(model))
        })
    }
}
