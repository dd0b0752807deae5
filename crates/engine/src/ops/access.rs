use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, accounts, transactions, users};

/// Generates a `require_*` lookup that only returns rows owned by `user_id`.
macro_rules! impl_require_owned {
    ($fn_name:ident, $entity:path, $model:path, $user_col:expr, $label:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            db: &C,
            id: Uuid,
            user_id: &str,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id.to_string())
                .filter($user_col.eq(user_id.to_string()))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound($label.to_string()))
        }
    };
}

impl_require_owned!(
    require_account,
    accounts::Entity,
    accounts::Model,
    accounts::Column::UserId,
    "Account"
);

impl_require_owned!(
    require_transaction,
    transactions::Entity,
    transactions::Model,
    transactions::Column::UserId,
    "Transaction"
);

pub(super) async fn require_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<users::Model> {
    users::Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("User".to_string()))
}
