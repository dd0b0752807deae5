use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, Transaction, accounts, transactions};

use super::{Engine, access::require_account, retry_on_conflict, with_tx};

impl Engine {
    /// Moves an account balance by `delta`.
    ///
    /// `account` must have been read inside `db_tx`. The write only lands if
    /// the row still carries the version that was read; otherwise the unit
    /// fails with [`EngineError::Conflict`] and the caller replays it.
    pub(super) async fn apply_balance_delta(
        &self,
        db_tx: &DatabaseTransaction,
        account: &accounts::Model,
        delta: Money,
    ) -> ResultEngine<Money> {
        let current = Money::from_storage(&account.balance, "balance")?;
        let new_balance = current
            .checked_add(delta)
            .ok_or_else(|| EngineError::Validation("balance overflow".to_string()))?;
        self.store_balance(db_tx, account, new_balance).await?;
        Ok(new_balance)
    }

    async fn store_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account: &accounts::Model,
        new_balance: Money,
    ) -> ResultEngine<()> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::value(new_balance.to_storage()),
            )
            .col_expr(accounts::Column::Version, Expr::value(account.version + 1))
            .filter(accounts::Column::Id.eq(account.id.clone()))
            .filter(accounts::Column::Version.eq(account.version))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::Conflict(account.id.clone()));
        }
        Ok(())
    }

    /// Recomputes an account balance from the ledger
    /// (`initial_balance` + every transaction of the account) and persists it.
    ///
    /// Mutations never use this path; it exists to repair and audit the
    /// denormalized balance.
    pub async fn recompute_balance(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Money> {
        retry_on_conflict!(
            "recompute_balance",
            self.try_recompute_balance(account_id, user_id)
        )
    }

    async fn try_recompute_balance(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            let account = require_account(&db_tx, account_id, user_id).await?;
            let initial = Money::from_storage(&account.initial_balance, "initial balance")?;
            let stored = Money::from_storage(&account.balance, "balance")?;

            let models = transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(account.id.clone()))
                .all(&db_tx)
                .await?;
            let mut expected = initial;
            for model in models {
                expected += Transaction::try_from(model)?.signed_amount();
            }

            if expected != stored {
                tracing::warn!(
                    account_id = %account.id,
                    %stored,
                    %expected,
                    "account balance drifted from ledger"
                );
            }
            self.store_balance(&db_tx, &account, expected).await?;
            Ok(expected)
        })
    }
}
