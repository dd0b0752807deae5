use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Account, AccountWithTransactions, EngineError, NewAccountCmd, ResultEngine, Transaction,
    accounts, transactions, util::normalize_required_text,
};

use super::{
    Engine,
    access::{require_account, require_user},
    with_tx,
};

impl Engine {
    /// Creates an account for `cmd.user_id`.
    ///
    /// The first account of a user always becomes the default one; asking for
    /// a default account clears the flag on every other account of the user
    /// in the same DB transaction.
    pub async fn create_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_text(&cmd.name, "account name")?;
        if cmd.initial_balance.is_negative() {
            return Err(EngineError::Validation(
                "initial balance must be 0 or greater".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            require_user(&db_tx, &cmd.user_id).await?;

            let existing = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(cmd.user_id.clone()))
                .count(&db_tx)
                .await?;
            let is_default = existing == 0 || cmd.is_default;
            if is_default {
                self.clear_default_account(&db_tx, &cmd.user_id).await?;
            }

            let balance = cmd.initial_balance.to_storage();
            let model = accounts::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                name: ActiveValue::Set(name),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                balance: ActiveValue::Set(balance.clone()),
                initial_balance: ActiveValue::Set(balance),
                is_default: ActiveValue::Set(is_default),
                version: ActiveValue::Set(0),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            Account::try_from(model)
        })
    }

    /// Makes `account_id` the only default account of the user.
    pub async fn set_default_account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let account = require_account(&db_tx, account_id, user_id).await?;
            self.clear_default_account(&db_tx, user_id).await?;

            let mut active: accounts::ActiveModel = account.into();
            active.is_default = ActiveValue::Set(true);
            let model = active.update(&db_tx).await?;

            Account::try_from(model)
        })
    }

    async fn clear_default_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::IsDefault, Expr::value(false))
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .filter(accounts::Column::IsDefault.eq(true))
            .exec(db_tx)
            .await?;
        Ok(())
    }

    /// Returns one account owned by the user.
    pub async fn account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        let model = require_account(&self.database, account_id, user_id).await?;
        Account::try_from(model)
    }

    /// Returns every account of the user, newest first.
    pub async fn accounts(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Returns an account together with its transactions, newest first.
    pub async fn account_with_transactions(
        &self,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<AccountWithTransactions> {
        let account = self.account(account_id, user_id).await?;
        let transactions = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id.to_string()))
            .filter(transactions::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(AccountWithTransactions {
            account,
            transactions,
        })
    }
}
