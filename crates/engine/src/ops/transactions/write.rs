use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Money, NewTransactionCmd, RecurringInterval, ResultEngine, Transaction,
    TransactionFields, UpdateTransactionCmd, accounts, next_recurring_date, transactions,
};

use super::super::{
    Engine,
    access::{require_account, require_transaction},
    retry_on_conflict, with_tx,
};
use super::{ValidatedFields, validate_fields};

impl Engine {
    /// Creates a transaction and moves the account balance by its signed
    /// amount, both in one DB transaction.
    ///
    /// Fails with [`EngineError::NotFound`] when the account does not belong
    /// to the caller.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Transaction> {
        let validated = validate_fields(&cmd.fields)?;
        retry_on_conflict!(
            "create_transaction",
            self.try_create_transaction(&cmd.user_id, &cmd.fields, &validated)
        )
    }

    async fn try_create_transaction(
        &self,
        user_id: &str,
        fields: &TransactionFields,
        validated: &ValidatedFields,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let account = require_account(&db_tx, fields.account_id, user_id).await?;

            let now = Utc::now();
            let tx = Transaction {
                id: Uuid::new_v4(),
                account_id: fields.account_id,
                user_id: user_id.to_string(),
                kind: fields.kind,
                amount: fields.amount,
                category: validated.category.clone(),
                description: validated.description.clone(),
                occurred_at: fields.occurred_at,
                is_recurring: validated.is_recurring(),
                recurring_interval: validated.recurring_interval,
                next_recurring_date: validated.next_recurring_date,
                last_processed_at: None,
                created_at: now,
                updated_at: now,
            };
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            self.apply_balance_delta(&db_tx, &account, tx.signed_amount())
                .await?;

            Ok(tx)
        })
    }

    /// Rewrites a transaction and applies `new contribution - old contribution`
    /// to the balance, in one DB transaction.
    ///
    /// Moving the transaction to another account of the caller takes the old
    /// contribution off the old account and books the new one on the new
    /// account. The recurring schedule is recomputed from the new fields, but
    /// never moves back before an occurrence the recurring processor already
    /// booked.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        let validated = validate_fields(&cmd.fields)?;
        retry_on_conflict!(
            "update_transaction",
            self.try_update_transaction(cmd.transaction_id, &cmd.user_id, &cmd.fields, &validated)
        )
    }

    async fn try_update_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        fields: &TransactionFields,
        validated: &ValidatedFields,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let original_model = require_transaction(&db_tx, transaction_id, user_id).await?;
            let original = Transaction::try_from(original_model)?;

            let old_delta = original.signed_amount();
            let new_delta = fields.kind.signed(fields.amount);

            let old_account = require_account(&db_tx, original.account_id, user_id).await?;
            if fields.account_id == original.account_id {
                self.apply_balance_delta(&db_tx, &old_account, new_delta - old_delta)
                    .await?;
            } else {
                let new_account = require_account(&db_tx, fields.account_id, user_id).await?;
                self.apply_balance_delta(&db_tx, &old_account, -old_delta)
                    .await?;
                self.apply_balance_delta(&db_tx, &new_account, new_delta)
                    .await?;
            }

            let next_recurring = match (validated.recurring_interval, validated.next_recurring_date) {
                (Some(interval), Some(next)) => Some(resume_schedule(next, interval, &original)?),
                _ => None,
            };

            let updated = Transaction {
                id: original.id,
                account_id: fields.account_id,
                user_id: original.user_id,
                kind: fields.kind,
                amount: fields.amount,
                category: validated.category.clone(),
                description: validated.description.clone(),
                occurred_at: fields.occurred_at,
                is_recurring: validated.is_recurring(),
                recurring_interval: validated.recurring_interval,
                next_recurring_date: next_recurring,
                last_processed_at: original.last_processed_at,
                created_at: original.created_at,
                updated_at: Utc::now(),
            };
            transactions::ActiveModel::from(&updated)
                .update(&db_tx)
                .await?;

            Ok(updated)
        })
    }

    /// Deletes several transactions of the caller at once.
    ///
    /// Ownership of every id is checked before anything is deleted: if one
    /// id is missing or owned by someone else the call fails with
    /// [`EngineError::PartialOwnership`] and nothing changes. Each deleted
    /// transaction's contribution is taken off its account balance in the
    /// same DB transaction. Duplicate ids count once.
    pub async fn delete_transactions(&self, ids: &[Uuid], user_id: &str) -> ResultEngine<u64> {
        let requested: BTreeSet<Uuid> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(0);
        }
        retry_on_conflict!(
            "delete_transactions",
            self.try_delete_transactions(&requested, user_id)
        )
    }

    async fn try_delete_transactions(
        &self,
        requested: &BTreeSet<Uuid>,
        user_id: &str,
    ) -> ResultEngine<u64> {
        let ids: Vec<String> = requested.iter().map(Uuid::to_string).collect();

        with_tx!(self, |db_tx| {
            let owned = transactions::Entity::find()
                .filter(transactions::Column::Id.is_in(ids.clone()))
                .filter(transactions::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            if owned.len() != requested.len() {
                return Err(EngineError::PartialOwnership {
                    requested: requested.len(),
                    owned: owned.len(),
                });
            }

            let mut reversals: HashMap<String, Money> = HashMap::new();
            for model in owned {
                let account_id = model.account_id.clone();
                let tx = Transaction::try_from(model)?;
                *reversals.entry(account_id).or_insert(Money::ZERO) -= tx.signed_amount();
            }

            let deleted = transactions::Entity::delete_many()
                .filter(transactions::Column::Id.is_in(ids.clone()))
                .filter(transactions::Column::UserId.eq(user_id.to_string()))
                .exec(&db_tx)
                .await?;

            for (account_id, delta) in reversals {
                let account = accounts::Entity::find_by_id(account_id)
                    .filter(accounts::Column::UserId.eq(user_id.to_string()))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("Account".to_string()))?;
                self.apply_balance_delta(&db_tx, &account, delta).await?;
            }

            Ok(deleted.rows_affected)
        })
    }
}

/// Steps `next` forward until it reaches the date the processor would book
/// next for `original`, so already booked occurrences are not booked again.
fn resume_schedule(
    mut next: DateTime<Utc>,
    interval: RecurringInterval,
    original: &Transaction,
) -> ResultEngine<DateTime<Utc>> {
    let (Some(_), Some(booked_until)) = (original.last_processed_at, original.next_recurring_date)
    else {
        return Ok(next);
    };
    while next < booked_until {
        next = next_recurring_date(next, interval).ok_or_else(|| {
            EngineError::Validation("next recurring date is out of range".to_string())
        })?;
    }
    Ok(next)
}
