use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, Transaction, TransactionKind, transactions};

use super::super::{Engine, access::require_transaction};

/// Filters for listing the transactions of a user.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Restrict to a single account.
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    /// Only recurring templates.
    pub recurring_only: bool,
    pub limit: Option<u64>,
}

impl Engine {
    /// Returns one transaction owned by the user.
    pub async fn transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let model = require_transaction(&self.database, transaction_id, user_id).await?;
        Transaction::try_from(model)
    }

    /// Lists the user's transactions, most recent `occurred_at` first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.to_string()));
        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if filter.recurring_only {
            query = query.filter(transactions::Column::IsRecurring.eq(true));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
