//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (account creation, transaction create/update, profile sync), keeping call
//! sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, Money, RecurringInterval, TransactionKind};

/// Fields shared by transaction creation and full updates.
#[derive(Clone, Debug)]
pub struct TransactionFields {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
}

impl TransactionFields {
    #[must_use]
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        amount: Money,
        category: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            kind,
            amount,
            category: category.into(),
            description: None,
            occurred_at,
            is_recurring: false,
            recurring_interval: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the transaction as recurring with the given interval.
    #[must_use]
    pub fn recurring(mut self, interval: RecurringInterval) -> Self {
        self.is_recurring = true;
        self.recurring_interval = Some(interval);
        self
    }

    /// Raw recurrence flag/interval pair as received from a form.
    #[must_use]
    pub fn recurrence(mut self, is_recurring: bool, interval: Option<RecurringInterval>) -> Self {
        self.is_recurring = is_recurring;
        self.recurring_interval = interval;
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: String,
    pub fields: TransactionFields,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, fields: TransactionFields) -> Self {
        Self {
            user_id: user_id.into(),
            fields,
        }
    }
}

/// Replace every editable field of an existing transaction.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub fields: TransactionFields,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid, user_id: impl Into<String>, fields: TransactionFields) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            fields,
        }
    }
}

/// Create an account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub initial_balance: Money,
    pub is_default: bool,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
        initial_balance: Money,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            initial_balance,
            is_default: false,
        }
    }

    #[must_use]
    pub fn default_account(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// Upsert the profile of the calling user.
#[derive(Clone, Debug)]
pub struct SyncUserCmd {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

impl SyncUserCmd {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: None,
            email: None,
            image_url: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}
