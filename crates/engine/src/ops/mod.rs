use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod accounts;
mod balances;
mod recurring;
mod transactions;
mod users;

pub use recurring::RecurringRun;
pub use transactions::TransactionListFilter;

/// Number of times a unit of work is replayed after losing a balance
/// compare-and-swap to a concurrent writer.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// Any early return (including `?`) drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

/// Replays a unit of work while it fails with [`crate::EngineError::Conflict`].
macro_rules! retry_on_conflict {
    ($label:literal, $unit:expr) => {{
        let mut attempt = 1;
        loop {
            match $unit.await {
                Err(crate::EngineError::Conflict(account_id))
                    if attempt < crate::ops::MAX_WRITE_ATTEMPTS =>
                {
                    tracing::warn!(
                        %account_id,
                        attempt,
                        "{}: concurrent balance update, retrying",
                        $label
                    );
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

pub(crate) use retry_on_conflict;
pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
