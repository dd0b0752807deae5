pub use accounts::{Account, AccountKind, AccountWithTransactions};
pub use commands::{
    NewAccountCmd, NewTransactionCmd, SyncUserCmd, TransactionFields, UpdateTransactionCmd,
};
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, MAX_WRITE_ATTEMPTS, RecurringRun, TransactionListFilter};
pub use recurrence::{RecurringInterval, next_recurring_date, next_recurring_date_from_str};
pub use transactions::{Transaction, TransactionKind};
pub use users::UserProfile;

mod accounts;
mod commands;
mod error;
mod money;
mod ops;
mod recurrence;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
