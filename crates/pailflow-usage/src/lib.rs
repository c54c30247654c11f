mod accounting;
mod admission;
mod error;
mod tracker;
mod transactions;
mod users;

pub use accounting::{create_usage_transaction, TransactionOutcome};
pub use admission::{has_sufficient_credits, DEFAULT_MIN_CREDITS};
pub use error::{Result, UsageError};
pub use tracker::update_workflow_usage_cost;
pub use transactions::{TransactionStore, UsageTransaction};
pub use users::{User, UserStore};
