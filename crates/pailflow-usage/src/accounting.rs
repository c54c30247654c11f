use pailflow_core::types::WorkflowThread;
use pailflow_pricing::calculate_bot_call_cost;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::transactions::{TransactionStore, UsageTransaction};
use crate::users::UserStore;

/// Result of a [`create_usage_transaction`] attempt — richer than a bare
/// bool so callers can log precisely, grounded on
/// `skynet-scheduler::SchedulerEngine::tick`'s pattern of returning
/// per-item outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    Created { transaction_id: String, user_id: String },
    AlreadyExists,
    NoUser,
}

/// Implements spec.md §4.7 "Transaction creation" steps 1-6. Called twice
/// per run — primary at bot-worker shutdown, secondary at the end of the
/// post-call pipeline — and is idempotent either way via the unique
/// constraint on `workflow_thread_id`.
#[instrument(skip(users, transactions, thread), fields(workflow_thread_id = %thread.workflow_thread_id))]
pub fn create_usage_transaction(
    users: &UserStore,
    transactions: &TransactionStore,
    thread: &WorkflowThread,
    rate_per_minute: f64,
) -> Result<TransactionOutcome> {
    if transactions.exists_for_thread(thread.workflow_thread_id.as_str())? {
        return Ok(TransactionOutcome::AlreadyExists);
    }

    let Some(unkey_key_id) = thread.unkey_key_id.as_deref() else {
        warn!(
            workflow_thread_id = %thread.workflow_thread_id,
            "no unkey_key_id on thread — cannot create transaction"
        );
        return Ok(TransactionOutcome::NoUser);
    };

    let Some(user) = users.get_by_unkey_id(unkey_key_id)? else {
        warn!(unkey_key_id, "user not found — cannot create transaction");
        return Ok(TransactionOutcome::NoUser);
    };

    let duration_s = thread.bot_duration_s.unwrap_or(0);
    let customer_charge = calculate_bot_call_cost(duration_s, rate_per_minute)?;
    let amount = -customer_charge.abs();

    let lpl_cost = if thread.usage_stats.total_cost_usd == 0.0 {
        None
    } else {
        Some(thread.usage_stats.total_cost_usd)
    };

    let transaction_id = uuid::Uuid::new_v4().to_string();
    let txn = UsageTransaction {
        id: transaction_id.clone(),
        user_id: user.id.clone(),
        amount,
        duration_s,
        lpl_cost,
        workflow_thread_id: thread.workflow_thread_id.to_string(),
        bot_id: thread.bot_id.as_ref().map(|b| b.to_string()),
        room_name: thread.room_name.clone(),
    };

    if !transactions.insert_if_absent(&txn)? {
        // Lost the race against a concurrent caller; that attempt already won.
        return Ok(TransactionOutcome::AlreadyExists);
    }

    let new_balance = users.debit(&user.id, amount.abs())?;
    if new_balance < 0.0 {
        warn!(
            user_id = %user.id,
            new_balance,
            "user credit balance went negative after debit"
        );
    }

    Ok(TransactionOutcome::Created {
        transaction_id,
        user_id: user.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn thread_with_duration(duration_s: i64, unkey_key_id: Option<&str>) -> WorkflowThread {
        let mut thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        thread.bot_duration_s = Some(duration_s);
        thread.unkey_key_id = unkey_key_id.map(String::from);
        thread.usage_stats.total_cost_usd = 0.02;
        thread
    }

    #[test]
    fn no_unkey_id_yields_no_user() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let thread = thread_with_duration(60, None);
        let outcome =
            create_usage_transaction(&users, &transactions, &thread, 0.15).unwrap();
        assert_eq!(outcome, TransactionOutcome::NoUser);
    }

    #[test]
    fn unknown_user_yields_no_user() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let thread = thread_with_duration(60, Some("ghost"));
        let outcome =
            create_usage_transaction(&users, &transactions, &thread, 0.15).unwrap();
        assert_eq!(outcome, TransactionOutcome::NoUser);
    }

    #[test]
    fn creates_transaction_and_debits_user() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-1", 1.00).unwrap();
        let thread = thread_with_duration(60, Some("unkey-1"));

        let outcome =
            create_usage_transaction(&users, &transactions, &thread, 0.15).unwrap();
        assert!(matches!(outcome, TransactionOutcome::Created { .. }));

        let user = users.get_by_unkey_id("unkey-1").unwrap().unwrap();
        assert!((user.credit_balance - 0.85).abs() < 1e-9);
    }

    #[test]
    fn repeated_attempts_are_idempotent() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-1", 1.00).unwrap();
        let thread = thread_with_duration(60, Some("unkey-1"));

        create_usage_transaction(&users, &transactions, &thread, 0.15).unwrap();
        let second = create_usage_transaction(&users, &transactions, &thread, 0.15).unwrap();
        assert_eq!(second, TransactionOutcome::AlreadyExists);

        let user = users.get_by_unkey_id("unkey-1").unwrap().unwrap();
        assert!((user.credit_balance - 0.85).abs() < 1e-9);
    }
}
