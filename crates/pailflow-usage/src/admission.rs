use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::users::UserStore;

/// Default minimum balance required to start a bot call (spec.md §4.7
/// "Admission check", `flow/db.py::check_user_credits`'s `0.15` default).
pub const DEFAULT_MIN_CREDITS: f64 = 0.15;

/// Checks whether `unkey_key_id` has at least `min_credits` (defaulting to
/// [`DEFAULT_MIN_CREDITS`], overridable from `placement.bot_call_rate_per_minute`
/// per spec §2 supplemented feature). Returns `(has_credits, balance)` —
/// `balance` is `None` when the user can't be resolved at all.
#[instrument(skip(users), fields(unkey_key_id, min_credits))]
pub fn has_sufficient_credits(
    users: &UserStore,
    unkey_key_id: &str,
    min_credits: Option<f64>,
) -> Result<(bool, Option<f64>)> {
    let min_credits = min_credits.unwrap_or(DEFAULT_MIN_CREDITS);

    let Some(user) = users.get_by_unkey_id(unkey_key_id)? else {
        warn!(unkey_key_id, "user not found — cannot check credits");
        return Ok((false, None));
    };

    let has_credits = user.credit_balance >= min_credits;
    if has_credits {
        info!(
            unkey_key_id,
            balance = user.credit_balance,
            min_credits,
            "sufficient credits"
        );
    } else {
        info!(
            unkey_key_id,
            balance = user.credit_balance,
            min_credits,
            "insufficient credits"
        );
    }
    Ok((has_credits, Some(user.credit_balance)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn unknown_user_is_denied_with_no_balance() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let (has_credits, balance) = has_sufficient_credits(&users, "nope", None).unwrap();
        assert!(!has_credits);
        assert_eq!(balance, None);
    }

    #[test]
    fn user_below_minimum_is_denied() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-1", 0.05).unwrap();
        let (has_credits, balance) = has_sufficient_credits(&users, "unkey-1", None).unwrap();
        assert!(!has_credits);
        assert_eq!(balance, Some(0.05));
    }

    #[test]
    fn user_at_or_above_minimum_is_admitted() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-2", 1.00).unwrap();
        let (has_credits, balance) = has_sufficient_credits(&users, "unkey-2", None).unwrap();
        assert!(has_credits);
        assert_eq!(balance, Some(1.00));
    }

    #[test]
    fn custom_minimum_overrides_default() {
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-3", 0.20).unwrap();
        let (has_credits, _) = has_sufficient_credits(&users, "unkey-3", Some(0.30)).unwrap();
        assert!(!has_credits);
    }
}
