// SPDX-License-Identifier: MIT

//! Entitlement and credit rules.
//!
//! Pure functions over the user profile: plan tier detection, remaining
//! credits, the lazy monthly reset, and the lock-state gate used by read
//! paths. All side effects (persisting a reset, spending a credit) live
//! in the database layer.

use crate::models::user::STATUS_ACTIVE;
use crate::models::User;
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashSet;

/// Elite plan IDs carry this prefix (e.g. `ELITE_MENSAL`, `ELITE_VITALICIO`).
const ELITE_PLAN_PREFIX: &str = "ELITE";

/// Whether the user is on an Elite entitlement.
///
/// Either the plan itself is an Elite plan, or the Stripe subscription is
/// currently active. Elite users never consult credits.
pub fn is_elite(user: &User) -> bool {
    if user.plano.starts_with(ELITE_PLAN_PREFIX) {
        return true;
    }
    user.subscription_status.as_deref() == Some(STATUS_ACTIVE)
}

/// Unlock credits remaining in the current period.
pub fn remaining_credits(user: &User) -> u32 {
    user.monthly_credits.saturating_sub(user.credits_used)
}

/// Whether a prompt is unlocked for display/use.
///
/// Pure gate: Elite sees everything; Free sees what it has unlocked.
pub fn is_prompt_unlocked(is_elite: bool, unlocked: &HashSet<String>, prompt_id: &str) -> bool {
    is_elite || unlocked.contains(prompt_id)
}

/// Monthly credit ceiling for a plan.
///
/// Elite plans keep the same ceiling on paper, but the counters are never
/// consulted while the plan is Elite.
pub fn plan_monthly_ceiling(_plano: &str, free_ceiling: u32) -> u32 {
    free_ceiling
}

/// Whether the profile's credit period is stale.
///
/// True when `last_credit_reset` falls in a different calendar month or
/// year than `now`.
pub fn needs_period_reset(user: &User, now: DateTime<Utc>) -> bool {
    user.last_credit_reset.year() != now.year() || user.last_credit_reset.month() != now.month()
}

/// Lazily roll the profile into the current credit period.
///
/// Returns `true` if a reset was applied (the caller must persist the
/// profile). There is no scheduler; this runs whenever a profile is
/// loaded.
pub fn ensure_current_period(user: &mut User, free_ceiling: u32, now: DateTime<Utc>) -> bool {
    if !needs_period_reset(user, now) {
        return false;
    }

    user.credits_used = 0;
    user.monthly_credits = plan_monthly_ceiling(&user.plano, free_ceiling);
    user.last_credit_reset = now;
    user.updated_at = now;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::PLAN_FREE;
    use chrono::TimeZone;

    fn free_user(monthly: u32, used: u32) -> User {
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
        let mut user = User::new("u1".to_string(), None, None, monthly, now);
        user.credits_used = used;
        user
    }

    #[test]
    fn remaining_credits_saturates() {
        let user = free_user(5, 2);
        assert_eq!(remaining_credits(&user), 3);

        // Over-consumption (legacy data) must not underflow
        let user = free_user(1, 3);
        assert_eq!(remaining_credits(&user), 0);
    }

    #[test]
    fn free_user_is_not_elite() {
        let user = free_user(5, 0);
        assert!(!is_elite(&user));
        assert_eq!(user.plano, PLAN_FREE);
    }

    #[test]
    fn elite_plan_bypasses_credits() {
        let mut user = free_user(1, 1);
        user.plano = "ELITE_VITALICIO".to_string();
        assert!(is_elite(&user));

        // Active subscription alone also grants Elite
        let mut user = free_user(1, 1);
        user.subscription_status = Some(STATUS_ACTIVE.to_string());
        assert!(is_elite(&user));

        // Canceled subscription does not
        let mut user = free_user(1, 1);
        user.subscription_status = Some("canceled".to_string());
        assert!(!is_elite(&user));
    }

    #[test]
    fn lock_state_gate() {
        let unlocked: HashSet<String> = ["p1".to_string()].into_iter().collect();

        assert!(is_prompt_unlocked(false, &unlocked, "p1"));
        assert!(!is_prompt_unlocked(false, &unlocked, "p2"));
        // Elite sees everything regardless of the unlocked set
        assert!(is_prompt_unlocked(true, &unlocked, "p2"));
        assert!(is_prompt_unlocked(true, &HashSet::new(), "p1"));
    }

    #[test]
    fn reset_applies_on_month_rollover() {
        let mut user = free_user(5, 5);
        let next_month = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 1).unwrap();

        assert!(needs_period_reset(&user, next_month));
        assert!(ensure_current_period(&mut user, 5, next_month));

        assert_eq!(user.credits_used, 0);
        assert_eq!(user.monthly_credits, 5);
        assert_eq!(user.last_credit_reset, next_month);
    }

    #[test]
    fn reset_applies_on_year_rollover_same_month() {
        let mut user = free_user(5, 3);
        let next_year = Utc.with_ymd_and_hms(2027, 8, 10, 12, 0, 0).unwrap();

        assert!(needs_period_reset(&user, next_year));
        assert!(ensure_current_period(&mut user, 5, next_year));
        assert_eq!(user.credits_used, 0);
    }

    #[test]
    fn reset_is_noop_within_same_month() {
        let mut user = free_user(5, 4);
        let later_same_month = Utc.with_ymd_and_hms(2026, 8, 28, 23, 59, 0).unwrap();

        assert!(!ensure_current_period(&mut user, 5, later_same_month));
        assert_eq!(user.credits_used, 4);
    }

    #[test]
    fn reset_picks_up_configured_ceiling() {
        let mut user = free_user(5, 5);
        let next_month = Utc.with_ymd_and_hms(2026, 9, 2, 0, 0, 0).unwrap();

        assert!(ensure_current_period(&mut user, 10, next_month));
        assert_eq!(user.monthly_credits, 10);
        assert_eq!(remaining_credits(&user), 10);
    }
}
