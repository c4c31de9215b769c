//! Cooldown gate: the atomic "claim if the window elapsed" primitive behind
//! every timed activity.
//!
//! The gate never locks. Correctness under concurrent callers comes from the
//! store's conditional update: the filter "field missing or older than the
//! cutoff" can only be observed by one caller before the field moves to `now`.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::Rng;

use super::errors::EconomyError;
use super::outcome::{ActionResult, Reason};
use super::storage::EconomyStore;
use super::types::{ActivityField, EconomyRecord, RewardRange};

/// Cooldown gate over one [`EconomyStore`].
pub struct CooldownGate<'a> {
    store: &'a EconomyStore,
}

impl<'a> CooldownGate<'a> {
    pub fn new(store: &'a EconomyStore) -> Self {
        Self { store }
    }

    /// Claim `field` for `user_id` if `cooldown` has elapsed since the last
    /// claim, crediting a reward sampled from `reward` in the same write.
    ///
    /// A rejection carries `cooldown` and the remaining wait. No retries are
    /// performed. The record must already exist; a missing record is reported
    /// as a rejection with no wait.
    pub fn claim<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        field: ActivityField,
        cooldown: Duration,
        reward: RewardRange,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ActionResult, EconomyError> {
        let cutoff = now - cooldown;
        let amount = reward.sample(rng);

        let claimed = self.store.update_if(
            user_id,
            |record| window_elapsed(record, field, cutoff),
            |record| {
                record.balance = record.balance.saturating_add(amount);
                record.cooldowns.insert(field, now);
                record.touch(now);
            },
        )?;

        if let Some(record) = claimed {
            info!(
                "claim: {} {} amount={} balance={}",
                user_id,
                field.as_str(),
                amount,
                record.balance
            );
            return Ok(ActionResult::success()
                .with_amount(amount)
                .with_balance(record.balance));
        }

        let current = self.store.find(user_id)?;
        let next_in_ms = current
            .as_ref()
            .map(|record| remaining_ms(record, field, cooldown, now))
            .unwrap_or(0);
        debug!(
            "claim: {} {} rejected, next in {}ms",
            user_id,
            field.as_str(),
            next_in_ms
        );
        let mut result = ActionResult::wait(Reason::Cooldown, next_in_ms);
        result.balance = current.map(|record| record.balance);
        Ok(result)
    }

    /// Milliseconds until `field` can be claimed again, without claiming.
    pub fn peek(
        &self,
        user_id: &str,
        field: ActivityField,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Result<i64, EconomyError> {
        Ok(self
            .store
            .find(user_id)?
            .map(|record| remaining_ms(&record, field, cooldown, now))
            .unwrap_or(0))
    }
}

fn window_elapsed(record: &EconomyRecord, field: ActivityField, cutoff: DateTime<Utc>) -> bool {
    match record.last_claim(field) {
        Some(last) => last <= cutoff,
        None => true,
    }
}

/// `max(0, last + cooldown - now)` in milliseconds; zero if never claimed.
pub fn remaining_ms(
    record: &EconomyRecord,
    field: ActivityField,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> i64 {
    record
        .last_claim(field)
        .map(|last| (last + cooldown - now).num_milliseconds().max(0))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn first_claim_pays_and_stamps_field() {
        let dir = TempDir::new().unwrap();
        let store = EconomyStore::open(dir.path()).unwrap();
        let now = Utc::now();
        store.get_or_create("u1", now).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let gate = CooldownGate::new(&store);
        let result = gate
            .claim(
                "u1",
                ActivityField::Daily,
                Duration::hours(24),
                RewardRange::new(100, 250),
                now,
                &mut rng,
            )
            .unwrap();
        assert!(result.ok);
        let amount = result.amount.unwrap();
        assert!((100..=250).contains(&amount));
        assert_eq!(result.balance, Some(amount));

        let record = store.find("u1").unwrap().unwrap();
        assert_eq!(record.last_claim(ActivityField::Daily), Some(now));
    }

    #[test]
    fn claim_inside_window_reports_wait() {
        let dir = TempDir::new().unwrap();
        let store = EconomyStore::open(dir.path()).unwrap();
        let now = Utc::now();
        store.get_or_create("u1", now).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let gate = CooldownGate::new(&store);
        let window = Duration::seconds(120);

        gate.claim("u1", ActivityField::Fish, window, RewardRange::NONE, now, &mut rng)
            .unwrap();
        let later = now + Duration::seconds(30);
        let second = gate
            .claim("u1", ActivityField::Fish, window, RewardRange::NONE, later, &mut rng)
            .unwrap();
        assert!(second.is_rejected_with(Reason::Cooldown));
        assert_eq!(second.next_in_ms, Some(90_000));

        let after = now + window;
        let third = gate
            .claim("u1", ActivityField::Fish, window, RewardRange::NONE, after, &mut rng)
            .unwrap();
        assert!(third.ok, "claim at exactly the cutoff is allowed");
    }

    #[test]
    fn missing_record_is_rejected_without_wait() {
        let dir = TempDir::new().unwrap();
        let store = EconomyStore::open(dir.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let result = CooldownGate::new(&store)
            .claim(
                "nobody",
                ActivityField::Work,
                Duration::hours(1),
                RewardRange::new(1, 2),
                Utc::now(),
                &mut rng,
            )
            .unwrap();
        assert!(result.is_rejected_with(Reason::Cooldown));
        assert_eq!(result.next_in_ms, Some(0));
    }

    #[test]
    fn fields_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = EconomyStore::open(dir.path()).unwrap();
        let now = Utc::now();
        store.get_or_create("u1", now).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let gate = CooldownGate::new(&store);
        let window = Duration::minutes(5);
        assert!(gate
            .claim("u1", ActivityField::Mine, window, RewardRange::NONE, now, &mut rng)
            .unwrap()
            .ok);
        assert!(gate
            .claim("u1", ActivityField::Chop, window, RewardRange::NONE, now, &mut rng)
            .unwrap()
            .ok);
        assert_eq!(
            gate.peek("u1", ActivityField::Mine, window, now + Duration::minutes(1))
                .unwrap(),
            240_000
        );
    }
}
