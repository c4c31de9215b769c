//! Concurrent first touches and claims against one record.
mod common;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use petconomy::economy::{ActivityField, CooldownGate, Reason, RewardRange};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_create_yields_one_record() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            store.get_or_create("newcomer", now).expect("get_or_create")
        }));
    }
    for handle in handles {
        let record = handle.await.expect("join");
        assert_eq!(record.balance, 0);
        assert!(record.inventory.is_empty());
    }

    assert_eq!(store.record_count().unwrap(), 1);
    assert_eq!(store.find("newcomer").unwrap().unwrap().balance, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_inside_window_grant_exactly_one() {
    let (_dir, store) = common::open_store();
    let now = Utc::now();
    store.get_or_create("racer", now).unwrap();
    let window = Duration::seconds(120);

    let mut handles = Vec::new();
    for seed in 0..8u64 {
        let store = store.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            CooldownGate::new(&store)
                .claim(
                    "racer",
                    ActivityField::Fish,
                    window,
                    RewardRange::new(10, 20),
                    now,
                    &mut rng,
                )
                .expect("claim")
        }));
    }

    let mut granted = Vec::new();
    let mut rejected = 0;
    for handle in handles {
        let result = handle.await.expect("join");
        if result.ok {
            granted.push(result.amount.unwrap());
        } else {
            assert_eq!(result.reason, Some(Reason::Cooldown));
            let wait = result.next_in_ms.unwrap();
            assert!(wait > 0 && wait <= window.num_milliseconds());
            rejected += 1;
        }
    }

    assert_eq!(granted.len(), 1, "exactly one claim may win");
    assert_eq!(rejected, 7);
    let record = store.find("racer").unwrap().unwrap();
    assert_eq!(record.balance, granted[0]);
    assert_eq!(record.last_claim(ActivityField::Fish), Some(now));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn staggered_claims_after_window_all_succeed() {
    let (_dir, store) = common::open_store();
    let start = Utc::now();
    store.get_or_create("steady", start).unwrap();
    let window = Duration::hours(1);
    let mut rng = StdRng::seed_from_u64(99);
    let gate = CooldownGate::new(&store);

    let mut total = 0;
    for hour in 0..5 {
        let at = start + Duration::hours(hour);
        let result = gate
            .claim("steady", ActivityField::Work, window, RewardRange::new(25, 60), at, &mut rng)
            .unwrap();
        assert!(result.ok, "hour {} should be claimable", hour);
        total += result.amount.unwrap();
    }
    assert_eq!(store.find("steady").unwrap().unwrap().balance, total);
}
