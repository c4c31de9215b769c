/// Economy ledger: inventory mutation helpers and atomic balance/item movements.
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::errors::{EconomyError, InventoryError};
use super::outcome::{ActionResult, Reason};
use super::storage::{EconomyStore, Mutation};
use super::types::{EconomyRecord, InventoryLine};

// ============================================================================
// Inventory Operations (pure, on an in-memory record)
// ============================================================================

/// Merge `amount` of `item_id` into the record, appending a new line if needed.
/// Adding zero is a no-op.
pub fn add_to_inventory(record: &mut EconomyRecord, item_id: &str, amount: u32) {
    if amount == 0 {
        return;
    }
    if let Some(line) = record
        .inventory
        .iter_mut()
        .find(|line| line.item_id == item_id)
    {
        line.amount = line.amount.saturating_add(amount);
        return;
    }
    record.inventory.push(InventoryLine::new(item_id, amount));
}

/// Remove `amount` of `item_id`, pruning the line when it reaches zero.
/// Returns the amount left afterwards.
pub fn consume_from_inventory(
    record: &mut EconomyRecord,
    item_id: &str,
    amount: u32,
) -> Result<u32, InventoryError> {
    let Some(index) = record
        .inventory
        .iter()
        .position(|line| line.item_id == item_id)
    else {
        return Err(InventoryError::NotOwned {
            item_id: item_id.to_string(),
        });
    };

    let have = record.inventory[index].amount;
    if amount > have {
        return Err(InventoryError::NotEnough {
            item_id: item_id.to_string(),
            have,
            wanted: amount,
        });
    }

    let left = have - amount;
    if left == 0 {
        record.inventory.remove(index);
    } else {
        record.inventory[index].amount = left;
    }
    Ok(left)
}

// ============================================================================
// Atomic store operations
// ============================================================================

/// Atomically add `amount` to a user's balance, creating the record if needed.
pub fn credit_balance(
    store: &EconomyStore,
    user_id: &str,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<EconomyRecord, EconomyError> {
    store.get_or_create(user_id, now)?;
    store
        .update_if(
            user_id,
            |_| true,
            |record| {
                record.balance = record.balance.saturating_add(amount.max(0));
                record.touch(now);
            },
        )?
        .ok_or_else(|| EconomyError::NotFound(format!("economy record: {}", user_id)))
}

/// Atomically subtract `amount` if the balance covers it. `None` means the
/// balance was insufficient (or the record does not exist).
pub fn debit_balance_if_covered(
    store: &EconomyStore,
    user_id: &str,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<Option<EconomyRecord>, EconomyError> {
    store.update_if(
        user_id,
        |record| record.balance >= amount,
        |record| {
            record.balance -= amount;
            record.touch(now);
        },
    )
}

/// Atomically add items to a user's inventory, creating the record if needed.
pub fn grant_item(
    store: &EconomyStore,
    user_id: &str,
    item_id: &str,
    amount: u32,
    now: DateTime<Utc>,
) -> Result<EconomyRecord, EconomyError> {
    store.get_or_create(user_id, now)?;
    store
        .update_if(
            user_id,
            |_| true,
            |record| {
                add_to_inventory(record, item_id, amount);
                record.touch(now);
            },
        )?
        .ok_or_else(|| EconomyError::NotFound(format!("economy record: {}", user_id)))
}

/// Atomically consume items, reporting `not-owned` / `not-enough` otherwise.
pub fn consume_item(
    store: &EconomyStore,
    user_id: &str,
    item_id: &str,
    amount: u32,
    now: DateTime<Utc>,
) -> Result<ActionResult, EconomyError> {
    if amount == 0 {
        return Ok(ActionResult::rejected(Reason::InvalidAction));
    }
    store.get_or_create(user_id, now)?;
    let outcome = store.update(user_id, |record| {
        match consume_from_inventory(record, item_id, amount) {
            Ok(left) => {
                record.touch(now);
                Mutation::Commit(Ok(left))
            }
            Err(err) => Mutation::Abort(Err(err)),
        }
    })?;
    match outcome {
        Some((Ok(_), record)) => Ok(ActionResult::success()
            .with_amount(amount as i64)
            .with_balance(record.balance)),
        Some((Err(err), _)) => Ok(ActionResult::from_inventory_error(&err)),
        None => Err(EconomyError::NotFound(format!("economy record: {}", user_id))),
    }
}

/// Move currency between two users.
///
/// The source debit ("decrement if balance ≥ amount") is the commit point.
/// The destination record is created by the credit. If that credit faults, a
/// compensating refund is attempted on the source before the fault is returned.
pub fn transfer_balance(
    store: &EconomyStore,
    from: &str,
    to: &str,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<ActionResult, EconomyError> {
    if amount <= 0 || from == to {
        return Ok(ActionResult::rejected(Reason::InvalidAction));
    }
    store.get_or_create(from, now)?;

    let Some(source) = debit_balance_if_covered(store, from, amount, now)? else {
        debug!("transfer: {} cannot cover {} for {}", from, amount, to);
        return Ok(ActionResult::rejected(Reason::Insufficient));
    };

    match credit_balance(store, to, amount, now) {
        Ok(_) => {
            info!("transfer: {} -> {} amount={}", from, to, amount);
            Ok(ActionResult::success()
                .with_amount(amount)
                .with_balance(source.balance))
        }
        Err(err) => {
            warn!(
                "transfer: credit to {} failed after debiting {}: {}; refunding",
                to, from, err
            );
            compensate(credit_balance(store, from, amount, now).map(|_| ()), from, err)
        }
    }
}

/// Move inventory items between two users, with the same commit and
/// compensation rules as [`transfer_balance`].
pub fn transfer_inventory_item(
    store: &EconomyStore,
    from: &str,
    to: &str,
    item_id: &str,
    amount: u32,
    now: DateTime<Utc>,
) -> Result<ActionResult, EconomyError> {
    if amount == 0 || from == to {
        return Ok(ActionResult::rejected(Reason::InvalidAction));
    }
    store.get_or_create(from, now)?;

    let debited = store.update(from, |record| {
        match consume_from_inventory(record, item_id, amount) {
            Ok(_) => {
                record.touch(now);
                Mutation::Commit(true)
            }
            Err(_) => Mutation::Abort(false),
        }
    })?;
    let Some((true, source)) = debited else {
        debug!("transfer: {} lacks {}x{} for {}", from, amount, item_id, to);
        return Ok(ActionResult::rejected(Reason::Insufficient));
    };

    match grant_item(store, to, item_id, amount, now) {
        Ok(_) => {
            info!("transfer: {} -> {} item={} x{}", from, to, item_id, amount);
            Ok(ActionResult::success()
                .with_amount(amount as i64)
                .with_balance(source.balance))
        }
        Err(err) => {
            warn!(
                "transfer: item grant to {} failed after debiting {}: {}; refunding",
                to, from, err
            );
            compensate(
                grant_item(store, from, item_id, amount, now).map(|_| ()),
                from,
                err,
            )
        }
    }
}

fn compensate(
    refund: Result<(), EconomyError>,
    from: &str,
    original: EconomyError,
) -> Result<ActionResult, EconomyError> {
    match refund {
        Ok(()) => Err(original),
        Err(refund_err) => {
            error!(
                "transfer: refund to {} failed: {} (original fault: {})",
                from, refund_err, original
            );
            Err(EconomyError::Internal(format!(
                "transfer debit from {} could not be compensated: {}",
                from, refund_err
            )))
        }
    }
}
