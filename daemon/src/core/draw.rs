//! The multi-tier draw protocol.
//!
//! Tiers are consumed in ascending order index. Each tier first fills its
//! main-winner slots, then `mains_drawn * runner_up_count` runner-up slots.
//! A candidate is accepted only if it has not been selected earlier in this
//! draw and has never won this same tier in any prior draw; wins in other
//! tiers do not disqualify. Every accepted MSISDN is removed from the pool
//! outright, which guarantees distinct winners regardless of weight skew.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use promodraw_common::{
    crypto::RandomSource,
    models::{EligibleEntry, PrizeTier},
};
use uuid::Uuid;

use super::{
    error::DrawError,
    sampler::{SamplerError, WeightedPool},
};
use crate::config::MAX_SAMPLING_ATTEMPTS;

/// Every tier historically won by each MSISDN, across all prior draws.
pub type PastWinsByTier = HashMap<String, HashSet<Uuid>>;

/// One selection produced by the protocol, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerResult {
    pub prize_tier_id: Uuid,
    pub tier_name: String,
    pub msisdn: String,
    pub position: i32,
    pub is_runner_up: bool,
}

/// Run a complete draw over the given entries and tiers.
///
/// Partial fills are not an error: when the pool or the candidates run out,
/// the tier is truncated and the draw carries on with whatever was selected.
/// `EmptyPool` is only returned when there are no tickets at all.
pub fn draw_winners(
    rng: &dyn RandomSource,
    entries: &[EligibleEntry],
    tiers: &[PrizeTier],
    past_wins: &PastWinsByTier,
) -> Result<Vec<WinnerResult>, DrawError> {
    let mut pool = WeightedPool::build(entries);
    if pool.total_points() == 0 {
        return Err(DrawError::EmptyPool);
    }

    let mut ordered: Vec<&PrizeTier> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.order_index);

    let mut selected: HashSet<String> = HashSet::new();
    let mut results = Vec::new();

    for tier in ordered {
        let quantity = usize::try_from(tier.quantity).unwrap_or(0);
        if quantity == 0 {
            continue;
        }
        if pool.is_empty() {
            debug!("pool exhausted before tier '{}'", tier.tier_name);
            continue;
        }

        let mains = fill_slots(rng, &mut pool, quantity, tier, past_wins, &mut selected)?;
        let mains_drawn = mains.len();
        for (i, msisdn) in mains.into_iter().enumerate() {
            results.push(WinnerResult {
                prize_tier_id: tier.id,
                tier_name: tier.tier_name.clone(),
                msisdn,
                position: (i + 1) as i32,
                is_runner_up: false,
            });
        }

        if mains_drawn < quantity {
            // a main slot went unfilled, so the rest of the tier is skipped
            continue;
        }

        let runner_up_count = usize::try_from(tier.runner_up_count).unwrap_or(0);
        let runner_slots = mains_drawn * runner_up_count;
        if runner_slots == 0 {
            continue;
        }

        let runners = fill_slots(rng, &mut pool, runner_slots, tier, past_wins, &mut selected)?;
        for (i, msisdn) in runners.into_iter().enumerate() {
            results.push(WinnerResult {
                prize_tier_id: tier.id,
                tier_name: tier.tier_name.clone(),
                msisdn,
                position: (i + 1) as i32,
                is_runner_up: true,
            });
        }
    }

    Ok(results)
}

/// Fill up to `slots` unique slots for one tier. Stops early when the pool
/// empties or a slot exceeds the sampling attempt cap; the caller treats a
/// short result as "truncate this tier".
fn fill_slots(
    rng: &dyn RandomSource,
    pool: &mut WeightedPool,
    slots: usize,
    tier: &PrizeTier,
    past_wins: &PastWinsByTier,
    selected: &mut HashSet<String>,
) -> Result<Vec<String>, DrawError> {
    let mut picked = Vec::with_capacity(slots);

    'slots: for _ in 0..slots {
        if pool.is_empty() {
            break;
        }
        let mut attempts = 0u32;
        loop {
            if attempts >= MAX_SAMPLING_ATTEMPTS {
                warn!(
                    "sampling cap reached for tier '{}' with {} of {} slots filled, truncating",
                    tier.tier_name,
                    picked.len(),
                    slots
                );
                break 'slots;
            }
            attempts += 1;

            let word = rng.next_u32()?;
            let candidate = match pool.pick(word) {
                Ok(entry) => entry.msisdn.clone(),
                Err(SamplerError::EmptyPool) => break 'slots,
                Err(err @ SamplerError::IndexOutOfRange) => return Err(err.into()),
            };

            if selected.contains(&candidate) {
                continue;
            }
            if past_wins
                .get(&candidate)
                .is_some_and(|tiers| tiers.contains(&tier.id))
            {
                continue;
            }

            pool.remove(&candidate);
            selected.insert(candidate.clone());
            picked.push(candidate);
            break;
        }
    }

    Ok(picked)
}
