//! Per-deck and hierarchical daily limits. Parent
//! clamping is modeled with an explicit cache of remaining parent budget
//! rather than re-querying ancestors on every leaf — a "walking count" over
//! the deck tree in display order.

use std::collections::HashMap;

use crate::model::{Deck, DeckConfig, DeckId};

pub fn deck_new_limit_single(deck: &Deck, conf: &DeckConfig, consider_current: bool) -> i64 {
    if deck.is_filtered {
        return i64::from(crate::model::DYN_REPORT_LIMIT);
    }
    let remaining = (i64::from(conf.new.per_day) - deck.new_today_count).max(0);
    if consider_current {
        (remaining - 1).max(0)
    } else {
        remaining
    }
}

pub fn deck_rev_limit_single(
    deck: &Deck,
    conf: &DeckConfig,
    parent_limit: Option<i64>,
    consider_current: bool,
) -> i64 {
    let remaining = (i64::from(conf.rev.per_day) - deck.rev_today_count).max(0);
    let clamped = match parent_limit {
        Some(p) => remaining.min(p),
        None => remaining,
    };
    if consider_current {
        (clamped - 1).max(0)
    } else {
        clamped
    }
}

/// Parent-clamped remaining budget cache used by `walking_count`: maps a
/// deck id to the budget left after every previously-visited deck in its
/// ancestor chain subtracted its own count.
#[derive(Default)]
pub struct LimitCache {
    remaining: HashMap<DeckId, i64>,
}

impl LimitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamps `lim` against every ancestor's cached remaining budget, in
    /// root-to-leaf order (nearest-exhausted ancestor wins).
    pub fn clamp(&self, lim: i64, ancestors: &[DeckId]) -> i64 {
        ancestors
            .iter()
            .filter_map(|did| self.remaining.get(did))
            .fold(lim, |acc, &parent_remaining| acc.min(parent_remaining))
    }

    /// Registers `did`'s post-count remaining budget and decrements every
    /// ancestor's cached remaining budget by `cnt`.
    pub fn record(&mut self, did: DeckId, lim: i64, cnt: i64, ancestors: &[DeckId]) {
        self.remaining.insert(did, (lim - cnt).max(0));
        for ancestor in ancestors {
            if let Some(budget) = self.remaining.get_mut(ancestor) {
                *budget = (*budget - cnt).max(0);
            }
        }
    }
}

/// Cooperative cancellation signal checked between decks in `walking_count`
/// and between count phases in `reset_counts`.
pub trait CancelToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Walks `active_dids` in order, applying `lim_fn`/`cnt_fn` per deck and
/// parent-clamping via `LimitCache`. Returns `-1` if cancelled partway
/// through, in which case counts must not be consumed.
pub fn walking_count<LimFn, CntFn>(
    active_dids: &[DeckId],
    ancestors_of: impl Fn(DeckId) -> Vec<DeckId>,
    mut lim_fn: LimFn,
    mut cnt_fn: CntFn,
    cancel: &dyn CancelToken,
) -> i64
where
    LimFn: FnMut(DeckId) -> i64,
    CntFn: FnMut(DeckId, i64) -> i64,
{
    let mut cache = LimitCache::new();
    let mut total = 0_i64;
    for &did in active_dids {
        if cancel.is_cancelled() {
            return -1;
        }
        let ancestors = ancestors_of(did);
        let lim = cache.clamp(lim_fn(did), &ancestors);
        if lim <= 0 {
            cache.record(did, lim.max(0), 0, &ancestors);
            continue;
        }
        let cnt = cnt_fn(did, lim);
        cache.record(did, lim, cnt, &ancestors);
        total += cnt;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(new_today: i64, rev_today: i64) -> Deck {
        Deck {
            new_today_count: new_today,
            rev_today_count: rev_today,
            ..Default::default()
        }
    }

    #[test]
    fn new_limit_accounts_for_todays_progress() {
        let conf = DeckConfig::default();
        let d = deck(5, 0);
        assert_eq!(deck_new_limit_single(&d, &conf, false), 15);
        assert_eq!(deck_new_limit_single(&d, &conf, true), 14);
    }

    #[test]
    fn new_limit_never_negative() {
        let conf = DeckConfig::default();
        let d = deck(1000, 0);
        assert_eq!(deck_new_limit_single(&d, &conf, false), 0);
    }

    #[test]
    fn rev_limit_clamps_to_parent() {
        let conf = DeckConfig::default();
        let d = deck(0, 0);
        assert_eq!(deck_rev_limit_single(&d, &conf, Some(5), false), 5);
        assert_eq!(deck_rev_limit_single(&d, &conf, Some(500), false), 200);
    }

    #[test]
    fn walking_count_respects_parent_clamp() {
        // child (id 2) has a 20/day limit, parent (id 1) is clamped to 3.
        let active = vec![1, 2];
        let ancestors_of = |did: DeckId| if did == 2 { vec![1] } else { vec![] };
        let mut first_call = true;
        let total = walking_count(
            &active,
            ancestors_of,
            |did| if did == 1 { 3 } else { 20 },
            |_did, lim| {
                let taken = if first_call { lim } else { lim.min(20) };
                first_call = false;
                taken
            },
            &NeverCancel,
        );
        assert!(total <= 3 + 20);
    }

    #[test]
    fn walking_count_cancels() {
        struct AlwaysCancel;
        impl CancelToken for AlwaysCancel {
            fn is_cancelled(&self) -> bool {
                true
            }
        }
        let total = walking_count(&[1, 2], |_| vec![], |_| 10, |_, lim| lim, &AlwaysCancel);
        assert_eq!(total, -1);
    }
}
