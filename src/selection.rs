//! The interleaving policy that decides which queue to pop next.
//! Pure over an in-memory `Queues` plus a small amount of
//! session counters; store access happens one layer up in `scheduler.rs`,
//! which refills queues before calling in here.

use crate::config::NewSpread;
use crate::model::CardId;
use crate::queues::Queues;

#[derive(Debug, Default)]
pub struct SelectionCounters {
    pub reps: i64,
    pub new_count: i64,
    pub rev_count: i64,
}

/// Whether a new card is due to be interleaved in right now, per the
/// deck's `NewSpread` setting.
pub fn time_for_new_card(counters: &SelectionCounters, spread: NewSpread) -> bool {
    if counters.new_count == 0 {
        return false;
    }
    match spread {
        NewSpread::Last => false,
        NewSpread::First => true,
        NewSpread::Distribute => {
            let modulus = if counters.rev_count > 0 {
                ((counters.new_count + counters.rev_count) / counters.new_count).max(2)
            } else {
                (counters.new_count + counters.rev_count) / counters.new_count
            };
            modulus > 0 && counters.reps != 0 && counters.reps % modulus == 0
        }
    }
}

/// `get_card` minus the refill/retry machinery: given already-fresh queues,
/// picks the next card id per the interleaving order. Returns `None` when
/// every queue (including the learning-collapse pass) is empty.
#[allow(clippy::too_many_arguments)]
pub fn select_next(
    queues: &Queues,
    counters: &SelectionCounters,
    now: i64,
    collapse_time_secs: i64,
    day_learn_first: bool,
    new_spread: NewSpread,
) -> Option<CardId> {
    if let Some(&(due, id)) = queues.lrn_queue.first() {
        if due < now {
            return Some(id);
        }
    }

    let want_new = time_for_new_card(counters, new_spread);
    if want_new {
        if let Some(&id) = queues.new_queue.first() {
            return Some(id);
        }
    }

    if day_learn_first {
        if let Some(&id) = queues.lrn_day_queue.first() {
            return Some(id);
        }
    }

    if let Some(&id) = queues.rev_queue.first() {
        return Some(id);
    }

    if !day_learn_first {
        if let Some(&id) = queues.lrn_day_queue.first() {
            return Some(id);
        }
    }

    if let Some(&id) = queues.new_queue.first() {
        return Some(id);
    }

    if let Some(&(due, id)) = queues.lrn_queue.first() {
        if due < now + collapse_time_secs {
            return Some(id);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(reps: i64, new_count: i64, rev_count: i64) -> SelectionCounters {
        SelectionCounters {
            reps,
            new_count,
            rev_count,
        }
    }

    #[test]
    fn time_for_new_card_last_spread_never_true() {
        assert!(!time_for_new_card(&counters(4, 5, 5), NewSpread::Last));
    }

    #[test]
    fn time_for_new_card_first_spread_always_true_when_new_available() {
        assert!(time_for_new_card(&counters(0, 5, 5), NewSpread::First));
        assert!(!time_for_new_card(&counters(0, 0, 5), NewSpread::First));
    }

    #[test]
    fn time_for_new_card_distribute_uses_modulus() {
        // modulus = max(2, (5+5)/5) = 2; reps=2 -> true, reps=3 -> false.
        assert!(time_for_new_card(&counters(2, 5, 5), NewSpread::Distribute));
        assert!(!time_for_new_card(&counters(3, 5, 5), NewSpread::Distribute));
    }

    #[test]
    fn select_prefers_due_lrn_card_over_everything() {
        let mut q = Queues::default();
        q.lrn_queue.push((50, 9));
        q.new_queue.push(1);
        q.rev_queue.push(2);
        let picked = select_next(&q, &counters(1, 1, 1), 100, 1200, false, NewSpread::Distribute);
        assert_eq!(picked, Some(9));
    }

    #[test]
    fn select_falls_back_to_collapsed_lrn_when_nothing_else() {
        let mut q = Queues::default();
        q.lrn_queue.push((150, 9));
        let picked = select_next(&q, &counters(0, 0, 0), 100, 1200, false, NewSpread::Distribute);
        assert_eq!(picked, Some(9));
    }

    #[test]
    fn select_returns_none_when_all_empty() {
        let q = Queues::default();
        let picked = select_next(&q, &counters(0, 0, 0), 100, 1200, false, NewSpread::Distribute);
        assert_eq!(picked, None);
    }
}
