//! In-memory queue buffers and their fill logic.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::{CardId, DeckId, QUEUE_LIMIT, REPORT_LIMIT};
use crate::store::{CardStore, FetchExclusions};
use crate::Error;

#[derive(Debug, Default)]
pub struct Queues {
    pub new_queue: Vec<CardId>,
    /// `(due_epoch, id)`, ascending by due.
    pub lrn_queue: Vec<(i64, CardId)>,
    pub lrn_day_queue: Vec<CardId>,
    pub rev_queue: Vec<CardId>,
    /// Decks already drained this reset, skipped on subsequent fills.
    new_exhausted: Vec<DeckId>,
    lrn_day_exhausted: Vec<DeckId>,
    have_queues: bool,
}

impl Queues {
    pub fn is_stale(&self) -> bool {
        !self.have_queues
    }

    pub fn clear(&mut self) {
        self.new_queue.clear();
        self.lrn_queue.clear();
        self.lrn_day_queue.clear();
        self.rev_queue.clear();
        self.new_exhausted.clear();
        self.lrn_day_exhausted.clear();
        self.have_queues = false;
    }

    pub fn mark_filled(&mut self) {
        self.have_queues = true;
    }

    pub fn remove_new(&mut self, id: CardId) {
        self.new_queue.retain(|&c| c != id);
    }

    pub fn remove_rev(&mut self, id: CardId) {
        self.rev_queue.retain(|&c| c != id);
    }

    pub fn remove_lrn(&mut self, id: CardId) {
        self.lrn_queue.retain(|&(_, c)| c != id);
        self.lrn_day_queue.retain(|&c| c != id);
    }

    pub fn remove_any(&mut self, id: CardId) {
        self.remove_new(id);
        self.remove_rev(id);
        self.remove_lrn(id);
    }

    pub fn sort_lrn(&mut self) {
        self.lrn_queue.sort_by_key(|&(due, _)| due);
    }

    pub fn insert_lrn(&mut self, due: i64, id: CardId) {
        self.lrn_queue.push((due, id));
        self.sort_lrn();
    }

    pub fn smallest_lrn_due(&self) -> Option<i64> {
        self.lrn_queue.first().map(|&(due, _)| due)
    }
}

/// `fill_new`: iterates active decks FIFO, pulling up to `queue_limit`
/// cards from each non-exhausted deck. A deck is marked exhausted (skipped
/// on later fills this reset) once a non-excluding query comes back empty.
pub async fn fill_new(
    queues: &mut Queues,
    store: &dyn CardStore,
    active_dids: &[DeckId],
    per_deck_limit: impl Fn(DeckId) -> i64,
    current_nid_exclusion: FetchExclusions,
) -> Result<(), Error> {
    for &did in active_dids {
        if queues.new_exhausted.contains(&did) {
            continue;
        }
        let lim = (QUEUE_LIMIT as i64).min(per_deck_limit(did)).max(0) as u32;
        if lim == 0 {
            continue;
        }
        let mut ids = store
            .fetch_new_queue(did, lim, &current_nid_exclusion)
            .await?;
        if ids.is_empty() {
            // Retry allowing siblings back in.
            ids = store.fetch_new_queue(did, lim, &FetchExclusions::default()).await?;
            if ids.is_empty() {
                queues.new_exhausted.push(did);
                continue;
            }
        }
        queues.new_queue.extend(ids);
    }
    Ok(())
}

pub async fn fill_rev(
    queues: &mut Queues,
    store: &dyn CardStore,
    active_dids: &[DeckId],
    today: i32,
    limit: u32,
    excl: FetchExclusions,
) -> Result<(), Error> {
    let lim = (QUEUE_LIMIT as u32).min(limit);
    queues.rev_queue = store.fetch_rev_queue(active_dids, today, lim, &excl).await?;
    Ok(())
}

pub async fn fill_lrn(
    queues: &mut Queues,
    store: &dyn CardStore,
    active_dids: &[DeckId],
    now: i64,
    collapse_time_secs: i64,
    excl: FetchExclusions,
) -> Result<(), Error> {
    let cutoff = now + collapse_time_secs;
    queues.lrn_queue = store
        .fetch_lrn_queue(active_dids, cutoff, REPORT_LIMIT, &excl)
        .await?;
    queues.sort_lrn();
    Ok(())
}

/// `fill_lrn_day`: returns on the first active deck that yields any cards,
/// popping exhausted decks off the rotation as it goes.
pub async fn fill_lrn_day(
    queues: &mut Queues,
    store: &dyn CardStore,
    active_dids: &[DeckId],
    today: i32,
    excl: FetchExclusions,
) -> Result<(), Error> {
    for &did in active_dids {
        if queues.lrn_day_exhausted.contains(&did) {
            continue;
        }
        let ids = store
            .fetch_lrn_day_queue(did, today, QUEUE_LIMIT as u32, &excl)
            .await?;
        if ids.len() < QUEUE_LIMIT {
            queues.lrn_day_exhausted.push(did);
        }
        if !ids.is_empty() {
            let mut rng = StdRng::seed_from_u64(today as u64);
            let mut shuffled = ids;
            shuffled.shuffle(&mut rng);
            queues.lrn_day_queue = shuffled;
            return Ok(());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_any_clears_every_buffer() {
        let mut q = Queues::default();
        q.new_queue.push(1);
        q.rev_queue.push(1);
        q.lrn_queue.push((10, 1));
        q.remove_any(1);
        assert!(q.new_queue.is_empty());
        assert!(q.rev_queue.is_empty());
        assert!(q.lrn_queue.is_empty());
    }

    #[test]
    fn lrn_queue_stays_sorted() {
        let mut q = Queues::default();
        q.insert_lrn(500, 2);
        q.insert_lrn(100, 1);
        q.insert_lrn(300, 3);
        assert_eq!(q.lrn_queue, vec![(100, 1), (300, 3), (500, 2)]);
        assert_eq!(q.smallest_lrn_due(), Some(100));
    }
}
