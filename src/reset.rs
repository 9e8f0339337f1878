//! Bulk reset and rescheduling tools: "forget" a
//! card back to new, reschedule it directly to a fixed interval, or
//! renumber a batch of new cards' due positions.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{Card, CardId, CardQueue, CardType};
use crate::store::CardStore;
use crate::Error;

/// Resets `ids` to New, clearing interval/factor/lapse history as if never
/// studied. Filtered-deck overlay is cleared too; a forgotten card has
/// nothing left to restore to. Afterwards the forgotten cards are
/// appended past the end of the existing New queue via `sort_cards`, so
/// they don't collide with whatever due positions they happened to carry
/// over from their prior life as Review/Learning cards.
pub async fn forget_cards(store: &dyn CardStore, ids: &[CardId]) -> Result<(), Error> {
    for &id in ids {
        if let Some(mut card) = store.get_card(id).await? {
            card.card_type = CardType::New;
            card.queue = CardQueue::New;
            card.ivl = 0;
            card.due = 0;
            card.factor = crate::model::STARTING_FACTOR;
            card.reps = 0;
            card.lapses = 0;
            card.left = 0;
            card.last_ivl = 0;
            card.odid = 0;
            card.odue = 0;
            store.save_card(&card).await?;
        }
    }
    let start = store.max_new_due().await? + 1;
    let mut rng = rand::thread_rng();
    sort_cards(store, ids, start, 1, false, false, &mut rng).await
}

/// Directly sets each card's interval to a value drawn uniformly from
/// `[imin, imax]`, moving it to Review due `today + ivl`. Used for manual
/// "set ease/interval" operations rather than normal answering.
pub async fn resched_cards(
    store: &dyn CardStore,
    ids: &[CardId],
    imin: i64,
    imax: i64,
    today: i32,
    rng: &mut impl Rng,
) -> Result<(), Error> {
    let (lo, hi) = if imin <= imax { (imin, imax) } else { (imax, imin) };
    for &id in ids {
        if let Some(mut card) = store.get_card(id).await? {
            let ivl = if lo == hi { lo } else { rng.gen_range(lo..=hi) };
            card.ivl = ivl.max(1);
            card.due = i64::from(today) + card.ivl;
            card.card_type = CardType::Review;
            card.queue = CardQueue::Review;
            store.save_card(&card).await?;
        }
    }
    Ok(())
}

/// Renumbers the New cards among `cids`' `due` fields starting at `start`,
/// stepping by `step` per distinct note rather than per card: siblings of
/// the same note share a `nid` group and are assigned the same `due`, so
/// they keep surfacing together. Groups are ordered by first appearance in
/// `cids` (optionally shuffled first). When `shift` is set, any other New
/// card not in `cids` with `due >= start` is pushed past the newly
/// assigned range so the two don't collide.
pub async fn sort_cards(
    store: &dyn CardStore,
    cids: &[CardId],
    start: i64,
    step: i64,
    shuffle: bool,
    shift: bool,
    rng: &mut impl Rng,
) -> Result<(), Error> {
    let mut cards = Vec::with_capacity(cids.len());
    for &id in cids {
        if let Some(card) = store.get_card(id).await? {
            if matches!(card.card_type, CardType::New) {
                cards.push(card);
            }
        }
    }

    let mut nids: Vec<crate::model::NoteId> = Vec::new();
    for card in &cards {
        if !nids.contains(&card.note_id) {
            nids.push(card.note_id);
        }
    }
    if shuffle {
        nids.shuffle(rng);
    }

    if shift {
        let shift_by = (nids.len() as i64) * step;
        let moved: std::collections::HashSet<CardId> = cards.iter().map(|c| c.id).collect();
        for mut other in store.new_cards_due_at_least(start).await? {
            if !moved.contains(&other.id) {
                other.due += shift_by;
                store.save_card(&other).await?;
            }
        }
    }

    for (i, nid) in nids.iter().enumerate() {
        let due = start + (i as i64) * step;
        for card in &mut cards {
            if card.note_id == *nid {
                card.due = due;
                store.save_card(card).await?;
            }
        }
    }
    Ok(())
}
