//! Filtered ("dynamic") deck rebuilding. A filtered
//! deck pulls matching cards out of their home deck into itself for a
//! temporary study pass; `odid`/`odue` remember where to put them back.

use crate::model::{Card, CardId, CardQueue, Deck, DeckId, FilteredTerm};
use crate::store::CardStore;
use crate::Error;

const DYN_START_DUE: i64 = -100_000;

/// `empty_dyn` + `fill_dyn` for every term, run in term order.
/// Returns the ids actually moved in.
pub async fn rebuild_dyn(store: &dyn CardStore, deck: &Deck, today: i32) -> Result<Vec<CardId>, Error> {
    let restored = empty_dyn(store, deck).await?;
    let conf = store.get_deck_config(deck.config_id).await?;
    let resched = conf.dyn_resched.unwrap_or(true);
    let mut moved = Vec::new();
    let mut next_due = DYN_START_DUE;
    for term in deck.terms() {
        let ids = fill_dyn(store, &term, today, &moved).await?;
        for id in ids {
            if let Some(mut card) = store.get_card(id).await? {
                move_to_dyn(&mut card, deck.id, next_due, resched);
                store.save_card(&card).await?;
                next_due += 1;
                moved.push(id);
            }
        }
    }
    let _ = restored;
    Ok(moved)
}

/// Resolves one `FilteredTerm` to candidate card ids, searching with the
/// query wrapped to exclude cards already suspended, buried, or resident in
/// another filtered deck, and skipping ids already claimed by an earlier
/// term in the same rebuild.
async fn fill_dyn(
    store: &dyn CardStore,
    term: &FilteredTerm,
    today: i32,
    already_claimed: &[CardId],
) -> Result<Vec<CardId>, Error> {
    let wrapped = format!("({}) -is:suspended -is:buried -deck:filtered", term.query);
    let ids = store.search_cards(&wrapped, term.order, today, term.limit).await?;
    Ok(ids.into_iter().filter(|id| !already_claimed.contains(id)).collect())
}

/// Moves `card` into filtered deck `did`, stamping `odid`/`odue` so it can
/// be restored later. Due values are assigned monotonically from
/// `DYN_START_DUE` so order-of-entry into the filtered deck is preserved
/// even though the order within a term came from a different `ORDER BY`.
/// When `resched` is false the card studies on its original schedule, so it
/// is moved straight into the Review queue rather than the filtered deck's
/// own due ordering.
pub fn move_to_dyn(card: &mut Card, did: DeckId, due: i64, resched: bool) {
    if !card.is_filtered() {
        card.odid = card.did;
        card.odue = card.due;
    }
    card.did = did;
    card.due = due;
    if !resched {
        card.queue = CardQueue::Review;
    }
}

/// `empty_dyn`: restores every card currently resident in filtered deck
/// `deck` back to its home deck, without touching cards outside it.
pub async fn empty_dyn(store: &dyn CardStore, deck: &Deck) -> Result<Vec<CardId>, Error> {
    let mut restored = Vec::new();
    for mut card in resident_cards(store, deck.id).await? {
        restore_from_dyn(&mut card);
        store.save_card(&card).await?;
        restored.push(card.id);
    }
    Ok(restored)
}

async fn resident_cards(store: &dyn CardStore, did: DeckId) -> Result<Vec<Card>, Error> {
    store.cards_in_deck(did).await
}

fn restore_from_dyn(card: &mut Card) {
    card.did = card.odid;
    card.due = card.odue;
    card.odid = 0;
    card.odue = 0;
    card.queue = crate::model::CardQueue::restored_from_type(card.card_type, card.due);
}
