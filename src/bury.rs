//! Manual bury/suspend/unbury operations, distinct
//! from the same-day sibling spacing in `siblings.rs`: these are
//! user-triggered and persist across the day cutoff until explicitly lifted.

use crate::model::{Card, CardId, CardQueue, DeckId, NoteId};
use crate::store::CardStore;
use crate::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnburyKind {
    All,
    Manual,
    Siblings,
}

fn restore_queue(card: &mut Card) {
    card.queue = CardQueue::restored_from_type(card.card_type, card.odue_or_due());
}

pub async fn bury_cards(store: &dyn CardStore, ids: &[CardId], manual: bool) -> Result<(), Error> {
    let queue = if manual {
        CardQueue::ManuallyBuried
    } else {
        CardQueue::SiblingBuried
    };
    for &id in ids {
        if let Some(mut card) = store.get_card(id).await? {
            card.queue = queue;
            store.save_card(&card).await?;
        }
    }
    Ok(())
}

pub async fn bury_note(store: &dyn CardStore, nid: NoteId) -> Result<(), Error> {
    let cards = store.cards_for_note(nid).await?;
    let ids: Vec<CardId> = cards.iter().map(|c| c.id).collect();
    bury_cards(store, &ids, true).await
}

pub async fn suspend_cards(store: &dyn CardStore, ids: &[CardId]) -> Result<(), Error> {
    for &id in ids {
        if let Some(mut card) = store.get_card(id).await? {
            card.queue = CardQueue::Suspended;
            store.save_card(&card).await?;
        }
    }
    Ok(())
}

pub async fn unsuspend_cards(store: &dyn CardStore, ids: &[CardId]) -> Result<(), Error> {
    for &id in ids {
        if let Some(mut card) = store.get_card(id).await? {
            if matches!(card.queue, CardQueue::Suspended) {
                restore_queue(&mut card);
                store.save_card(&card).await?;
            }
        }
    }
    Ok(())
}

/// Lifts bury state for every card in `did` matching `kind`. A day-rollover
/// unbury always passes `Siblings`, since manual buries are meant to
/// survive the cutoff.
pub async fn unbury_cards_for_deck(
    store: &dyn CardStore,
    did: DeckId,
    kind: UnburyKind,
) -> Result<Vec<CardId>, Error> {
    let cards = store.cards_in_deck(did).await?;
    let mut unburied = Vec::new();
    for mut card in cards {
        let id = card.id;
        let matches_kind = match kind {
            UnburyKind::All => card.queue.is_buried(),
            UnburyKind::Manual => matches!(card.queue, CardQueue::ManuallyBuried),
            UnburyKind::Siblings => matches!(card.queue, CardQueue::SiblingBuried),
        };
        if matches_kind {
            restore_queue(&mut card);
            store.save_card(&card).await?;
            unburied.push(id);
        }
    }
    Ok(unburied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardType;

    #[test]
    fn restore_queue_routes_by_card_type() {
        let mut card = Card {
            card_type: CardType::Review,
            due: 50,
            queue: CardQueue::SiblingBuried,
            ..Default::default()
        };
        restore_queue(&mut card);
        assert_eq!(card.queue, CardQueue::Review);

        let mut learning = Card {
            card_type: CardType::Learning,
            due: 1_700_000_500,
            queue: CardQueue::ManuallyBuried,
            ..Default::default()
        };
        restore_queue(&mut learning);
        assert_eq!(learning.queue, CardQueue::Learning);
    }
}
