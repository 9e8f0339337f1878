//! Same-day sibling spacing.

use crate::model::{Card, CardId};
use crate::queues::Queues;
use crate::store::CardStore;
use crate::Error;

/// Scans siblings of `card`, removes each from whichever in-memory queue it
/// occupies (unconditionally, for same-day spacing), and returns the ids
/// that should additionally be bury-flagged because their queue's config
/// section has `bury = true`.
pub async fn bury_siblings(
    card: &Card,
    queues: &mut Queues,
    store: &dyn CardStore,
    today: i32,
    new_bury: bool,
    rev_bury: bool,
) -> Result<Vec<CardId>, Error> {
    let siblings = store.siblings(card.note_id, card.id, today).await?;
    let mut to_bury = Vec::new();
    for sibling in &siblings {
        queues.remove_any(sibling.id);
        let should_bury = match sibling.card_type {
            crate::model::CardType::New => new_bury,
            _ => rev_bury,
        };
        if should_bury {
            to_bury.push(sibling.id);
        }
    }
    Ok(to_bury)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardQueue, CardType};
    use crate::store::FetchExclusions;
    use async_trait::async_trait;

    struct FakeStore {
        siblings: Vec<Card>,
    }

    #[async_trait]
    impl CardStore for FakeStore {
        async fn get_card(&self, _id: i64) -> Result<Option<Card>, Error> {
            Ok(None)
        }
        async fn save_card(&self, _card: &Card) -> Result<(), Error> {
            Ok(())
        }
        async fn save_cards(&self, _cards: &[Card]) -> Result<(), Error> {
            Ok(())
        }
        async fn count_new_in_deck(&self, _: i64, _: u32, _: &FetchExclusions) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_review_in_decks(
            &self,
            _: &[i64],
            _: i32,
            _: u32,
            _: &FetchExclusions,
        ) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_lrn(
            &self,
            _: &[i64],
            _: i64,
            _: i32,
            _: &FetchExclusions,
        ) -> Result<(u32, u32, u32), Error> {
            Ok((0, 0, 0))
        }
        async fn fetch_new_queue(&self, _: i64, _: u32, _: &FetchExclusions) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn fetch_rev_queue(
            &self,
            _: &[i64],
            _: i32,
            _: u32,
            _: &FetchExclusions,
        ) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_queue(
            &self,
            _: &[i64],
            _: i64,
            _: u32,
            _: &FetchExclusions,
        ) -> Result<Vec<(i64, i64)>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_day_queue(
            &self,
            _: i64,
            _: i32,
            _: u32,
            _: &FetchExclusions,
        ) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn siblings(&self, _: i64, _: i64, _: i32) -> Result<Vec<Card>, Error> {
            Ok(self.siblings.clone())
        }
        async fn cards_for_note(&self, _: i64) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
        async fn cards_in_deck(&self, _: i64) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
        #[allow(clippy::too_many_arguments)]
        async fn append_revlog(
            &self,
            _: i64,
            _: i64,
            _: i64,
            _: i64,
            _: i64,
            _: i64,
            _: i32,
            _: i64,
            _: crate::model::RevlogType,
        ) -> Result<(), Error> {
            Ok(())
        }
        async fn search_cards(
            &self,
            _: &str,
            _: crate::model::FilteredOrder,
            _: i32,
            _: u32,
        ) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn get_deck_config(&self, _: i64) -> Result<crate::model::DeckConfig, Error> {
            Ok(crate::model::DeckConfig::default())
        }
        async fn max_new_due(&self) -> Result<i64, Error> {
            Ok(0)
        }
        async fn new_cards_due_at_least(&self, _: i64) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn buries_siblings_flagged_for_bury() {
        let sibling = Card {
            id: 2,
            note_id: 1,
            card_type: CardType::New,
            queue: CardQueue::New,
            ..Default::default()
        };
        let store = FakeStore {
            siblings: vec![sibling],
        };
        let mut queues = Queues::default();
        queues.new_queue.push(2);
        let card = Card {
            id: 1,
            note_id: 1,
            ..Default::default()
        };
        let to_bury = bury_siblings(&card, &mut queues, &store, 100, true, false)
            .await
            .unwrap();
        assert_eq!(to_bury, vec![2]);
        assert!(queues.new_queue.is_empty());
    }
}
