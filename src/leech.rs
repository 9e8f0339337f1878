//! Leech detection: tagging and optionally suspending cards that keep lapsing.

use crate::model::{Card, CardQueue, DeckConfig, LeechAction};
use crate::store::NoteMutator;
use crate::Error;

pub const LEECH_TAG: &str = "leech";

/// Tags `card`'s note as a leech and, if configured, suspends the card.
/// Returns whether a leech was detected this call. Mutates `card.queue` in
/// place but does not flush to the store; callers persist afterward.
pub async fn check_leech(
    card: &mut Card,
    conf: &DeckConfig,
    notes: &dyn NoteMutator,
) -> Result<bool, Error> {
    let lf = i64::from(conf.lapse.leech_fails);
    if lf <= 0 || card.lapses < lf {
        return Ok(false);
    }
    let period = (lf / 2).max(1);
    if (card.lapses - lf) % period != 0 {
        return Ok(false);
    }
    notes.add_tag(card.note_id, LEECH_TAG).await?;
    if matches!(conf.lapse.leech_action, LeechAction::Suspend) {
        card.queue = CardQueue::Suspended;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeNotes {
        tagged: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl NoteMutator for FakeNotes {
        async fn add_tag(&self, nid: i64, tag: &str) -> Result<(), Error> {
            self.tagged.lock().unwrap().push((nid, tag.to_string()));
            Ok(())
        }
        async fn has_tag(&self, _nid: i64, _tag: &str) -> Result<bool, Error> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn detects_leech_at_threshold_and_suspends() {
        let mut conf = DeckConfig::default();
        conf.lapse.leech_fails = 8;
        conf.lapse.leech_action = LeechAction::Suspend;
        let mut card = Card {
            lapses: 8,
            note_id: 42,
            ..Default::default()
        };
        let notes = FakeNotes::default();
        let is_leech = check_leech(&mut card, &conf, &notes).await.unwrap();
        assert!(is_leech);
        assert_eq!(card.queue, CardQueue::Suspended);
        assert_eq!(notes.tagged.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn below_threshold_is_not_a_leech() {
        let mut conf = DeckConfig::default();
        conf.lapse.leech_fails = 8;
        let mut card = Card {
            lapses: 3,
            ..Default::default()
        };
        let notes = FakeNotes::default();
        assert!(!check_leech(&mut card, &conf, &notes).await.unwrap());
    }
}
