//! The revision log writer. Millisecond timestamps
//! double as the primary key; a collision (two answers landing in the same
//! millisecond) is recovered locally by waiting a beat and re-stamping,
//! rather than bubbling up to the caller.

use std::time::Duration;

use crate::clock::Clock;
use crate::model::{Card, RevlogType};
use crate::store::CardStore;
use crate::{Error, LibraryError};

const COLLISION_RETRY_DELAY: Duration = Duration::from_millis(10);
const MAX_RETRIES: u32 = 10;

#[allow(clippy::too_many_arguments)]
pub async fn log(
    store: &dyn CardStore,
    clock: &dyn Clock,
    card: &Card,
    usn: i64,
    ease: i64,
    ivl: i64,
    last_ivl: i64,
    factor: i32,
    time_taken: i64,
    revlog_type: RevlogType,
) -> Result<(), Error> {
    let mut attempts = 0;
    loop {
        let time_ms = clock.int_time_ms();
        match store
            .append_revlog(time_ms, card.id, usn, ease, ivl, last_ivl, factor, time_taken, revlog_type)
            .await
        {
            Ok(()) => return Ok(()),
            Err(Error::Sqlx { source }) if is_pk_collision(&source) => {
                attempts += 1;
                if attempts >= MAX_RETRIES {
                    return Err(Error::Library(LibraryError::RevlogKeyClash { time_ms }));
                }
                tokio::time::sleep(COLLISION_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_pk_collision(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::model::{CardQueue, DeckConfig, FilteredOrder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakyStore {
        calls: AtomicUsize,
        fail_first_n: usize,
        logged: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl CardStore for FlakyStore {
        async fn get_card(&self, _id: i64) -> Result<Option<Card>, Error> {
            Ok(None)
        }
        async fn save_card(&self, _card: &Card) -> Result<(), Error> {
            Ok(())
        }
        async fn save_cards(&self, _cards: &[Card]) -> Result<(), Error> {
            Ok(())
        }
        async fn count_new_in_deck(&self, _: i64, _: u32, _: &crate::store::FetchExclusions) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_review_in_decks(
            &self,
            _: &[i64],
            _: i32,
            _: u32,
            _: &crate::store::FetchExclusions,
        ) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_lrn(
            &self,
            _: &[i64],
            _: i64,
            _: i32,
            _: &crate::store::FetchExclusions,
        ) -> Result<(u32, u32, u32), Error> {
            Ok((0, 0, 0))
        }
        async fn fetch_new_queue(&self, _: i64, _: u32, _: &crate::store::FetchExclusions) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn fetch_rev_queue(
            &self,
            _: &[i64],
            _: i32,
            _: u32,
            _: &crate::store::FetchExclusions,
        ) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_queue(
            &self,
            _: &[i64],
            _: i64,
            _: u32,
            _: &crate::store::FetchExclusions,
        ) -> Result<Vec<(i64, i64)>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_day_queue(
            &self,
            _: i64,
            _: i32,
            _: u32,
            _: &crate::store::FetchExclusions,
        ) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn siblings(&self, _: i64, _: i64, _: i32) -> Result<Vec<Card>, Error> {
            Ok(vec![])
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
            time_ms: i64,
            _card_id: i64,
            _usn: i64,
            _ease: i64,
            _ivl: i64,
            _last_ivl: i64,
            _factor: i32,
            _time_taken: i64,
            _revlog_type: RevlogType,
        ) -> Result<(), Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                return Err(Error::Sqlx {
                    source: sqlx::Error::RowNotFound,
                });
            }
            self.logged.lock().unwrap().push(time_ms);
            Ok(())
        }
        async fn search_cards(&self, _: &str, _: FilteredOrder, _: i32, _: u32) -> Result<Vec<i64>, Error> {
            Ok(vec![])
        }
        async fn get_deck_config(&self, _: i64) -> Result<DeckConfig, Error> {
            Ok(DeckConfig::default())
        }
        async fn max_new_due(&self) -> Result<i64, Error> {
            Ok(0)
        }
        async fn new_cards_due_at_least(&self, _: i64) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn logs_once_on_success() {
        let store = FlakyStore::default();
        let clock = FakeClock::new(1_700_000_000);
        let card = Card {
            id: 1,
            queue: CardQueue::Review,
            ..Default::default()
        };
        log(&store, &clock, &card, 0, 3, 4, 1, 2500, 5000, RevlogType::Review)
            .await
            .unwrap();
        assert_eq!(store.logged.lock().unwrap().len(), 1);
    }
}
