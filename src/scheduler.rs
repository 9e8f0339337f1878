//! Top-level facade. Wires the
//! pure pieces (`interval`, `limits`, `queues`, `selection`, `answer`,
//! `siblings`, `leech`, `filtered`, `bury`, `revlog`) to the external
//! collaborators (`store`, `config`, `clock`) the way Anki's scheduler
//! object drives its own submodules.

use crate::answer::{self, AnswerOutcome, CounterBump};
use crate::bury;
use crate::clock::Clock;
use crate::config::SchedulerRuntimeConfig;
use crate::model::{Card, CardId, Deck, DeckConfig, DeckId, NoteId};
use crate::queues::{self, Queues};
use crate::selection::{self, SelectionCounters};
use crate::siblings;
use crate::store::{CardStore, ConfigStore, DeckTree, FetchExclusions, NoteMutator, TaskManager};
use crate::{revlog, Error, LibraryError};

pub const SCHEDULER_NAME: &str = "std2";

pub struct Scheduler {
    store: Box<dyn CardStore>,
    decks: Box<dyn DeckTree>,
    notes: Box<dyn NoteMutator>,
    clock: Box<dyn Clock>,
    config_store: Box<dyn ConfigStore>,
    tasks: Box<dyn TaskManager>,
    creation_secs: i64,
    queues: Queues,
    counters: SelectionCounters,
    have_counts: bool,
    current_card_id: Option<CardId>,
    current_card_nid: Option<NoteId>,
    current_card_did: Option<DeckId>,
}

impl Scheduler {
    pub fn new(
        store: Box<dyn CardStore>,
        decks: Box<dyn DeckTree>,
        notes: Box<dyn NoteMutator>,
        clock: Box<dyn Clock>,
        config_store: Box<dyn ConfigStore>,
        tasks: Box<dyn TaskManager>,
        creation_secs: i64,
    ) -> Self {
        Self {
            store,
            decks,
            notes,
            clock,
            config_store,
            tasks,
            creation_secs,
            queues: Queues::default(),
            counters: SelectionCounters::default(),
            have_counts: false,
            current_card_id: None,
            current_card_nid: None,
            current_card_did: None,
        }
    }

    pub const fn name(&self) -> &'static str {
        SCHEDULER_NAME
    }

    pub fn button_count(&self, filtered: bool, resched: bool) -> u8 {
        if filtered && !resched {
            2
        } else {
            4
        }
    }

    fn runtime_config(&self) -> Result<SchedulerRuntimeConfig, Error> {
        self.config_store.get()
    }

    fn today_and_cutoff(&self) -> (i32, i64) {
        let timing = self.clock.timing_today(self.creation_secs);
        (timing.days_elapsed, timing.next_day_at)
    }

    /// Rolls any deck whose daily
    /// counters are stamped with a prior day back to zero, and performs a
    /// once-per-day global unbury of sibling-buried (not manually buried)
    /// cards.
    pub async fn update_cutoff(&mut self) -> Result<(), Error> {
        let (today, _) = self.today_and_cutoff();
        for mut deck in self.decks.all().await? {
            let mut dirty = false;
            if deck.new_today_day != today {
                deck.new_today_day = today;
                deck.new_today_count = 0;
                dirty = true;
            }
            if deck.rev_today_day != today {
                deck.rev_today_day = today;
                deck.rev_today_count = 0;
                dirty = true;
            }
            if deck.lrn_today_day != today {
                deck.lrn_today_day = today;
                deck.lrn_today_count = 0;
                dirty = true;
            }
            if deck.time_today_day != today {
                deck.time_today_day = today;
                deck.time_today_count = 0;
                dirty = true;
            }
            if dirty {
                bury::unbury_cards_for_deck(&*self.store, deck.id, bury::UnburyKind::Siblings).await?;
                self.decks.save(&deck).await?;
            }
        }

        let mut runtime = self.runtime_config()?;
        if runtime.last_unburied < today {
            for deck in self.decks.all().await? {
                bury::unbury_cards_for_deck(&*self.store, deck.id, bury::UnburyKind::Siblings).await?;
            }
            runtime.last_unburied = today;
            self.config_store.set(&runtime)?;
        }
        self.queues.clear();
        self.have_counts = false;
        Ok(())
    }

    /// Resolves the effective per-card config view.
    /// For a filtered card, the new/lapse/review sections come from the
    /// *original* deck's config (so graduating out of the filtered deck
    /// behaves like the card never left home); only ordering/resched/
    /// per-day/separate come from the filtered deck's own config.
    pub async fn effective_config(&self, card: &Card) -> Result<DeckConfig, Error> {
        let deck = self
            .decks
            .get(card.did)
            .await?
            .ok_or_else(|| Error::Library(LibraryError::StoreError(format!("deck {} missing", card.did))))?;
        let base = self.store.get_deck_config(deck.config_id).await?;
        if !card.is_filtered() {
            return Ok(base);
        }
        let home = self
            .decks
            .get(card.odid)
            .await?
            .ok_or_else(|| Error::Library(LibraryError::StoreError(format!("deck {} missing", card.odid))))?;
        let home_conf = self.store.get_deck_config(home.config_id).await?;
        Ok(DeckConfig {
            id: base.id,
            name: base.name,
            new: home_conf.new,
            lapse: home_conf.lapse,
            rev: home_conf.rev,
            dyn_resched: base.dyn_resched,
            preview_delay_secs: base.preview_delay_secs,
        })
    }

    async fn ancestors_of(&self, did: DeckId) -> Vec<DeckId> {
        self.decks.parents(did).await.unwrap_or_default().iter().map(|d| d.id).collect()
    }

    /// Exclusions for whichever card is currently displayed, so a just-shown
    /// card (or a sibling note of it) never reappears from a fill.
    fn exclusions(&self) -> FetchExclusions {
        FetchExclusions {
            exclude_id: self.current_card_id,
            exclude_note_id: self.current_card_nid,
        }
    }

    /// True if `did` is the deck the current card occupies, or an ancestor
    /// of it, in which case its daily limit must be decremented by one to
    /// account for the card already in hand.
    async fn consider_current(&self, did: DeckId) -> bool {
        match self.current_card_did {
            Some(cur) => cur == did || self.ancestors_of(cur).await.contains(&did),
            None => false,
        }
    }

    /// Immediate-parent-clamped review limit for `did`. Only the immediate
    /// parent is consulted here; arbitrary-depth clamping is
    /// `limits::walking_count`, used once per-deck counts are known rather
    /// than against this live fill.
    async fn rev_limit_for(&self, did: DeckId, deck: &Deck, conf: &DeckConfig, consider_current: bool) -> Result<i64, Error> {
        let ancestors = self.ancestors_of(did).await;
        let parent_limit = match ancestors.last() {
            Some(&parent_id) => match self.decks.get(parent_id).await? {
                Some(parent_deck) => {
                    let parent_conf = self.store.get_deck_config(parent_deck.config_id).await?;
                    Some(crate::limits::deck_rev_limit_single(&parent_deck, &parent_conf, None, false))
                }
                None => None,
            },
            None => None,
        };
        Ok(crate::limits::deck_rev_limit_single(deck, conf, parent_limit, consider_current))
    }

    /// Rebuilds every in-memory queue from the store.
    pub async fn reset_queues(&mut self) -> Result<(), Error> {
        self.queues.clear();
        let runtime = self.runtime_config()?;
        let active = self.decks.active().await?;
        let excl = self.exclusions();

        for &did in &active {
            let Some(deck) = self.decks.get(did).await? else { continue };
            let conf = self.store.get_deck_config(deck.config_id).await?;
            let consider_current = self.consider_current(did).await;
            let lim = crate::limits::deck_new_limit_single(&deck, &conf, consider_current);
            let lim = lim.max(0) as u32;
            queues::fill_new(&mut self.queues, &*self.store, &[did], |_| i64::from(lim), excl.clone()).await?;
        }

        let (today, next_day_at) = self.today_and_cutoff();
        let mut rev_limit_total: i64 = 0;
        for &did in &active {
            if let Some(deck) = self.decks.get(did).await? {
                let conf = self.store.get_deck_config(deck.config_id).await?;
                let consider_current = self.consider_current(did).await;
                rev_limit_total += self.rev_limit_for(did, &deck, &conf, consider_current).await?;
            }
        }
        queues::fill_rev(&mut self.queues, &*self.store, &active, today, rev_limit_total.max(0) as u32, excl.clone())
            .await?;

        queues::fill_lrn(&mut self.queues, &*self.store, &active, self.clock.int_time(), runtime.collapse_time_secs, excl.clone())
            .await?;
        queues::fill_lrn_day(&mut self.queues, &*self.store, &active, today, excl).await?;

        self.queues.mark_filled();
        let _ = next_day_at;
        Ok(())
    }

    /// Recomputes the true daily-limit-bounded new/review counts from the
    /// store, rather than reading the live queues' `QUEUE_LIMIT`-capped
    /// length, so `selection::time_for_new_card`'s distribute modulus stays
    /// correct once a deck's true due count exceeds that buffer size.
    pub async fn reset_counts(&mut self) -> Result<(), Error> {
        let active = self.decks.active().await?;
        let excl = self.exclusions();

        let mut new_total: i64 = 0;
        for &did in &active {
            let Some(deck) = self.decks.get(did).await? else { continue };
            let conf = self.store.get_deck_config(deck.config_id).await?;
            let consider_current = self.consider_current(did).await;
            let lim = crate::limits::deck_new_limit_single(&deck, &conf, consider_current).max(0) as u32;
            new_total += i64::from(self.store.count_new_in_deck(did, lim, &excl).await?);
        }

        let (today, _) = self.today_and_cutoff();
        let mut rev_total: i64 = 0;
        for &did in &active {
            if let Some(deck) = self.decks.get(did).await? {
                let conf = self.store.get_deck_config(deck.config_id).await?;
                let consider_current = self.consider_current(did).await;
                let lim = self.rev_limit_for(did, &deck, &conf, consider_current).await?.max(0) as u32;
                rev_total += i64::from(self.store.count_review_in_decks(&[did], today, lim, &excl).await?);
            }
        }

        self.counters.new_count = new_total;
        self.counters.rev_count = rev_total;
        self.have_counts = true;
        Ok(())
    }

    /// Deferred reset hook: if queues are stale, hand the refill off to the
    /// task manager instead of blocking.
    pub fn defer_reset(&self) {
        self.tasks.launch_reset();
    }

    /// Ensures fresh queues/counts, then
    /// selects and returns the next card id, retrying past any id that no
    /// longer resolves to a live card.
    pub async fn get_card(&mut self) -> Result<Option<CardId>, Error> {
        if self.queues.is_stale() {
            self.reset_queues().await?;
        }
        if !self.have_counts {
            self.reset_counts().await?;
        }
        let runtime = self.runtime_config()?;
        loop {
            let now = self.clock.int_time();
            let Some(id) = selection::select_next(
                &self.queues,
                &self.counters,
                now,
                runtime.collapse_time_secs,
                runtime.day_learn_first,
                runtime.new_spread,
            ) else {
                return Ok(None);
            };
            match self.store.get_card(id).await? {
                Some(card) => {
                    self.current_card_id = Some(id);
                    self.current_card_nid = Some(card.note_id);
                    self.current_card_did = Some(card.did);
                    return Ok(Some(id));
                }
                None => {
                    self.queues.remove_any(id);
                    continue;
                }
            }
        }
    }

    pub fn discard_current_card(&mut self) {
        if let Some(id) = self.current_card_id.take() {
            self.queues.remove_any(id);
        }
        self.current_card_nid = None;
        self.current_card_did = None;
    }

    fn bump_deck_counter(deck: &mut Deck, bump: CounterBump) {
        match bump {
            CounterBump::New => deck.new_today_count += 1,
            CounterBump::Review => deck.rev_today_count += 1,
            CounterBump::Learning => deck.lrn_today_count += 1,
            CounterBump::None => {}
        }
    }

    /// Applies a rating to the current card: discards the
    /// current card from the live queues, buries flagged siblings, runs the
    /// state transition, then persists the card, the revlog entry, and the
    /// owning deck's daily counter.
    pub async fn answer_card(&mut self, ease: u8, time_taken: i64) -> Result<(), Error> {
        let Some(card_id) = self.current_card_id else {
            return Err(Error::Library(LibraryError::Cancelled));
        };
        let mut card = self
            .store
            .get_card(card_id)
            .await?
            .ok_or_else(|| Error::Library(LibraryError::StoreError(format!("card {card_id} missing"))))?;

        self.discard_current_card();

        let conf = self.effective_config(&card).await?;
        let (today, day_cutoff) = self.today_and_cutoff();
        let now = self.clock.int_time();
        let runtime = self.runtime_config()?;

        let bury_ids = siblings::bury_siblings(&card, &mut self.queues, &*self.store, today, conf.new.bury, conf.rev.bury).await?;
        if !bury_ids.is_empty() {
            bury::bury_cards(&*self.store, &bury_ids, false).await?;
        }

        let mut rng = rand::thread_rng();
        let AnswerOutcome { revlog: draft, bump, .. } = answer::answer_card(
            &mut card,
            ease,
            &conf,
            today,
            day_cutoff,
            now,
            runtime.collapse_time_secs,
            &*self.notes,
            &mut rng,
        )
        .await?;

        card.modified_at = now;
        self.store.save_card(&card).await?;

        revlog::log(
            &*self.store,
            &*self.clock,
            &card,
            0,
            draft.ease,
            draft.ivl,
            draft.last_ivl,
            draft.factor,
            time_taken,
            draft.revlog_type,
        )
        .await?;

        if let Some(mut deck) = self.decks.get(card.did).await? {
            Self::bump_deck_counter(&mut deck, bump);
            self.decks.save(&deck).await?;
        }

        Ok(())
    }

    /// Empties `did`'s current resident cards back to their home decks, then
    /// refills it from its filtered terms. Invalidates the live queues, since
    /// deck membership just changed underneath them.
    pub async fn rebuild_filtered_deck(&mut self, did: DeckId) -> Result<Vec<CardId>, Error> {
        let deck = self
            .decks
            .get(did)
            .await?
            .ok_or_else(|| Error::Library(LibraryError::StoreError(format!("deck {did} missing"))))?;
        let (today, _) = self.today_and_cutoff();
        let moved = crate::filtered::rebuild_dyn(&*self.store, &deck, today).await?;
        self.queues.clear();
        Ok(moved)
    }

    /// Restores every card currently resident in filtered deck `did` to its
    /// home deck without refilling it. Invalidates the live queues.
    pub async fn empty_filtered_deck(&mut self, did: DeckId) -> Result<Vec<CardId>, Error> {
        let deck = self
            .decks
            .get(did)
            .await?
            .ok_or_else(|| Error::Library(LibraryError::StoreError(format!("deck {did} missing"))))?;
        let restored = crate::filtered::empty_dyn(&*self.store, &deck).await?;
        self.queues.clear();
        Ok(restored)
    }
}

/// Convenience constructor wiring every SQLite-backed collaborator at once.
pub fn sqlite_scheduler(pool: sqlx::SqlitePool, creation_secs: i64) -> Scheduler {
    use crate::clock::SystemClock;
    use crate::config::TomlConfigStore;
    use crate::store::{InlineTaskManager, SqliteCardStore, SqliteDeckTree, SqliteNoteMutator};

    Scheduler::new(
        Box::new(SqliteCardStore::new(pool.clone())),
        Box::new(SqliteDeckTree::new(pool.clone())),
        Box::new(SqliteNoteMutator::new(pool)),
        Box::new(SystemClock),
        Box::new(TomlConfigStore),
        Box::new(InlineTaskManager),
        creation_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_count_matches_filtered_resched_rules() {
        let store = Box::new(NoopStore);
        let decks = Box::new(NoopDecks);
        let notes = Box::new(NoopNotes);
        let clock = Box::new(crate::clock::FakeClock::new(0));
        let config = Box::new(NoopConfig);
        let tasks = Box::new(crate::store::InlineTaskManager);
        let sched = Scheduler::new(store, decks, notes, clock, config, tasks, 0);
        assert_eq!(sched.button_count(false, false), 4);
        assert_eq!(sched.button_count(true, false), 2);
        assert_eq!(sched.button_count(true, true), 4);
        assert_eq!(sched.name(), "std2");
    }

    struct NoopStore;
    #[async_trait::async_trait]
    impl CardStore for NoopStore {
        async fn get_card(&self, _: CardId) -> Result<Option<Card>, Error> {
            Ok(None)
        }
        async fn save_card(&self, _: &Card) -> Result<(), Error> {
            Ok(())
        }
        async fn save_cards(&self, _: &[Card]) -> Result<(), Error> {
            Ok(())
        }
        async fn count_new_in_deck(&self, _: DeckId, _: u32, _: &FetchExclusions) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_review_in_decks(&self, _: &[DeckId], _: i32, _: u32, _: &FetchExclusions) -> Result<u32, Error> {
            Ok(0)
        }
        async fn count_lrn(&self, _: &[DeckId], _: i64, _: i32, _: &FetchExclusions) -> Result<(u32, u32, u32), Error> {
            Ok((0, 0, 0))
        }
        async fn fetch_new_queue(&self, _: DeckId, _: u32, _: &FetchExclusions) -> Result<Vec<CardId>, Error> {
            Ok(vec![])
        }
        async fn fetch_rev_queue(&self, _: &[DeckId], _: i32, _: u32, _: &FetchExclusions) -> Result<Vec<CardId>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_queue(&self, _: &[DeckId], _: i64, _: u32, _: &FetchExclusions) -> Result<Vec<(i64, CardId)>, Error> {
            Ok(vec![])
        }
        async fn fetch_lrn_day_queue(&self, _: DeckId, _: i32, _: u32, _: &FetchExclusions) -> Result<Vec<CardId>, Error> {
            Ok(vec![])
        }
        async fn siblings(&self, _: NoteId, _: CardId, _: i32) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
        async fn cards_for_note(&self, _: NoteId) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
        async fn cards_in_deck(&self, _: DeckId) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
        #[allow(clippy::too_many_arguments)]
        async fn append_revlog(
            &self,
            _: i64,
            _: CardId,
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
        async fn search_cards(&self, _: &str, _: crate::model::FilteredOrder, _: i32, _: u32) -> Result<Vec<CardId>, Error> {
            Ok(vec![])
        }
        async fn get_deck_config(&self, _: crate::model::DeckConfigId) -> Result<DeckConfig, Error> {
            Ok(DeckConfig::default())
        }
        async fn max_new_due(&self) -> Result<i64, Error> {
            Ok(0)
        }
        async fn new_cards_due_at_least(&self, _: i64) -> Result<Vec<Card>, Error> {
            Ok(vec![])
        }
    }

    struct NoopDecks;
    #[async_trait::async_trait]
    impl DeckTree for NoopDecks {
        async fn active(&self) -> Result<Vec<DeckId>, Error> {
            Ok(vec![])
        }
        async fn selected(&self) -> Result<DeckId, Error> {
            Ok(1)
        }
        async fn get(&self, _: DeckId) -> Result<Option<Deck>, Error> {
            Ok(None)
        }
        async fn all(&self) -> Result<Vec<Deck>, Error> {
            Ok(vec![])
        }
        async fn parents(&self, _: DeckId) -> Result<Vec<Deck>, Error> {
            Ok(vec![])
        }
        async fn save(&self, _: &Deck) -> Result<(), Error> {
            Ok(())
        }
    }

    struct NoopNotes;
    #[async_trait::async_trait]
    impl NoteMutator for NoopNotes {
        async fn add_tag(&self, _: NoteId, _: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn has_tag(&self, _: NoteId, _: &str) -> Result<bool, Error> {
            Ok(false)
        }
    }

    struct NoopConfig;
    impl ConfigStore for NoopConfig {
        fn get(&self) -> Result<SchedulerRuntimeConfig, Error> {
            Ok(SchedulerRuntimeConfig::default())
        }
        fn set(&self, _: &SchedulerRuntimeConfig) -> Result<(), Error> {
            Ok(())
        }
    }
}
