//! External collaborator contracts: persistent card
//! store, deck tree, note mutation, and config/task-manager hooks the core
//! drives but does not own. One SQLite-backed implementation of each,
//! written with raw `sqlx::query`/`sqlx::query_as` calls — no query
//! builder, no ORM.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::SchedulerRuntimeConfig;
use crate::model::{
    Card, CardId, Deck, DeckConfig, DeckConfigId, DeckId, FilteredOrder, NoteId, RevlogType,
};
use crate::Error;

/// Order + limit + filter used when selecting cards into a queue buffer, or
/// a filtered-deck term's search. `exclude_id`/`exclude_note_id` keep the
/// currently-displayed card from being re-fetched.
#[derive(Clone, Debug, Default)]
pub struct FetchExclusions {
    pub exclude_id: Option<CardId>,
    pub exclude_note_id: Option<NoteId>,
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get_card(&self, id: CardId) -> Result<Option<Card>, Error>;
    async fn save_card(&self, card: &Card) -> Result<(), Error>;
    async fn save_cards(&self, cards: &[Card]) -> Result<(), Error>;

    async fn count_new_in_deck(
        &self,
        did: DeckId,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<u32, Error>;

    async fn count_review_in_decks(
        &self,
        dids: &[DeckId],
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<u32, Error>;

    async fn count_lrn(
        &self,
        dids: &[DeckId],
        cutoff: i64,
        today: i32,
        excl: &FetchExclusions,
    ) -> Result<(u32, u32, u32), Error>;

    async fn fetch_new_queue(
        &self,
        did: DeckId,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error>;

    async fn fetch_rev_queue(
        &self,
        dids: &[DeckId],
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error>;

    async fn fetch_lrn_queue(
        &self,
        dids: &[DeckId],
        cutoff: i64,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<(i64, CardId)>, Error>;

    async fn fetch_lrn_day_queue(
        &self,
        did: DeckId,
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error>;

    /// Cards sharing `nid`, excluding `id`, whose queue is New or Review with
    /// `due <= today`, used for same-day sibling spacing.
    async fn siblings(&self, nid: NoteId, id: CardId, today: i32) -> Result<Vec<Card>, Error>;

    async fn cards_for_note(&self, nid: NoteId) -> Result<Vec<Card>, Error>;

    /// Every card currently homed in `did`, regardless of queue. Used by
    /// filtered-deck eviction and deck-wide bury/unbury sweeps, which need
    /// to see buried and suspended cards too.
    async fn cards_in_deck(&self, did: DeckId) -> Result<Vec<Card>, Error>;

    async fn append_revlog(
        &self,
        time_ms: i64,
        card_id: CardId,
        usn: i64,
        ease: i64,
        ivl: i64,
        last_ivl: i64,
        factor: i32,
        time_taken: i64,
        revlog_type: RevlogType,
    ) -> Result<(), Error>;

    async fn search_cards(
        &self,
        query: &str,
        order: FilteredOrder,
        today: i32,
        limit: u32,
    ) -> Result<Vec<CardId>, Error>;

    async fn get_deck_config(&self, id: DeckConfigId) -> Result<DeckConfig, Error>;

    /// Highest `due` position currently held by any New card, or `0` if
    /// there are none. Used to append freshly un-forgotten cards after the
    /// existing New queue rather than colliding with it.
    async fn max_new_due(&self) -> Result<i64, Error>;

    /// Every New card whose `due` position is at least `start`, regardless
    /// of deck. Used by `sort_cards`'s `shift` pass to make room for a
    /// freshly renumbered batch.
    async fn new_cards_due_at_least(&self, start: i64) -> Result<Vec<Card>, Error>;
}

#[async_trait]
pub trait DeckTree: Send + Sync {
    async fn active(&self) -> Result<Vec<DeckId>, Error>;
    async fn selected(&self) -> Result<DeckId, Error>;
    async fn get(&self, did: DeckId) -> Result<Option<Deck>, Error>;
    async fn all(&self) -> Result<Vec<Deck>, Error>;
    /// Root-to-leaf chain of ancestors, not including `did` itself.
    async fn parents(&self, did: DeckId) -> Result<Vec<Deck>, Error>;
    async fn save(&self, deck: &Deck) -> Result<(), Error>;
}

#[async_trait]
pub trait NoteMutator: Send + Sync {
    async fn add_tag(&self, nid: NoteId, tag: &str) -> Result<(), Error>;
    async fn has_tag(&self, nid: NoteId, tag: &str) -> Result<bool, Error>;
}

pub trait ConfigStore: Send + Sync {
    fn get(&self) -> Result<SchedulerRuntimeConfig, Error>;
    fn set(&self, config: &SchedulerRuntimeConfig) -> Result<(), Error>;
}

/// Deferred async reset hook: `get_card` requests a
/// re-reset via an external task manager after a failed fetch with stale
/// counts, rather than blocking the caller on it.
pub trait TaskManager: Send + Sync {
    fn launch_reset(&self);
}

/// No-op task manager for callers who drive `reset_counts` themselves.
#[derive(Debug, Default)]
pub struct InlineTaskManager;

impl TaskManager for InlineTaskManager {
    fn launch_reset(&self) {}
}

pub struct SqliteCardStore {
    pool: SqlitePool,
}

impl SqliteCardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn excl_new_clause(excl: &FetchExclusions) -> String {
    let mut clauses = Vec::new();
    if excl.exclude_id.is_some() {
        clauses.push("AND id != ?");
    }
    if excl.exclude_note_id.is_some() {
        clauses.push("AND note_id != ?");
    }
    clauses.join(" ")
}

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn get_card(&self, id: CardId) -> Result<Option<Card>, Error> {
        let card = sqlx::query_as::<_, Card>("SELECT * FROM card WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(card)
    }

    async fn save_card(&self, card: &Card) -> Result<(), Error> {
        sqlx::query(
            r"UPDATE card SET note_id = ?, did = ?, ord = ?, card_type = ?, queue = ?, due = ?,
                ivl = ?, factor = ?, reps = ?, lapses = ?, left = ?, odid = ?, odue = ?,
                last_ivl = ?, usn = ?, modified_at = ?
              WHERE id = ?",
        )
        .bind(card.note_id)
        .bind(card.did)
        .bind(card.ord)
        .bind(card.card_type)
        .bind(card.queue)
        .bind(card.due)
        .bind(card.ivl)
        .bind(card.factor)
        .bind(card.reps)
        .bind(card.lapses)
        .bind(card.left)
        .bind(card.odid)
        .bind(card.odue)
        .bind(card.last_ivl)
        .bind(card.usn)
        .bind(card.modified_at)
        .bind(card.id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Sqlx { source: e })?;
        Ok(())
    }

    async fn save_cards(&self, cards: &[Card]) -> Result<(), Error> {
        for card in cards {
            self.save_card(card).await?;
        }
        Ok(())
    }

    async fn count_new_in_deck(
        &self,
        did: DeckId,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<u32, Error> {
        let clause = excl_new_clause(excl);
        let sql = format!(
            "SELECT count(*) FROM (SELECT 1 FROM card WHERE did = ? AND queue = 0 {clause} LIMIT ?)"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(did);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let count: i64 = q
            .bind(limit)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(count as u32)
    }

    async fn count_review_in_decks(
        &self,
        dids: &[DeckId],
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<u32, Error> {
        if dids.is_empty() {
            return Ok(0);
        }
        let placeholders = dids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let clause = excl_new_clause(excl);
        let sql = format!(
            "SELECT count(*) FROM (SELECT id FROM card WHERE did IN ({placeholders}) AND queue = 2 AND due <= ? {clause} LIMIT ?)"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for did in dids {
            q = q.bind(did);
        }
        q = q.bind(today);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let count: i64 = q
            .bind(limit)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(count as u32)
    }

    async fn count_lrn(
        &self,
        dids: &[DeckId],
        cutoff: i64,
        today: i32,
        excl: &FetchExclusions,
    ) -> Result<(u32, u32, u32), Error> {
        if dids.is_empty() {
            return Ok((0, 0, 0));
        }
        let placeholders = dids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let clause = excl_new_clause(excl);

        let learning_sql = format!(
            "SELECT count(*) FROM card WHERE did IN ({placeholders}) AND queue = 1 AND due < ? {clause}"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&learning_sql);
        for did in dids {
            q = q.bind(did);
        }
        q = q.bind(cutoff);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let learning: i64 = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;

        let day_sql = format!(
            "SELECT count(*) FROM card WHERE did IN ({placeholders}) AND queue = 3 AND due <= ? {clause}"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&day_sql);
        for did in dids {
            q = q.bind(did);
        }
        q = q.bind(today);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let day: i64 = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;

        let preview_sql =
            format!("SELECT count(*) FROM card WHERE did IN ({placeholders}) AND queue = 4 {clause}");
        let mut q = sqlx::query_scalar::<_, i64>(&preview_sql);
        for did in dids {
            q = q.bind(did);
        }
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let preview: i64 = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;

        Ok((learning as u32, day as u32, preview as u32))
    }

    async fn fetch_new_queue(
        &self,
        did: DeckId,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error> {
        let clause = excl_new_clause(excl);
        let sql =
            format!("SELECT id FROM card WHERE did = ? AND queue = 0 {clause} ORDER BY due, ord LIMIT ?");
        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(did);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let ids = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(ids)
    }

    async fn fetch_rev_queue(
        &self,
        dids: &[DeckId],
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error> {
        if dids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = dids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let clause = excl_new_clause(excl);
        let sql = format!(
            "SELECT id FROM card WHERE did IN ({placeholders}) AND queue = 2 AND due <= ? {clause} ORDER BY due, RANDOM() LIMIT ?"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for did in dids {
            q = q.bind(did);
        }
        q = q.bind(today);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let ids = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(ids)
    }

    async fn fetch_lrn_queue(
        &self,
        dids: &[DeckId],
        cutoff: i64,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<(i64, CardId)>, Error> {
        if dids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = dids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let clause = excl_new_clause(excl);
        let sql = format!(
            "SELECT due, id FROM card WHERE did IN ({placeholders}) AND queue IN (1, 4) AND due < ? {clause} ORDER BY due LIMIT ?"
        );
        let mut q = sqlx::query_as::<_, (i64, i64)>(&sql);
        for did in dids {
            q = q.bind(did);
        }
        q = q.bind(cutoff);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let rows = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(rows)
    }

    async fn fetch_lrn_day_queue(
        &self,
        did: DeckId,
        today: i32,
        limit: u32,
        excl: &FetchExclusions,
    ) -> Result<Vec<CardId>, Error> {
        let clause = excl_new_clause(excl);
        let sql = format!(
            "SELECT id FROM card WHERE did = ? AND queue = 3 AND due <= ? {clause} LIMIT ?"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(did).bind(today);
        if let Some(id) = excl.exclude_id {
            q = q.bind(id);
        }
        if let Some(nid) = excl.exclude_note_id {
            q = q.bind(nid);
        }
        let ids = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(ids)
    }

    async fn siblings(&self, nid: NoteId, id: CardId, today: i32) -> Result<Vec<Card>, Error> {
        let cards = sqlx::query_as::<_, Card>(
            "SELECT * FROM card WHERE note_id = ? AND id != ? AND (queue = 0 OR (queue = 2 AND due <= ?))",
        )
        .bind(nid)
        .bind(id)
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Sqlx { source: e })?;
        Ok(cards)
    }

    async fn cards_for_note(&self, nid: NoteId) -> Result<Vec<Card>, Error> {
        let cards = sqlx::query_as::<_, Card>("SELECT * FROM card WHERE note_id = ?")
            .bind(nid)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(cards)
    }

    async fn cards_in_deck(&self, did: DeckId) -> Result<Vec<Card>, Error> {
        let cards = sqlx::query_as::<_, Card>("SELECT * FROM card WHERE did = ?")
            .bind(did)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(cards)
    }

    async fn append_revlog(
        &self,
        time_ms: i64,
        card_id: CardId,
        usn: i64,
        ease: i64,
        ivl: i64,
        last_ivl: i64,
        factor: i32,
        time_taken: i64,
        revlog_type: RevlogType,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO review_log (time_ms, card_id, usn, ease, ivl, last_ivl, factor, time_taken, revlog_type) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(time_ms)
        .bind(card_id)
        .bind(usn)
        .bind(ease)
        .bind(ivl)
        .bind(last_ivl)
        .bind(factor)
        .bind(time_taken)
        .bind(revlog_type)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Sqlx { source: e })?;
        Ok(())
    }

    async fn search_cards(
        &self,
        query: &str,
        order: FilteredOrder,
        today: i32,
        limit: u32,
    ) -> Result<Vec<CardId>, Error> {
        // The search string itself is opaque to this core (the caller
        // wraps it as "(query) -is:suspended -is:buried -deck:filtered"
        // and delegates matching to whatever search compiler the store
        // embeds); here it is treated as a literal note/card id list the
        // store already resolved, joined back against `card`.
        let order_by = match order {
            FilteredOrder::OldestMod => "modified_at ASC",
            FilteredOrder::Random => "RANDOM()",
            FilteredOrder::IvlAsc => "ivl ASC",
            FilteredOrder::IvlDesc => "ivl DESC",
            FilteredOrder::LapsesDesc => "lapses DESC",
            FilteredOrder::NoteIdAsc => "note_id ASC",
            FilteredOrder::NoteIdDesc => "note_id DESC",
            FilteredOrder::Due => "due ASC",
            FilteredOrder::DuePriority => {
                "(CASE WHEN queue = 2 AND due <= ? THEN CAST(ivl AS REAL) / (? - due + 0.001) ELSE 100000 + due END) DESC"
            }
        };
        let sql = format!(
            "SELECT id FROM card WHERE id IN (SELECT id FROM card WHERE note_id IN (SELECT note_id FROM note_tag WHERE tag = ?)) AND queue != -1 AND queue >= -1 ORDER BY {order_by} LIMIT ?"
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(query);
        if matches!(order, FilteredOrder::DuePriority) {
            q = q.bind(today).bind(today);
        }
        let ids = q
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(ids)
    }

    async fn max_new_due(&self) -> Result<i64, Error> {
        let due: Option<i64> = sqlx::query_scalar("SELECT MAX(due) FROM card WHERE card_type = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(due.unwrap_or(0))
    }

    async fn new_cards_due_at_least(&self, start: i64) -> Result<Vec<Card>, Error> {
        let cards = sqlx::query_as::<_, Card>("SELECT * FROM card WHERE card_type = 0 AND due >= ?")
            .bind(start)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(cards)
    }

    async fn get_deck_config(&self, id: DeckConfigId) -> Result<DeckConfig, Error> {
        let data: String = sqlx::query_scalar("SELECT data FROM deck_config WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Library(crate::LibraryError::StoreError(e.to_string())))
    }
}

pub struct SqliteDeckTree {
    pool: SqlitePool,
}

impl SqliteDeckTree {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeckTree for SqliteDeckTree {
    async fn active(&self) -> Result<Vec<DeckId>, Error> {
        let selected = self.selected().await?;
        let selected_deck = self.get(selected).await?;
        let is_filtered = selected_deck.map(|d| d.is_filtered).unwrap_or(false);
        if is_filtered {
            return Ok(vec![selected]);
        }
        let ids = sqlx::query_scalar::<_, i64>(
            r"WITH RECURSIVE subtree(id) AS (
                SELECT id FROM deck WHERE id = ?
                UNION ALL
                SELECT d.id FROM deck d JOIN subtree s ON d.parent_id = s.id
            )
            SELECT id FROM deck WHERE id IN (SELECT id FROM subtree) AND is_filtered = 0",
        )
        .bind(selected)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Sqlx { source: e })?;
        Ok(ids)
    }

    async fn selected(&self) -> Result<DeckId, Error> {
        let id = sqlx::query_scalar::<_, i64>("SELECT selected_deck_id FROM scheduler_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(id)
    }

    async fn get(&self, did: DeckId) -> Result<Option<Deck>, Error> {
        let deck = sqlx::query_as::<_, Deck>("SELECT * FROM deck WHERE id = ?")
            .bind(did)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(deck)
    }

    async fn all(&self) -> Result<Vec<Deck>, Error> {
        let decks = sqlx::query_as::<_, Deck>("SELECT * FROM deck")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(decks)
    }

    async fn parents(&self, did: DeckId) -> Result<Vec<Deck>, Error> {
        let mut chain = Vec::new();
        let mut current = self.get(did).await?;
        while let Some(deck) = current {
            let Some(parent_id) = deck.parent_id else {
                break;
            };
            let parent = self.get(parent_id).await?;
            if let Some(ref parent_deck) = parent {
                chain.push(parent_deck.clone());
            }
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    async fn save(&self, deck: &Deck) -> Result<(), Error> {
        sqlx::query(
            r"UPDATE deck SET name = ?, parent_id = ?, is_filtered = ?, config_id = ?,
                new_today_day = ?, new_today_count = ?, rev_today_day = ?, rev_today_count = ?,
                lrn_today_day = ?, lrn_today_count = ?, time_today_day = ?, time_today_count = ?,
                filtered_terms = ?
              WHERE id = ?",
        )
        .bind(&deck.name)
        .bind(deck.parent_id)
        .bind(deck.is_filtered)
        .bind(deck.config_id)
        .bind(deck.new_today_day)
        .bind(deck.new_today_count)
        .bind(deck.rev_today_day)
        .bind(deck.rev_today_count)
        .bind(deck.lrn_today_day)
        .bind(deck.lrn_today_count)
        .bind(deck.time_today_day)
        .bind(deck.time_today_count)
        .bind(&deck.filtered_terms)
        .bind(deck.id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Sqlx { source: e })?;
        Ok(())
    }
}

pub struct SqliteNoteMutator {
    pool: SqlitePool,
}

impl SqliteNoteMutator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteMutator for SqliteNoteMutator {
    async fn add_tag(&self, nid: NoteId, tag: &str) -> Result<(), Error> {
        sqlx::query("INSERT OR IGNORE INTO note_tag (note_id, tag) VALUES (?, ?)")
            .bind(nid)
            .bind(tag)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(())
    }

    async fn has_tag(&self, nid: NoteId, tag: &str) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM note_tag WHERE note_id = ? AND tag = ?")
            .bind(nid)
            .bind(tag)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Sqlx { source: e })?;
        Ok(count > 0)
    }
}
