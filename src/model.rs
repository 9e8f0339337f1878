//! Card/deck/config/revlog shapes. These mirror the
//! columns in `migrations/0001_init.sql`; `DeckConfig` round-trips through
//! the `deck_config.data` JSON column rather than being spread across
//! dedicated columns, since it is rarely queried by field.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type CardId = i64;
pub type NoteId = i64;
pub type DeckId = i64;
pub type DeckConfigId = i64;

pub const STARTING_FACTOR: i32 = 2500;
pub const MINIMUM_FACTOR: i32 = 1300;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const QUEUE_LIMIT: usize = 50;
pub const REPORT_LIMIT: u32 = 99_999;
pub const DYN_REPORT_LIMIT: u32 = 99_999;

/// Indexed by `ease - 2`, i.e. `[Hard, Good, Easy]`.
pub const FACTOR_ADDITION_VALUES: [i32; 3] = [-150, 0, 150];

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, sqlx::Type, strum::Display)]
#[repr(i8)]
pub enum CardType {
    #[default]
    New = 0,
    Learning = 1,
    Review = 2,
    Relearning = 3,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, sqlx::Type, strum::Display)]
#[repr(i8)]
pub enum CardQueue {
    Suspended = -1,
    SiblingBuried = -2,
    ManuallyBuried = -3,
    #[default]
    New = 0,
    Learning = 1,
    Review = 2,
    DayLearnRelearn = 3,
    Preview = 4,
}

impl CardQueue {
    pub const fn is_buried(self) -> bool {
        matches!(self, Self::SiblingBuried | Self::ManuallyBuried)
    }

    /// The queue a card with this `type` reverts to once unburied/unsuspended.
    /// `odue_or_due` is the card's `odue` if it has one, else its `due`.
    pub fn restored_from_type(card_type: CardType, odue_or_due: i64) -> Self {
        match card_type {
            CardType::Learning | CardType::Relearning => {
                if odue_or_due > 1_000_000_000 {
                    Self::Learning
                } else {
                    Self::DayLearnRelearn
                }
            }
            CardType::New => Self::New,
            CardType::Review => Self::Review,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type, strum::Display)]
#[repr(i8)]
pub enum RevlogType {
    Learn = 0,
    Review = 1,
    Relearn = 2,
    EarlyReview = 3,
}

/// User ratings. Narrowed to `{Again, Good}` while previewing a card from a
/// filtered deck with `resched = false`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum Ease {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Ease {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, FromRow, Serialize)]
pub struct Card {
    pub id: CardId,
    pub note_id: NoteId,
    pub did: DeckId,
    pub ord: i64,
    #[sqlx(try_from = "i8")]
    pub card_type: CardType,
    #[sqlx(try_from = "i8")]
    pub queue: CardQueue,
    pub due: i64,
    pub ivl: i64,
    pub factor: i32,
    pub reps: i64,
    pub lapses: i64,
    pub left: i64,
    pub odid: DeckId,
    pub odue: i64,
    pub last_ivl: i64,
    pub usn: i64,
    pub modified_at: i64,
}

impl Card {
    pub const fn is_filtered(&self) -> bool {
        self.odid != 0
    }

    /// `odue` if the card is sitting in a filtered deck, else `due`. Used
    /// wherever "due, or odue if filtered" matters: late-delay
    /// calculation, early review, restoring buried/suspended cards.
    pub const fn odue_or_due(&self) -> i64 {
        if self.odid != 0 { self.odue } else { self.due }
    }

    pub const fn left_state(&self) -> LeftState {
        LeftState::from_packed(self.left)
    }

    pub fn set_left_state(&mut self, state: LeftState) {
        self.left = state.packed();
    }
}

/// `left = total_left_today * 1000 + steps_left`, kept as an explicit struct
/// instead of inlining the packed arithmetic at every call site.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LeftState {
    pub total_today: i64,
    pub steps_left: i64,
}

impl LeftState {
    pub const fn from_packed(left: i64) -> Self {
        Self {
            total_today: left / 1000,
            steps_left: left % 1000,
        }
    }

    pub const fn packed(self) -> i64 {
        self.total_today * 1000 + self.steps_left
    }
}

#[derive(Clone, Debug, Default, Deserialize, FromRow, Serialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub parent_id: Option<DeckId>,
    pub is_filtered: bool,
    pub config_id: DeckConfigId,
    pub new_today_day: i32,
    pub new_today_count: i64,
    pub rev_today_day: i32,
    pub rev_today_count: i64,
    pub lrn_today_day: i32,
    pub lrn_today_count: i64,
    pub time_today_day: i32,
    pub time_today_count: i64,
    /// JSON-encoded `Vec<FilteredTerm>`; only meaningful when `is_filtered`.
    pub filtered_terms: String,
}

impl Deck {
    pub fn terms(&self) -> Vec<FilteredTerm> {
        serde_json::from_str(&self.filtered_terms).unwrap_or_default()
    }

    pub fn set_terms(&mut self, terms: &[FilteredTerm]) {
        self.filtered_terms = serde_json::to_string(terms).unwrap_or_else(|_| "[]".to_string());
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FilteredOrder {
    OldestMod,
    Random,
    IvlAsc,
    IvlDesc,
    LapsesDesc,
    NoteIdAsc,
    NoteIdDesc,
    DuePriority,
    Due,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FilteredTerm {
    pub query: String,
    pub limit: u32,
    pub order: FilteredOrder,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum LeechAction {
    Suspend,
    TagOnly,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewCardConfig {
    pub per_day: u32,
    /// Learning-step delays, in minutes.
    pub delays: Vec<f64>,
    /// Graduating/easy intervals in days: `[graduate, easy]`.
    pub ints: [i64; 2],
    pub initial_factor: i32,
    pub bury: bool,
    pub order: NewCardOrder,
    /// Keep new cards from the same note apart (distinct from sibling bury).
    pub separate: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum NewCardOrder {
    Due,
    Random,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LapseConfig {
    /// Relearning-step delays, in minutes.
    pub delays: Vec<f64>,
    pub mult: f64,
    pub min_int: i64,
    pub leech_fails: u32,
    pub leech_action: LeechAction,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReviewConfig {
    pub per_day: u32,
    pub hard_factor: Option<f64>,
    pub ease4: f64,
    pub ivl_fct: Option<f64>,
    pub max_ivl: i64,
    pub bury: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeckConfig {
    pub id: DeckConfigId,
    pub name: String,
    pub new: NewCardConfig,
    pub lapse: LapseConfig,
    pub rev: ReviewConfig,
    /// Set only on configs synthesized for a card reviewed inside a filtered deck.
    pub dyn_resched: Option<bool>,
    pub preview_delay_secs: i64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Default".to_string(),
            new: NewCardConfig {
                per_day: 20,
                delays: vec![1.0, 10.0],
                ints: [1, 4],
                initial_factor: STARTING_FACTOR,
                bury: false,
                order: NewCardOrder::Due,
                separate: true,
            },
            lapse: LapseConfig {
                delays: vec![10.0],
                mult: 0.0,
                min_int: 1,
                leech_fails: 8,
                leech_action: LeechAction::Suspend,
            },
            rev: ReviewConfig {
                per_day: 200,
                hard_factor: Some(1.2),
                ease4: 1.3,
                ivl_fct: Some(1.0),
                max_ivl: 36_500,
                bury: false,
            },
            dyn_resched: None,
            preview_delay_secs: 600,
        }
    }
}

#[derive(Clone, Debug, Deserialize, FromRow, Serialize)]
pub struct ReviewLogEntry {
    pub time_ms: i64,
    pub card_id: CardId,
    pub usn: i64,
    pub ease: i64,
    pub ivl: i64,
    pub last_ivl: i64,
    pub factor: i32,
    pub time_taken: i64,
    #[sqlx(try_from = "i8")]
    pub revlog_type: RevlogType,
}
