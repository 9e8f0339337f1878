//! The answer/state-machine engine. This module owns
//! the pure card-mutation logic; the scheduler facade resolves the
//! effective `DeckConfig` (the filtered-deck overlay), persists
//! the card, bumps deck counters, and writes the revlog entry.

use rand::Rng;

use crate::interval::{
    delay_for_grade, delay_for_repeating_grade, early_review_ivl, graduating_ivl, lapse_ivl,
    next_rev_ivl, starting_left,
};
use crate::leech::check_leech;
use crate::model::{
    Card, CardQueue, CardType, DeckConfig, FACTOR_ADDITION_VALUES, MINIMUM_FACTOR, RevlogType,
    SECONDS_PER_DAY,
};
use crate::store::NoteMutator;
use crate::{Error, LibraryError};

/// Which per-deck daily counter a successful answer should bump. The
/// scheduler facade applies this to the deck row; this module stays
/// store-agnostic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CounterBump {
    New,
    Review,
    Learning,
    None,
}

pub struct RevlogDraft {
    pub ease: i64,
    pub ivl: i64,
    pub last_ivl: i64,
    pub factor: i32,
    pub revlog_type: RevlogType,
}

pub struct AnswerOutcome {
    pub revlog: RevlogDraft,
    pub bump: CounterBump,
    /// True if a leech was detected and the note was tagged this call.
    pub leech: bool,
}

fn invalid_transition(card: &Card) -> Error {
    Error::Library(LibraryError::InvalidTransition {
        card_id: card.id,
        queue: card.queue,
    })
}

/// Top-level entry point for applying a rating to a card. Caller has
/// already discarded the current card from queues, called `bury_siblings`,
/// and resolved the effective config; this mutates `card` in place.
pub async fn answer_card(
    card: &mut Card,
    ease: u8,
    conf: &DeckConfig,
    today: i32,
    day_cutoff: i64,
    now: i64,
    collapse_time_secs: i64,
    notes: &dyn NoteMutator,
    rng: &mut impl Rng,
) -> Result<AnswerOutcome, Error> {
    let previewing = card.is_filtered() && conf.dyn_resched == Some(false);
    let mut bump = CounterBump::None;
    let mut leech = false;

    let revlog = if previewing {
        answer_preview_card(card, ease, conf, now)?
    } else {
        card.reps += 1;
        if matches!(card.queue, CardQueue::New) {
            card.card_type = CardType::Learning;
            card.queue = CardQueue::Learning;
            card.left = starting_left(&conf.new.delays, now, day_cutoff);
            bump = CounterBump::New;
        }

        match card.queue {
            CardQueue::Learning | CardQueue::DayLearnRelearn => {
                answer_lrn_card(card, ease, conf, today, day_cutoff, now, collapse_time_secs, rng)?
            }
            CardQueue::Review => {
                let outcome = answer_rev_card(card, ease, conf, today, notes, rng).await?;
                if matches!(bump, CounterBump::None) {
                    bump = CounterBump::Review;
                }
                leech = outcome.1;
                outcome.0
            }
            _ => return Err(invalid_transition(card)),
        }
    };

    if card.odue > 0 && !card.is_filtered_preview_pending(conf) {
        card.odue = 0;
    }

    Ok(AnswerOutcome { revlog, bump, leech })
}

impl Card {
    /// A restored-from-filtered preview card still carries `odue` briefly
    /// while `answer_preview_card`'s ease=1 branch leaves it resident; this
    /// guards the generic "zero odue after answering" step from clobbering
    /// it before the restore branch runs.
    fn is_filtered_preview_pending(&self, conf: &DeckConfig) -> bool {
        self.is_filtered() && conf.dyn_resched == Some(false) && matches!(self.queue, CardQueue::Preview)
    }
}

fn answer_preview_card(
    card: &mut Card,
    ease: u8,
    conf: &DeckConfig,
    now: i64,
) -> Result<RevlogDraft, Error> {
    match ease {
        1 => {
            card.queue = CardQueue::Preview;
            card.due = now + conf.preview_delay_secs;
            Ok(RevlogDraft {
                ease: 1,
                ivl: 0,
                last_ivl: card.last_ivl,
                factor: card.factor,
                revlog_type: RevlogType::EarlyReview,
            })
        }
        2 => {
            restore_preview_card(card)?;
            card.did = card.odid;
            card.odid = 0;
            card.odue = 0;
            Ok(RevlogDraft {
                ease: 2,
                ivl: 0,
                last_ivl: card.last_ivl,
                factor: card.factor,
                revlog_type: RevlogType::EarlyReview,
            })
        }
        _ => Err(invalid_transition(card)),
    }
}

/// Restores a previewed card's `queue`/`due` from its filtered overlay.
pub fn restore_preview_card(card: &mut Card) -> Result<(), Error> {
    if !card.is_filtered() {
        return Err(Error::Library(LibraryError::InvalidPreviewState(card.id)));
    }
    card.due = card.odue;
    card.queue = match card.card_type {
        CardType::Learning | CardType::Relearning => {
            if card.odue > 1_000_000_000 {
                CardQueue::Learning
            } else {
                CardQueue::DayLearnRelearn
            }
        }
        CardType::New => CardQueue::New,
        CardType::Review => CardQueue::Review,
    };
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn answer_lrn_card(
    card: &mut Card,
    ease: u8,
    conf: &DeckConfig,
    today: i32,
    day_cutoff: i64,
    now: i64,
    collapse_time_secs: i64,
    rng: &mut impl Rng,
) -> Result<RevlogDraft, Error> {
    let log_type = if matches!(card.card_type, CardType::Review | CardType::Relearning) {
        RevlogType::Relearn
    } else {
        RevlogType::Learn
    };
    let last_left = card.left;
    let mut leaving = false;

    match ease {
        4 => {
            reschedule_as_rev(card, conf, true, today, rng);
            leaving = true;
        }
        3 => {
            let steps_left = card.left % 1000;
            if steps_left - 1 <= 0 {
                reschedule_as_rev(card, conf, false, today, rng);
                leaving = true;
            } else {
                let new_left = card.left - 1;
                card.left = crate::interval::left_today(&conf.new.delays, new_left, now, day_cutoff) * 1000
                    + (new_left % 1000);
                reschedule_lrn_card(card, conf, None, today, now, day_cutoff, collapse_time_secs);
            }
        }
        2 => {
            let delay = delay_for_repeating_grade(&conf.new.delays, card.left);
            reschedule_lrn_card(card, conf, Some(delay), today, now, day_cutoff, collapse_time_secs);
        }
        1 => {
            card.left = starting_left(&conf.new.delays, now, day_cutoff);
            if matches!(card.card_type, CardType::Relearning) {
                card.last_ivl = card.ivl;
                card.ivl = lapse_ivl(card, conf);
            }
            reschedule_lrn_card(card, conf, None, today, now, day_cutoff, collapse_time_secs);
        }
        _ => return Err(invalid_transition(card)),
    }

    Ok(RevlogDraft {
        ease: i64::from(ease),
        ivl: if leaving { card.ivl } else { -(delay_for_grade(&conf.new.delays, last_left)) },
        last_ivl: -(delay_for_grade(&conf.new.delays, last_left)),
        factor: card.factor,
        revlog_type: log_type,
    })
}

#[allow(clippy::too_many_arguments)]
fn reschedule_lrn_card(
    card: &mut Card,
    conf: &DeckConfig,
    delay: Option<i64>,
    today: i32,
    now: i64,
    day_cutoff: i64,
    _collapse_time_secs: i64,
) {
    let delay = delay.unwrap_or_else(|| delay_for_grade(&conf.new.delays, card.left));
    card.due = now + delay;
    if card.due < day_cutoff {
        // Open question (fuzz RNG semantics): sample the fuzz window as
        // `[0, max(maxExtra, 1))` rather than `[0, maxExtra)` so a zero
        // `maxExtra` still yields a valid range.
        let max_extra = 300.max((delay as f64 * 0.25) as i64).max(1);
        let mut rng = rand::thread_rng();
        let fuzz_secs = rng.gen_range(0..max_extra);
        card.due = (card.due + fuzz_secs).min(day_cutoff - 1);
        card.queue = CardQueue::Learning;
    } else {
        let ahead = (card.due - day_cutoff) / SECONDS_PER_DAY + 1;
        card.due = i64::from(today) + ahead;
        card.queue = CardQueue::DayLearnRelearn;
    }
}

fn reschedule_as_rev(card: &mut Card, conf: &DeckConfig, early: bool, today: i32, rng: &mut impl Rng) {
    if matches!(card.card_type, CardType::Review | CardType::Relearning) {
        if early {
            card.ivl += 1;
        }
        card.due = i64::from(today) + card.ivl;
        card.queue = CardQueue::Review;
        card.card_type = CardType::Review;
    } else {
        card.ivl = graduating_ivl(card, conf, early, false, rng);
        card.due = i64::from(today) + card.ivl;
        card.factor = conf.new.initial_factor;
        card.card_type = CardType::Review;
        card.queue = CardQueue::Review;
    }
    if card.is_filtered() {
        card.did = card.odid;
        card.odid = 0;
        card.odue = 0;
    }
}

async fn answer_rev_card(
    card: &mut Card,
    ease: u8,
    conf: &DeckConfig,
    today: i32,
    notes: &dyn NoteMutator,
    rng: &mut impl Rng,
) -> Result<(RevlogDraft, bool), Error> {
    let early = card.is_filtered() && card.odue > i64::from(today);
    let log_type = if early {
        RevlogType::EarlyReview
    } else {
        RevlogType::Review
    };
    let last_ivl_before = card.ivl;

    if ease == 1 {
        let (delay, leech) = reschedule_lapse(card, conf, today, notes, rng).await?;
        return Ok((
            RevlogDraft {
                ease: 1,
                ivl: -delay,
                last_ivl: last_ivl_before,
                factor: card.factor,
                revlog_type: log_type,
            },
            leech,
        ));
    }

    reschedule_rev(card, ease, conf, early, today, rng);
    Ok((
        RevlogDraft {
            ease: i64::from(ease),
            ivl: card.ivl,
            last_ivl: last_ivl_before,
            factor: card.factor,
            revlog_type: log_type,
        },
        false,
    ))
}

async fn reschedule_lapse(
    card: &mut Card,
    conf: &DeckConfig,
    today: i32,
    notes: &dyn NoteMutator,
    rng: &mut impl Rng,
) -> Result<(i64, bool), Error> {
    card.lapses += 1;
    card.factor = MINIMUM_FACTOR.max(card.factor - 200);

    let detected_leech = check_leech(card, conf, notes).await?;
    let suspended = detected_leech && matches!(card.queue, CardQueue::Suspended);

    let delay = if !conf.lapse.delays.is_empty() && !suspended {
        card.card_type = CardType::Relearning;
        card.left = starting_left(&conf.lapse.delays, 0, i64::MAX);
        delay_for_grade(&conf.lapse.delays, card.left)
    } else {
        card.ivl = lapse_ivl(card, conf);
        reschedule_as_rev(card, conf, false, today, rng);
        if suspended {
            card.queue = CardQueue::Suspended;
        }
        0
    };
    Ok((delay, detected_leech))
}

fn reschedule_rev(card: &mut Card, ease: u8, conf: &DeckConfig, early: bool, today: i32, rng: &mut impl Rng) {
    card.last_ivl = card.ivl;
    card.ivl = if early {
        early_review_ivl(card, conf, ease, today).unwrap_or(card.ivl)
    } else {
        let ivls = next_rev_ivl(card, conf, today, true, rng);
        match ease {
            2 => ivls.hard,
            3 => ivls.good,
            4 => ivls.easy,
            _ => card.ivl,
        }
    };
    let idx = (ease - 2) as usize;
    card.factor = MINIMUM_FACTOR.max(card.factor + FACTOR_ADDITION_VALUES[idx.min(2)]);
    card.due = i64::from(today) + card.ivl;
    if card.is_filtered() {
        card.did = card.odid;
        card.odid = 0;
        card.odue = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardId;
    use async_trait::async_trait;

    struct NoOpNotes;

    #[async_trait]
    impl NoteMutator for NoOpNotes {
        async fn add_tag(&self, _nid: CardId, _tag: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn has_tag(&self, _nid: CardId, _tag: &str) -> Result<bool, Error> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn new_card_graduates_through_learning_steps() {
        let mut conf = DeckConfig::default();
        conf.new.delays = vec![1.0, 10.0];
        conf.new.ints = [1, 4];
        conf.new.initial_factor = 2500;
        let mut card = Card {
            queue: CardQueue::New,
            card_type: CardType::New,
            ..Default::default()
        };
        let notes = NoOpNotes;
        let mut rng = rand::thread_rng();
        let now = 1_700_000_000;
        let day_cutoff = now + 3600 * 10;
        let today = 100;

        answer_card(&mut card, 3, &conf, today, day_cutoff, now, 1200, &notes, &mut rng)
            .await
            .unwrap();
        assert_eq!(card.queue, CardQueue::Learning);
        assert_eq!(card.card_type, CardType::Learning);

        answer_card(&mut card, 3, &conf, today, day_cutoff, now, 1200, &notes, &mut rng)
            .await
            .unwrap();
        assert_eq!(card.card_type, CardType::Review);
        assert_eq!(card.queue, CardQueue::Review);
        assert_eq!(card.ivl, 1);
        assert_eq!(card.factor, 2500);
        assert_eq!(card.due, i64::from(today) + 1);
    }

    #[tokio::test]
    async fn lapse_increments_and_floors_factor() {
        let mut conf = DeckConfig::default();
        conf.lapse.delays = vec![10.0];
        conf.lapse.mult = 0.5;
        conf.lapse.min_int = 1;
        conf.lapse.leech_fails = 0;
        let mut card = Card {
            queue: CardQueue::Review,
            card_type: CardType::Review,
            ivl: 30,
            factor: 2500,
            ..Default::default()
        };
        let notes = NoOpNotes;
        let mut rng = rand::thread_rng();
        answer_card(&mut card, 1, &conf, 100, 2_000_000_000, 1_999_999_000, 1200, &notes, &mut rng)
            .await
            .unwrap();
        assert_eq!(card.lapses, 1);
        assert_eq!(card.factor, 2300);
        assert_eq!(card.card_type, CardType::Relearning);
        assert_eq!(card.queue, CardQueue::Learning);
    }

    #[tokio::test]
    async fn invalid_queue_is_an_error() {
        let conf = DeckConfig::default();
        let mut card = Card {
            queue: CardQueue::Suspended,
            ..Default::default()
        };
        let notes = NoOpNotes;
        let mut rng = rand::thread_rng();
        let err = answer_card(&mut card, 3, &conf, 1, 100, 1, 1200, &notes, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Library(LibraryError::InvalidTransition { .. })));
    }
}
