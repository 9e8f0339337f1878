//! Pure interval math. Every function here is a free
//! function over its inputs; nothing touches the store, so these are the
//! easiest parts of the scheduler to unit test directly.

use rand::Rng;

use crate::model::{Card, DeckConfig};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FuzzRange {
    pub lo: i64,
    pub hi: i64,
}

pub fn fuzz_range(ivl: i64) -> FuzzRange {
    if ivl < 2 {
        return FuzzRange { lo: 1, hi: 1 };
    }
    if ivl == 2 {
        return FuzzRange { lo: 2, hi: 3 };
    }
    let fuzz = if ivl < 7 {
        (f64::from(ivl as i32) * 0.25).round() as i64
    } else if ivl < 30 {
        ((f64::from(ivl as i32) * 0.15).round() as i64).max(2)
    } else {
        ((f64::from(ivl as i32) * 0.05).round() as i64).max(4)
    }
    .max(1);
    FuzzRange {
        lo: ivl - fuzz,
        hi: ivl + fuzz,
    }
}

pub fn fuzzed(ivl: i64, rng: &mut impl Rng) -> i64 {
    let range = fuzz_range(ivl);
    if range.lo >= range.hi {
        return range.lo;
    }
    rng.gen_range(range.lo..=range.hi)
}

/// `v = floor(raw * conf.ivlFct)`, fuzzed if asked, then clamped to
/// `[max(prev+1, 1), conf.maxIvl]`.
pub fn constrained(raw_ivl: f64, conf: &DeckConfig, prev: i64, fuzz: bool, rng: &mut impl Rng) -> i64 {
    let fct = conf.rev.ivl_fct.unwrap_or(1.0);
    let mut v = (raw_ivl * fct).floor() as i64;
    if fuzz {
        v = fuzzed(v, rng);
    }
    v = v.max((prev + 1).max(1));
    v.min(conf.rev.max_ivl)
}

pub struct NextRevIvls {
    pub hard: i64,
    pub good: i64,
    pub easy: i64,
}

/// `next_rev_ivl` for ease 2/3/4. `today` and
/// `due_for_late_calc` (the card's `odue` if filtered, else `due`) drive the
/// late-review bonus.
pub fn next_rev_ivl(
    card: &Card,
    conf: &DeckConfig,
    today: i32,
    fuzz: bool,
    rng: &mut impl Rng,
) -> NextRevIvls {
    let delay = (i64::from(today) - card.odue_or_due()).max(0);
    let fct = f64::from(card.factor) / 1000.0;
    let hard_factor = conf.rev.hard_factor.unwrap_or(1.2);
    let hard_min = if hard_factor > 1.0 { card.ivl } else { 0 };

    let ivl2 = constrained(card.ivl as f64 * hard_factor, conf, hard_min, fuzz, rng);
    let ivl3 = constrained(
        (card.ivl as f64 + delay as f64 / 2.0) * fct,
        conf,
        ivl2,
        fuzz,
        rng,
    );
    let ivl4 = constrained(
        (card.ivl as f64 + delay as f64) * fct * conf.rev.ease4,
        conf,
        ivl3,
        fuzz,
        rng,
    );
    NextRevIvls {
        hard: ivl2,
        good: ivl3,
        easy: ivl4,
    }
}

pub fn lapse_ivl(card: &Card, conf: &DeckConfig) -> i64 {
    1.max(conf.lapse.min_int.max((card.ivl as f64 * conf.lapse.mult).floor() as i64))
}

/// `ivl + 1` (early) or `ivl` if the card is already Review/Relearning;
/// otherwise the configured graduate/easy interval, optionally fuzzed.
pub fn graduating_ivl(card: &Card, conf: &DeckConfig, early: bool, fuzz: bool, rng: &mut impl Rng) -> i64 {
    use crate::model::CardType;
    if matches!(card.card_type, CardType::Review | CardType::Relearning) {
        return card.ivl + i64::from(early);
    }
    let base = if early { conf.new.ints[1] } else { conf.new.ints[0] };
    if fuzz {
        fuzzed(base, rng)
    } else {
        base
    }
}

/// Early-review interval for a filtered-deck card reviewed ahead of its
/// `odue`. Requires the card to be filtered, Review
/// typed, with a set factor, and `ease >= 2`.
pub fn early_review_ivl(card: &Card, conf: &DeckConfig, ease: u8, today: i32) -> Result<i64, String> {
    use crate::model::CardType;
    if card.odid == 0 {
        return Err("card is not in a filtered deck".to_string());
    }
    if !matches!(card.card_type, CardType::Review) {
        return Err("card is not Review typed".to_string());
    }
    if card.factor <= 0 {
        return Err("card has no factor set".to_string());
    }
    if ease < 2 {
        return Err("ease must be >= 2 for early review".to_string());
    }
    let elapsed = card.ivl - (card.odue - i64::from(today));
    let factor = if ease == 2 {
        conf.rev.hard_factor.unwrap_or(1.2)
    } else {
        f64::from(card.factor) / 1000.0
    };
    let min_new_ivl = if ease == 2 { factor / 2.0 } else { 1.0 };
    let easy_bonus = if ease == 4 {
        conf.rev.ease4 - (conf.rev.ease4 - 1.0) / 2.0
    } else {
        1.0
    };
    let raw = (elapsed as f64 * factor).max(1.0);
    let raw = (card.ivl as f64 * min_new_ivl).max(raw) * easy_bonus;
    let mut rng = rand::thread_rng();
    Ok(constrained(raw, conf, 0, false, &mut rng))
}

pub fn starting_left(delays: &[f64], now: i64, day_cutoff: i64) -> i64 {
    let total = delays.len() as i64;
    let today_left = left_today(delays, total, now, day_cutoff);
    total + today_left * 1000
}

/// Simulates scheduling the tail of `delays` (the last `min(left, len)` of
/// them) back-to-back from `now`, counting how many complete before
/// `day_cutoff`. Always returns at least 1.
pub fn left_today(delays: &[f64], left: i64, now: i64, day_cutoff: i64) -> i64 {
    if delays.is_empty() {
        return 1;
    }
    let offset = (left as usize).min(delays.len());
    let mut t = now;
    let mut ok = 0;
    for delay_minutes in &delays[delays.len() - offset..] {
        t += (*delay_minutes * 60.0) as i64;
        if t > day_cutoff {
            break;
        }
        ok += 1;
    }
    ok + 1
}

/// `delay_for_grade`: picks the learning-step delay for the step the card is
/// currently on, falling back to `delays[0]` or 60 seconds if the index or
/// the whole list is missing.
pub fn delay_for_grade(delays: &[f64], left: i64) -> i64 {
    if delays.is_empty() {
        return 60;
    }
    let len = delays.len() as i64;
    let idx = len - (left % 1000);
    let minutes = if idx >= 0 && (idx as usize) < delays.len() {
        delays[idx as usize]
    } else {
        delays[0]
    };
    (minutes * 60.0) as i64
}

pub fn delay_for_repeating_grade(delays: &[f64], left: i64) -> i64 {
    let a = delay_for_grade(delays, left);
    let b = if delays.len() > 1 {
        delay_for_grade(delays, left - 1).max(a)
    } else {
        2 * a
    };
    (a + b) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzz_range_short_intervals() {
        assert_eq!(fuzz_range(0), FuzzRange { lo: 1, hi: 1 });
        assert_eq!(fuzz_range(1), FuzzRange { lo: 1, hi: 1 });
        assert_eq!(fuzz_range(2), FuzzRange { lo: 2, hi: 3 });
    }

    #[test]
    fn fuzz_range_contains_ivl() {
        for ivl in [2, 5, 6, 10, 29, 30, 60, 365] {
            let range = fuzz_range(ivl);
            assert!(range.lo <= ivl && ivl <= range.hi, "ivl={ivl} range={range:?}");
        }
    }

    #[test]
    fn constrained_respects_prev_and_max() {
        let conf = DeckConfig::default();
        let mut rng = rand::thread_rng();
        let v = constrained(1.0, &conf, 10, false, &mut rng);
        assert_eq!(v, 11);
        let v = constrained(1_000_000.0, &conf, 0, false, &mut rng);
        assert_eq!(v, conf.rev.max_ivl);
    }

    #[test]
    fn left_today_is_at_least_one() {
        let delays = vec![1.0, 10.0];
        let now = 1_000_000;
        let day_cutoff = now + 10; // cuts off almost immediately
        assert!(left_today(&delays, 2, now, day_cutoff) >= 1);
        let day_cutoff_far = now + 100_000;
        assert!(left_today(&delays, 2, now, day_cutoff_far) >= 1);
    }

    #[test]
    fn delay_for_grade_falls_back_when_index_out_of_range() {
        let delays = vec![1.0, 10.0];
        // left % 1000 == 5 doesn't correspond to a real step; idx goes negative.
        assert_eq!(delay_for_grade(&delays, 1005), 60); // delays[0] * 60
    }

    #[test]
    fn delay_for_grade_empty_delays_is_one_minute() {
        assert_eq!(delay_for_grade(&[], 1), 60);
    }

    #[test]
    fn next_rev_ivl_nondecreasing_in_ease() {
        let conf = DeckConfig::default();
        let mut rng = rand::thread_rng();
        let card = Card {
            ivl: 10,
            factor: 2500,
            due: 100,
            odue: 0,
            odid: 0,
            ..Default::default()
        };
        let ivls = next_rev_ivl(&card, &conf, 100, false, &mut rng);
        assert!(ivls.hard <= ivls.good);
        assert!(ivls.good <= ivls.easy);
    }
}
