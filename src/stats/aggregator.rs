//! Statistics aggregator: rolls the full review history up into streaks,
//! mastery counts, velocity, and time-bucketed series.
//!
//! Pure function of the event/card/deck collections plus "now". Calendar
//! bucketing happens in the timezone of the `now` value the caller hands
//! in, so handlers pass `Local` and tests pass fixed `Utc` instants.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{DAILY_ACTIVITY_DAYS, MASTERY_MIN_REVIEWS, MASTERY_MIN_SUCCESSES, MIN_WEEKLY_BUCKETS};
use crate::domain::{Card, Deck, Difficulty, ReviewEvent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayActivity {
  pub date: NaiveDate,
  pub reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceBucket {
  /// ISO week start for weekly buckets, the day itself for daily buckets.
  pub start: NaiveDate,
  pub success_rate: u32,
  pub reviews: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
  Weekly,
  Daily,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DifficultyDistribution {
  pub again: u32,
  pub hard: u32,
  pub good: u32,
  pub easy: u32,
}

impl DifficultyDistribution {
  fn bump(&mut self, difficulty: Difficulty) {
    match difficulty {
      Difficulty::Again => self.again += 1,
      Difficulty::Hard => self.hard += 1,
      Difficulty::Good => self.good += 1,
      Difficulty::Easy => self.easy += 1,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckPerformance {
  pub deck_id: i64,
  pub name: String,
  pub success_rate: u32,
  pub reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
  pub total_reviews: u32,
  /// Integer percentage, Good/Easy counted as successful.
  pub success_rate: u32,
  pub reviews_today: u32,
  pub mastered_cards: u32,
  /// Reviews per day since the first event, one decimal.
  pub learning_velocity: f64,
  pub current_streak: u32,
  pub longest_streak: u32,
  pub daily_activity: Vec<DayActivity>,
  pub performance_granularity: Granularity,
  pub performance: Vec<PerformanceBucket>,
  pub difficulty_distribution: DifficultyDistribution,
  /// Decks with at least one event, best success rate first.
  pub deck_performance: Vec<DeckPerformance>,
}

/// Legacy data shapes carry reviewed cards but no events. Synthesize one
/// placeholder event per such card so old progress stays visible.
pub fn backfill_events(cards: &[Card]) -> Vec<ReviewEvent> {
  cards
    .iter()
    .filter_map(|card| {
      card.last_reviewed.map(|rated_at| {
        ReviewEvent::new(
          card.id,
          String::new(),
          card.difficulty.unwrap_or(Difficulty::Good),
          rated_at,
        )
      })
    })
    .collect()
}

fn pct(successful: usize, total: usize) -> u32 {
  if total == 0 {
    0
  } else {
    ((successful as f64 / total as f64) * 100.0).round() as u32
  }
}

fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
  // If today has no event yet, yesterday still anchors the streak.
  let anchor = if days.contains(&today) {
    today
  } else if days.contains(&(today - Duration::days(1))) {
    today - Duration::days(1)
  } else {
    return 0;
  };

  let mut streak = 0;
  let mut day = anchor;
  while days.contains(&day) {
    streak += 1;
    day = day - Duration::days(1);
  }
  streak
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
  let mut longest = 0u32;
  let mut run = 0u32;
  let mut prev: Option<NaiveDate> = None;

  for &day in days {
    run = match prev {
      Some(p) if day - p == Duration::days(1) => run + 1,
      _ => 1,
    };
    longest = longest.max(run);
    prev = Some(day);
  }
  longest
}

pub fn compute_statistics<Tz: TimeZone>(
  events: &[ReviewEvent],
  cards: &[Card],
  decks: &[Deck],
  now: DateTime<Tz>,
) -> StatisticsSnapshot {
  let tz = now.timezone();
  let now_utc = now.with_timezone(&Utc);
  let today = now_utc.with_timezone(&tz).date_naive();

  let synthesized;
  let events: &[ReviewEvent] = if events.is_empty() {
    synthesized = backfill_events(cards);
    &synthesized
  } else {
    events
  };

  let local_day = |t: DateTime<Utc>| t.with_timezone(&tz).date_naive();

  let total = events.len();
  let successful = events.iter().filter(|e| e.is_successful()).count();

  // Distinct local calendar days with at least one event
  let event_days: BTreeSet<NaiveDate> = events.iter().map(|e| local_day(e.rated_at)).collect();

  let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
  let mut distribution = DifficultyDistribution::default();
  let mut per_card: HashMap<i64, (usize, usize)> = HashMap::new();
  for event in events {
    *per_day.entry(local_day(event.rated_at)).or_default() += 1;
    distribution.bump(event.difficulty);
    let entry = per_card.entry(event.card_id).or_default();
    entry.0 += 1;
    if event.is_successful() {
      entry.1 += 1;
    }
  }

  let reviews_today = per_day.get(&today).copied().unwrap_or(0);

  let mastered_cards = cards
    .iter()
    .filter(|card| {
      per_card
        .get(&card.id)
        .is_some_and(|&(t, s)| t >= MASTERY_MIN_REVIEWS && s >= MASTERY_MIN_SUCCESSES)
    })
    .count() as u32;

  let learning_velocity = events
    .iter()
    .map(|e| e.rated_at)
    .min()
    .map(|first| {
      let days = (now_utc - first).num_days().max(1);
      (total as f64 / days as f64 * 10.0).round() / 10.0
    })
    .unwrap_or(0.0);

  let daily_activity = (0..DAILY_ACTIVITY_DAYS)
    .rev()
    .map(|offset| {
      let date = today - Duration::days(offset);
      DayActivity { date, reviews: per_day.get(&date).copied().unwrap_or(0) }
    })
    .collect();

  // Weekly success-rate buckets; with a short history weekly bucketing is
  // too coarse, so degrade to daily buckets.
  let mut weekly: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
  for event in events {
    let entry = weekly.entry(week_start(local_day(event.rated_at))).or_default();
    entry.0 += 1;
    if event.is_successful() {
      entry.1 += 1;
    }
  }
  let (performance_granularity, buckets) = if weekly.len() >= MIN_WEEKLY_BUCKETS {
    (Granularity::Weekly, weekly)
  } else {
    let mut daily: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for event in events {
      let entry = daily.entry(local_day(event.rated_at)).or_default();
      entry.0 += 1;
      if event.is_successful() {
        entry.1 += 1;
      }
    }
    (Granularity::Daily, daily)
  };
  let performance = buckets
    .into_iter()
    .map(|(start, (t, s))| PerformanceBucket { start, success_rate: pct(s, t), reviews: t as u32 })
    .collect();

  let deck_of_card: HashMap<i64, i64> = cards.iter().map(|c| (c.id, c.deck_id)).collect();
  let mut per_deck: HashMap<i64, (usize, usize)> = HashMap::new();
  for event in events {
    if let Some(&deck_id) = deck_of_card.get(&event.card_id) {
      let entry = per_deck.entry(deck_id).or_default();
      entry.0 += 1;
      if event.is_successful() {
        entry.1 += 1;
      }
    }
  }
  let mut deck_performance: Vec<DeckPerformance> = decks
    .iter()
    .filter_map(|deck| {
      per_deck.get(&deck.id).map(|&(t, s)| DeckPerformance {
        deck_id: deck.id,
        name: deck.name.clone(),
        success_rate: pct(s, t),
        reviews: t as u32,
      })
    })
    .collect();
  deck_performance.sort_by(|a, b| {
    b.success_rate
      .cmp(&a.success_rate)
      .then(b.reviews.cmp(&a.reviews))
      .then(a.name.cmp(&b.name))
  });

  StatisticsSnapshot {
    total_reviews: total as u32,
    success_rate: pct(successful, total),
    reviews_today,
    mastered_cards,
    learning_velocity,
    current_streak: current_streak(&event_days, today),
    longest_streak: longest_streak(&event_days),
    daily_activity,
    performance_granularity,
    performance,
    difficulty_distribution: distribution,
    deck_performance,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  fn event(card_id: i64, difficulty: Difficulty, rated_at: &str) -> ReviewEvent {
    ReviewEvent::new(card_id, "tester".into(), difficulty, at(rated_at))
  }

  fn card(id: i64, deck_id: i64) -> Card {
    let mut c = Card::new(deck_id, format!("f{}", id), "b".into(), vec![], at("2024-01-01T00:00:00Z"));
    c.id = id;
    c
  }

  fn deck(id: i64, name: &str) -> Deck {
    Deck {
      id,
      owner: "tester".into(),
      name: name.into(),
      description: String::new(),
      card_count: 0,
      last_reviewed: None,
    }
  }

  #[test]
  fn test_empty_inputs() {
    let snap = compute_statistics(&[], &[], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.total_reviews, 0);
    assert_eq!(snap.success_rate, 0);
    assert_eq!(snap.reviews_today, 0);
    assert_eq!(snap.mastered_cards, 0);
    assert_eq!(snap.learning_velocity, 0.0);
    assert_eq!(snap.current_streak, 0);
    assert_eq!(snap.longest_streak, 0);
    assert_eq!(snap.daily_activity.len(), 7);
    assert!(snap.daily_activity.iter().all(|d| d.reviews == 0));
    assert!(snap.performance.is_empty());
    assert!(snap.deck_performance.is_empty());
  }

  #[test]
  fn test_success_rate_rounded() {
    // [Again, Hard, Good, Easy] -> 2 of 4 successful -> 50
    let events = vec![
      event(1, Difficulty::Again, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Hard, "2024-01-01T11:00:00Z"),
      event(1, Difficulty::Good, "2024-01-01T12:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-01T13:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-01T14:00:00Z"));
    assert_eq!(snap.success_rate, 50);

    // 1 of 3 -> 33.3 -> rounds to 33; 2 of 3 -> 66.7 -> rounds to 67
    let one_of_three = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Again, "2024-01-01T11:00:00Z"),
      event(1, Difficulty::Again, "2024-01-01T12:00:00Z"),
    ];
    let snap = compute_statistics(&one_of_three, &[card(1, 1)], &[], at("2024-01-01T14:00:00Z"));
    assert_eq!(snap.success_rate, 33);

    let two_of_three = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-01T11:00:00Z"),
      event(1, Difficulty::Again, "2024-01-01T12:00:00Z"),
    ];
    let snap = compute_statistics(&two_of_three, &[card(1, 1)], &[], at("2024-01-01T14:00:00Z"));
    assert_eq!(snap.success_rate, 67);
  }

  #[test]
  fn test_reviews_today_counts_current_day_only() {
    let events = vec![
      event(1, Difficulty::Good, "2024-01-02T23:00:00Z"),
      event(1, Difficulty::Good, "2024-01-03T08:00:00Z"),
      event(1, Difficulty::Hard, "2024-01-03T09:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.reviews_today, 2);
  }

  #[test]
  fn test_current_streak_consecutive_days() {
    let events = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-02T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-03T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.current_streak, 3);
    assert_eq!(snap.longest_streak, 3);
  }

  #[test]
  fn test_streak_gap_resets() {
    // Events on 01-01 and 01-03 only: the gap at 01-02 isolates both days
    let events = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-03T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.current_streak, 1);
    assert_eq!(snap.longest_streak, 1);
  }

  #[test]
  fn test_streak_yesterday_anchor() {
    // Nothing today yet; yesterday + the day before still count
    let events = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-02T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.current_streak, 2);
  }

  #[test]
  fn test_streak_broken_before_yesterday() {
    let events = vec![event(1, Difficulty::Good, "2024-01-01T10:00:00Z")];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.current_streak, 0);
    assert_eq!(snap.longest_streak, 1);
  }

  #[test]
  fn test_mastery_thresholds() {
    // Card 1: 3 events, 2 successful -> mastered
    // Card 2: 3 events, 1 successful -> not mastered
    // Card 3: 2 events, 2 successful -> not mastered (too few)
    let events = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-02T10:00:00Z"),
      event(1, Difficulty::Again, "2024-01-03T10:00:00Z"),
      event(2, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(2, Difficulty::Again, "2024-01-02T10:00:00Z"),
      event(2, Difficulty::Hard, "2024-01-03T10:00:00Z"),
      event(3, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(3, Difficulty::Good, "2024-01-02T10:00:00Z"),
    ];
    let cards = vec![card(1, 1), card(2, 1), card(3, 1)];
    let snap = compute_statistics(&events, &cards, &[], at("2024-01-03T12:00:00Z"));
    assert_eq!(snap.mastered_cards, 1);
  }

  #[test]
  fn test_learning_velocity() {
    // 10 events over 4 full days -> 2.5/day
    let mut events = Vec::new();
    for i in 0..10 {
      events.push(event(1, Difficulty::Good, &format!("2024-01-0{}T10:00:00Z", 1 + i % 4)));
    }
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-05T10:00:00Z"));
    assert_eq!(snap.learning_velocity, 2.5);
  }

  #[test]
  fn test_learning_velocity_clamps_first_day() {
    // Three events an hour after the first: elapsed days floor to 0, clamped to 1
    let events = vec![
      event(1, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-01T10:20:00Z"),
      event(1, Difficulty::Good, "2024-01-01T10:40:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-01T11:00:00Z"));
    assert_eq!(snap.learning_velocity, 3.0);
  }

  #[test]
  fn test_daily_activity_last_seven_days() {
    let events = vec![
      event(1, Difficulty::Good, "2024-01-07T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-07T11:00:00Z"),
      event(1, Difficulty::Good, "2024-01-05T10:00:00Z"),
      // Outside the window
      event(1, Difficulty::Good, "2023-12-25T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-07T12:00:00Z"));
    assert_eq!(snap.daily_activity.len(), 7);
    assert_eq!(snap.daily_activity[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(snap.daily_activity[6].date, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
    assert_eq!(snap.daily_activity[6].reviews, 2);
    assert_eq!(snap.daily_activity[4].reviews, 1);
    assert_eq!(snap.daily_activity[0].reviews, 0);
  }

  #[test]
  fn test_performance_weekly_buckets() {
    // Three ISO weeks (Mondays 01-01, 01-08, 01-15 in 2024)
    let events = vec![
      event(1, Difficulty::Good, "2024-01-02T10:00:00Z"),
      event(1, Difficulty::Again, "2024-01-03T10:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-09T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-16T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-17T12:00:00Z"));
    assert_eq!(snap.performance_granularity, Granularity::Weekly);
    assert_eq!(snap.performance.len(), 3);
    assert_eq!(snap.performance[0].start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(snap.performance[0].success_rate, 50);
    assert_eq!(snap.performance[1].start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    assert_eq!(snap.performance[1].success_rate, 100);
  }

  #[test]
  fn test_performance_degrades_to_daily_for_short_history() {
    // Two weeks of history only -> daily buckets
    let events = vec![
      event(1, Difficulty::Good, "2024-01-02T10:00:00Z"),
      event(1, Difficulty::Again, "2024-01-03T10:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-09T10:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-10T12:00:00Z"));
    assert_eq!(snap.performance_granularity, Granularity::Daily);
    assert_eq!(snap.performance.len(), 3);
    assert_eq!(snap.performance[0].start, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
  }

  #[test]
  fn test_difficulty_distribution() {
    let events = vec![
      event(1, Difficulty::Again, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-01T11:00:00Z"),
      event(1, Difficulty::Good, "2024-01-01T12:00:00Z"),
      event(1, Difficulty::Easy, "2024-01-01T13:00:00Z"),
    ];
    let snap = compute_statistics(&events, &[card(1, 1)], &[], at("2024-01-01T14:00:00Z"));
    let dist = snap.difficulty_distribution;
    assert_eq!((dist.again, dist.hard, dist.good, dist.easy), (1, 0, 2, 1));
  }

  #[test]
  fn test_deck_performance_ranking() {
    let decks = vec![deck(1, "geo"), deck(2, "chem"), deck(3, "idle")];
    let cards = vec![card(1, 1), card(2, 2)];
    let events = vec![
      event(1, Difficulty::Again, "2024-01-01T10:00:00Z"),
      event(1, Difficulty::Good, "2024-01-01T11:00:00Z"),
      event(2, Difficulty::Good, "2024-01-01T10:00:00Z"),
      event(2, Difficulty::Easy, "2024-01-01T11:00:00Z"),
    ];
    let snap = compute_statistics(&events, &cards, &decks, at("2024-01-01T14:00:00Z"));

    // Deck 3 has no events and is excluded; chem (100%) ranks above geo (50%)
    assert_eq!(snap.deck_performance.len(), 2);
    assert_eq!(snap.deck_performance[0].name, "chem");
    assert_eq!(snap.deck_performance[0].success_rate, 100);
    assert_eq!(snap.deck_performance[1].name, "geo");
    assert_eq!(snap.deck_performance[1].success_rate, 50);
  }

  #[test]
  fn test_backfill_synthesizes_from_reviewed_cards() {
    // No events, but one card carries legacy review state
    let mut legacy = card(1, 1);
    legacy.apply_review(Difficulty::Hard, at("2024-01-10T00:00:00Z"), at("2024-01-02T10:00:00Z"));
    let fresh = card(2, 1);

    let snap = compute_statistics(&[], &[legacy, fresh], &[deck(1, "geo")], at("2024-01-02T12:00:00Z"));
    assert_eq!(snap.total_reviews, 1);
    assert_eq!(snap.reviews_today, 1);
    // Hard is not successful
    assert_eq!(snap.success_rate, 0);
    assert_eq!(snap.deck_performance.len(), 1);
  }

  #[test]
  fn test_backfill_defaults_to_good() {
    let mut legacy = card(1, 1);
    legacy.last_reviewed = Some(at("2024-01-02T10:00:00Z"));
    legacy.review_count = 1;

    let events = backfill_events(&[legacy]);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].difficulty, Difficulty::Good);
  }

  #[test]
  fn test_backfill_ignored_when_events_exist() {
    let mut legacy = card(1, 1);
    legacy.apply_review(Difficulty::Good, at("2024-01-10T00:00:00Z"), at("2024-01-02T10:00:00Z"));
    let events = vec![event(1, Difficulty::Easy, "2024-01-02T11:00:00Z")];

    let snap = compute_statistics(&events, &[legacy], &[], at("2024-01-02T12:00:00Z"));
    assert_eq!(snap.total_reviews, 1);
    assert_eq!(snap.success_rate, 100);
  }

  #[test]
  fn test_local_timezone_bucketing() {
    use chrono::FixedOffset;
    // 23:30 UTC on Jan 2 is already Jan 3 at UTC+2
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let events = vec![event(1, Difficulty::Good, "2024-01-02T23:30:00Z")];
    let now = at("2024-01-03T06:00:00Z").with_timezone(&tz);

    let snap = compute_statistics(&events, &[card(1, 1)], &[], now);
    assert_eq!(snap.reviews_today, 1);
    assert_eq!(snap.current_streak, 1);
  }
}
