//! Due-date projector: per-day counts of upcoming reviews inside a time
//! window, for the month-at-a-glance planning view.

use chrono::{DateTime, NaiveDate, TimeZone};
use std::collections::BTreeMap;

use crate::domain::Card;

/// Count cards whose `next_review` falls within the inclusive window,
/// bucketed by the calendar date of `next_review` in the window's
/// timezone. Purely a grouping operation.
pub fn project_due_counts<Tz: TimeZone>(
  cards: &[Card],
  window_start: DateTime<Tz>,
  window_end: DateTime<Tz>,
) -> BTreeMap<NaiveDate, u32> {
  let tz = window_start.timezone();
  let mut counts = BTreeMap::new();

  for card in cards {
    let due = card.next_review.with_timezone(&tz);
    if due >= window_start && due <= window_end {
      *counts.entry(due.date_naive()).or_insert(0) += 1;
    }
  }
  counts
}

/// Inclusive window covering one calendar month in the given timezone.
/// None for an out-of-range month.
pub fn month_window<Tz: TimeZone>(year: i32, month: u32, tz: &Tz) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let last = first
    .checked_add_months(chrono::Months::new(1))?
    .pred_opt()?;

  let start = tz.from_local_datetime(&first.and_hms_opt(0, 0, 0)?).single()?;
  let end = tz.from_local_datetime(&last.and_hms_opt(23, 59, 59)?).single()?;
  Some((start, end))
}
