//! Billing-cycle window math.
//!
//! The monthly reset window is anchored to the workspace's
//! `billing_cycle_anchor`: the current window starts at the most recent
//! monthly anniversary of the anchor that is not after `now`. Anchors on
//! the 29th-31st clamp to the last day of shorter months.

use time::util::days_in_year_month;
use time::{Date, Month, OffsetDateTime, Time, UtcOffset};

/// Add (or subtract) whole months to a date, clamping the day of month.
fn add_months(date: Date, months: i64) -> Date {
    let total = date.year() as i64 * 12 + (date.month() as i64 - 1) + months;
    let year = total.div_euclid(12) as i32;
    let month = Month::try_from((total.rem_euclid(12) + 1) as u8).expect("month in 1..=12");
    let day = date.day().min(days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).expect("clamped day is valid")
}

fn anniversary(anchor: OffsetDateTime, months: i64) -> OffsetDateTime {
    OffsetDateTime::new_utc(add_months(anchor.date(), months), anchor.time())
}

/// Number of whole billing cycles elapsed between the anchor and `now`
/// (zero within the first cycle, or when `now` precedes the anchor).
pub fn cycles_elapsed(anchor: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let anchor = anchor.to_offset(UtcOffset::UTC);
    let now = now.to_offset(UtcOffset::UTC);
    if now <= anchor {
        return 0;
    }

    // First guess from calendar months, then correct for day/time-of-day.
    let mut k = (now.year() as i64 * 12 + now.month() as i64)
        - (anchor.year() as i64 * 12 + anchor.month() as i64)
        + 1;
    while k > 0 && anniversary(anchor, k) > now {
        k -= 1;
    }
    k
}

/// Start of the billing cycle containing `now`. For `now` before the
/// anchor this is the anchor itself (the first cycle has not begun).
pub fn cycle_start(anchor: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    let anchor = anchor.to_offset(UtcOffset::UTC);
    anniversary(anchor, cycles_elapsed(anchor, now))
}

/// Start of the billing cycle immediately before the current one.
pub fn previous_cycle_start(anchor: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    let anchor = anchor.to_offset(UtcOffset::UTC);
    let k = cycles_elapsed(anchor, now);
    anniversary(anchor, (k - 1).max(0))
}

/// Calendar-month fallback window for workspaces with no package anchor
/// (boost-only workspaces).
pub fn calendar_month_start(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(UtcOffset::UTC);
    let first = Date::from_calendar_date(now.year(), now.month(), 1).expect("day 1 is valid");
    OffsetDateTime::new_utc(first, Time::MIDNIGHT)
}
