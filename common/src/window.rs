//! Eligibility window computation.
//!
//! A draw for calendar date `d` covers participant activity in a window that
//! always closes at 17:00:00 local time on `d`. The window opens one second
//! past the previous cutoff so that two consecutive windows never share a
//! boundary second:
//!
//! - Monday draws reach back to the previous Friday (the weekend has no
//!   daily draws).
//! - Saturday draws cover the whole week since the previous Saturday.
//! - Every other day covers the previous day's cutoff onwards.
//!
//! The function is pure: the same date and zone always produce the same
//! window.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};

/// Hour of day (local) at which an eligibility window closes.
pub const WINDOW_CUTOFF_HOUR: u32 = 17;

/// The `[start, end]` interval during which activity counts toward a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Compute the eligibility window for a draw date in the given local zone.
pub fn eligibility_window(draw_date: NaiveDate, zone: FixedOffset) -> EligibilityWindow {
    let start_date = match draw_date.weekday() {
        // previous Friday
        Weekday::Mon => draw_date - Duration::days(3),
        // previous Saturday
        Weekday::Sat => draw_date - Duration::days(7),
        Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri | Weekday::Sun => {
            draw_date - Duration::days(1)
        }
    };

    EligibilityWindow {
        start: at_cutoff(start_date, 1, zone),
        end: at_cutoff(draw_date, 0, zone),
    }
}

fn at_cutoff(date: NaiveDate, second: u32, zone: FixedOffset) -> DateTime<FixedOffset> {
    let time = NaiveTime::from_hms_opt(WINDOW_CUTOFF_HOUR, 0, second)
        .expect("cutoff time is a valid time of day");
    date.and_time(time)
        .and_local_timezone(zone)
        .single()
        .expect("fixed offsets have no gaps or overlaps")
}
