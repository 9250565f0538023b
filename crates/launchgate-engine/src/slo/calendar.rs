use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Number of weekdays (Mon–Fri, UTC) after `start`'s date up to and
/// including `end`'s date. Zero when `end` is not after `start`.
pub fn weekdays_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let mut day = start.date_naive();
    let last = end.date_naive();
    let mut count = 0;
    while day < last {
        day += Duration::days(1);
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
    }
    count
}
