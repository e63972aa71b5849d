use crate::domain::snapshot::{Impact, VetoEvent};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// Auto square-off is T-1 at 15:00 IST ahead of a high-impact event.
const SQUARE_OFF_HOUR_IST: u32 = 15;

/// Remaining time to a veto event, decomposed by floor division. A target
/// at or before `now` is a distinct in-progress state, never a negative
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining { days: i64, hours: i64, minutes: i64 },
    InProgress,
}

impl Countdown {
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let diff = target - now;
        if diff <= Duration::zero() {
            return Self::InProgress;
        }

        let total_minutes = diff.num_minutes();
        Self::Remaining {
            days: total_minutes / (24 * 60),
            hours: (total_minutes % (24 * 60)) / 60,
            minutes: total_minutes % 60,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining {
                days,
                hours,
                minutes,
            } => write!(f, "{days}d {hours}h {minutes}m"),
            Self::InProgress => write!(f, "event in progress"),
        }
    }
}

/// Instant a veto event is timed at: midnight UTC of its ISO date.
pub fn event_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// The nearest HIGH-impact event and its countdown.
///
/// Prefers the earliest event on or after `now`'s date; if every HIGH event
/// is already past, reports the most recent one as in-progress. Returns
/// `None` when no HIGH event is scheduled at all.
pub fn next_high_impact(
    events: &[VetoEvent],
    now: DateTime<Utc>,
) -> Option<(&VetoEvent, Countdown)> {
    let today = now.date_naive();
    let high = || events.iter().filter(|e| e.impact == Impact::High);

    let event = high()
        .filter(|e| e.date >= today)
        .min_by_key(|e| e.date)
        .or_else(|| high().max_by_key(|e| e.date))?;

    Some((event, Countdown::until(event_instant(event.date), now)))
}

/// Deadline for closing positions ahead of an event: T-1 @ 15:00 IST,
/// expressed in UTC.
pub fn square_off_deadline(event_date: NaiveDate) -> Option<DateTime<Utc>> {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)?;
    let naive = (event_date - Duration::days(1)).and_hms_opt(SQUARE_OFF_HOUR_IST, 0, 0)?;
    let local = ist.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(name: &str, date: NaiveDate, impact: Impact) -> VetoEvent {
        VetoEvent {
            event: name.to_string(),
            date,
            impact,
        }
    }

    #[test]
    fn countdown_uses_floor_division() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        // T + 26h30m
        let target = now + Duration::hours(26) + Duration::minutes(30);
        assert_eq!(
            Countdown::until(target, now),
            Countdown::Remaining {
                days: 1,
                hours: 2,
                minutes: 30
            }
        );
    }

    #[test]
    fn countdown_floors_partial_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        let target = now + Duration::minutes(90) + Duration::seconds(59);
        assert_eq!(
            Countdown::until(target, now),
            Countdown::Remaining {
                days: 0,
                hours: 1,
                minutes: 30
            }
        );
    }

    #[test]
    fn past_target_is_in_progress_not_negative() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        assert_eq!(
            Countdown::until(now - Duration::seconds(1), now),
            Countdown::InProgress
        );
        assert_eq!(Countdown::until(now, now), Countdown::InProgress);
    }

    #[test]
    fn countdown_display_formats() {
        let c = Countdown::Remaining {
            days: 1,
            hours: 2,
            minutes: 30,
        };
        assert_eq!(c.to_string(), "1d 2h 30m");
        assert_eq!(Countdown::InProgress.to_string(), "event in progress");
    }

    #[test]
    fn picks_the_earliest_upcoming_high_event() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        let events = vec![
            event(
                "US CPI",
                NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
                Impact::Medium,
            ),
            event(
                "RBI MPC",
                NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
                Impact::High,
            ),
            event(
                "Budget Session",
                NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
                Impact::High,
            ),
        ];

        let (e, c) = next_high_impact(&events, now).unwrap();
        assert_eq!(e.event, "RBI MPC");
        // 2026-02-08T00:00Z - 2026-02-05T12:00Z = 2d 12h.
        assert_eq!(
            c,
            Countdown::Remaining {
                days: 2,
                hours: 12,
                minutes: 0
            }
        );
    }

    #[test]
    fn all_past_high_events_report_in_progress() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        let events = vec![event(
            "Fed Minutes",
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            Impact::High,
        )];
        let (_, c) = next_high_impact(&events, now).unwrap();
        assert_eq!(c, Countdown::InProgress);
    }

    #[test]
    fn no_high_events_means_no_countdown() {
        let now = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        let events = vec![event(
            "US CPI",
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            Impact::Low,
        )];
        assert!(next_high_impact(&events, now).is_none());
    }

    #[test]
    fn square_off_is_t_minus_one_1500_ist() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        let deadline = square_off_deadline(d).unwrap();
        // 2026-02-07 15:00 IST = 09:30 UTC.
        assert_eq!(deadline.to_rfc3339(), "2026-02-07T09:30:00+00:00");
    }
}
