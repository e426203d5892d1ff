//! Quick date presets
//!
//! Each preset is a pure function of the instant it is resolved against.
//! Callers sample "now" once per activation and pass it in.

use std::fmt;
use std::str::FromStr;
use chrono::{Duration, Months, NaiveTime};
use serde::{Deserialize, Serialize};

use super::filters::{DateRange, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    Today,
    Yesterday,
    LastHour,
    LastFourHours,
    LastDay,
    LastThreeDays,
    LastWeek,
    LastMonth,
}

impl Preset {
    /// Catalog in display order
    pub const ALL: [Preset; 8] = [
        Preset::Today,
        Preset::Yesterday,
        Preset::LastHour,
        Preset::LastFourHours,
        Preset::LastDay,
        Preset::LastThreeDays,
        Preset::LastWeek,
        Preset::LastMonth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Preset::Today => "Today",
            Preset::Yesterday => "Yesterday",
            Preset::LastHour => "Last 1 Hour",
            Preset::LastFourHours => "Last 4 Hours",
            Preset::LastDay => "Last 1 Day",
            Preset::LastThreeDays => "Last 3 Days",
            Preset::LastWeek => "Last 1 Week",
            Preset::LastMonth => "Last 1 Month",
        }
    }

    /// Kebab-case form of the label, used on the command line
    pub fn slug(&self) -> String {
        self.label().to_ascii_lowercase().replace(' ', "-")
    }

    pub fn resolve(&self, now: Timestamp) -> DateRange {
        match self {
            Preset::Today => DateRange::between(start_of_day(now), end_of_day(now)),
            Preset::Yesterday => {
                let yesterday = now - Duration::days(1);
                DateRange::between(start_of_day(yesterday), end_of_day(yesterday))
            }
            Preset::LastHour => DateRange::between(now - Duration::hours(1), now),
            Preset::LastFourHours => DateRange::between(now - Duration::hours(4), now),
            Preset::LastDay => DateRange::between(now - Duration::days(1), now),
            Preset::LastThreeDays => DateRange::between(now - Duration::days(3), now),
            Preset::LastWeek => DateRange::between(now - Duration::weeks(1), now),
            // Calendar month; the day is clamped to the end of a shorter month
            Preset::LastMonth => {
                let from = now.checked_sub_months(Months::new(1)).unwrap_or(now);
                DateRange::between(from, now)
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Preset::ALL
            .into_iter()
            .find(|preset| {
                preset.label().eq_ignore_ascii_case(needle) || preset.slug().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                let known: Vec<String> = Preset::ALL.iter().map(|p| p.slug()).collect();
                format!("unknown preset '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

fn start_of_day(ts: Timestamp) -> Timestamp {
    ts.date().and_time(NaiveTime::MIN)
}

fn end_of_day(ts: Timestamp) -> Timestamp {
    // 23:59:59.999 is always a valid time
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    ts.date().and_time(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_catalog_order_and_labels() {
        let labels: Vec<&str> = Preset::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Today",
                "Yesterday",
                "Last 1 Hour",
                "Last 4 Hours",
                "Last 1 Day",
                "Last 3 Days",
                "Last 1 Week",
                "Last 1 Month",
            ]
        );
    }

    #[test]
    fn test_today_spans_whole_day() {
        let now = at(2024, 5, 14, 15, 42);
        let range = Preset::Today.resolve(now);

        assert_eq!(range.from, Some(at(2024, 5, 14, 0, 0)));
        let to = range.to.unwrap();
        assert_eq!(to.date(), now.date());
        assert_eq!(to.time(), NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap());
    }

    #[test]
    fn test_yesterday_crosses_month_boundary() {
        let range = Preset::Yesterday.resolve(at(2024, 3, 1, 8, 0));

        assert_eq!(range.from, Some(at(2024, 2, 29, 0, 0)));
        assert_eq!(range.to.unwrap().date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_relative_presets_end_at_now() {
        let now = at(2024, 5, 14, 15, 42);

        assert_eq!(Preset::LastHour.resolve(now), DateRange::between(at(2024, 5, 14, 14, 42), now));
        assert_eq!(Preset::LastFourHours.resolve(now), DateRange::between(at(2024, 5, 14, 11, 42), now));
        assert_eq!(Preset::LastDay.resolve(now), DateRange::between(at(2024, 5, 13, 15, 42), now));
        assert_eq!(Preset::LastThreeDays.resolve(now), DateRange::between(at(2024, 5, 11, 15, 42), now));
        assert_eq!(Preset::LastWeek.resolve(now), DateRange::between(at(2024, 5, 7, 15, 42), now));
    }

    #[test]
    fn test_last_month_uses_calendar_months() {
        let now = at(2024, 3, 31, 10, 0);
        let range = Preset::LastMonth.resolve(now);

        // Clamped to the last day of February, not 30 days back
        assert_eq!(range.from, Some(at(2024, 2, 29, 10, 0)));
        assert_eq!(range.to, Some(now));

        let mid = Preset::LastMonth.resolve(at(2024, 7, 15, 9, 30));
        assert_eq!(mid.from, Some(at(2024, 6, 15, 9, 30)));
    }

    #[test]
    fn test_resolve_is_deterministic_for_same_now() {
        let now = at(2024, 5, 14, 15, 42);
        for preset in Preset::ALL {
            assert_eq!(preset.resolve(now), preset.resolve(now));
        }
    }

    #[test]
    fn test_resolve_tracks_now() {
        let monday = Preset::Today.resolve(at(2024, 5, 13, 12, 0));
        let tuesday = Preset::Today.resolve(at(2024, 5, 14, 12, 0));
        assert_ne!(monday, tuesday);
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Today".parse::<Preset>(), Ok(Preset::Today));
        assert_eq!("last-4-hours".parse::<Preset>(), Ok(Preset::LastFourHours));
        assert_eq!("last 1 month".parse::<Preset>(), Ok(Preset::LastMonth));
        assert!("next week".parse::<Preset>().is_err());
    }
}
