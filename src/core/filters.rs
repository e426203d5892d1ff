//! Date-range filters and the exclusivity resolver
//!
//! The dashboard narrows its metrics by exactly one of three time dimensions.
//! `FilterState` holds all three ranges; `apply` is the only way a new range
//! enters the state and it empties the other two on every call.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Wall-clock instant in the operator's local time
pub type Timestamp = NaiveDateTime;

/// Format used by active-filter chips
const CHIP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Optional (from, to) pair. No ordering is enforced between the endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl DateRange {
    pub fn new(from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        Self { from, to }
    }

    pub fn between(from: Timestamp, to: Timestamp) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn is_active(&self) -> bool {
        !self.is_empty()
    }

    /// Text shown on an active-filter chip
    pub fn chip_text(&self) -> String {
        match (self.from, self.to) {
            (Some(from), Some(to)) => format!(
                "{} - {}",
                from.format(CHIP_FORMAT),
                to.format(CHIP_FORMAT)
            ),
            (Some(from), None) => format!("From {}", from.format(CHIP_FORMAT)),
            (None, Some(to)) => format!("Until {}", to.format(CHIP_FORMAT)),
            (None, None) => String::new(),
        }
    }

    /// Text shown on a picker button
    pub fn picker_text(&self) -> String {
        if self.is_empty() {
            return "Select range".to_string();
        }

        let from = self
            .from
            .map(|ts| ts.format("%d/%m").to_string())
            .unwrap_or_else(|| "Start".to_string());
        let to = self
            .to
            .map(|ts| ts.format("%d/%m/%y").to_string())
            .unwrap_or_else(|| "End".to_string());

        format!("{} - {}", from, to)
    }
}

/// One of the three time dimensions a filter can apply to.
///
/// Declaration order is display order and the order cleared keys are listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Visit,
    Created,
    Modified,
}

impl FilterKey {
    pub const ALL: [FilterKey; 3] = [FilterKey::Visit, FilterKey::Created, FilterKey::Modified];

    /// Human label used in pickers, dialogs and notifications
    pub fn label(&self) -> &'static str {
        match self {
            FilterKey::Visit => "Visit Timestamp",
            FilterKey::Created => "Created On",
            FilterKey::Modified => "Modified Date",
        }
    }

    /// Shorter label used on active-filter chips
    pub fn chip_label(&self) -> &'static str {
        match self {
            FilterKey::Visit => "Visit Time",
            FilterKey::Created => "Created On",
            FilterKey::Modified => "Modified Date",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            FilterKey::Visit => "visit",
            FilterKey::Created => "created",
            FilterKey::Modified => "modified",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        FilterKey::ALL
            .into_iter()
            .find(|key| {
                key.slug().eq_ignore_ascii_case(needle)
                    || key.label().eq_ignore_ascii_case(needle)
                    || key.chip_label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("unknown filter '{}' (expected visit, created or modified)", s))
    }
}

/// The three date-range filters.
///
/// At most one field is non-empty once the state has gone through `apply`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub visit: DateRange,
    pub created: DateRange,
    pub modified: DateRange,
}

/// Summary of one populated filter, as published to the KPI area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveFilter {
    pub key: FilterKey,
    pub label: &'static str,
    pub range_text: String,
}

impl FilterState {
    pub fn get(&self, key: FilterKey) -> &DateRange {
        match key {
            FilterKey::Visit => &self.visit,
            FilterKey::Created => &self.created,
            FilterKey::Modified => &self.modified,
        }
    }

    fn get_mut(&mut self, key: FilterKey) -> &mut DateRange {
        match key {
            FilterKey::Visit => &mut self.visit,
            FilterKey::Created => &mut self.created,
            FilterKey::Modified => &mut self.modified,
        }
    }

    pub fn has_active_filters(&self) -> bool {
        FilterKey::ALL.iter().any(|key| self.get(*key).is_active())
    }

    /// Number of non-empty filters
    pub fn active_count(&self) -> usize {
        FilterKey::ALL.iter().filter(|key| self.get(**key).is_active()).count()
    }

    /// The populated filter, if any
    pub fn active_key(&self) -> Option<FilterKey> {
        FilterKey::ALL.into_iter().find(|key| self.get(*key).is_active())
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        FilterKey::ALL
            .into_iter()
            .filter(|key| self.get(*key).is_active())
            .map(|key| ActiveFilter {
                key,
                label: key.chip_label(),
                range_text: self.get(key).chip_text(),
            })
            .collect()
    }
}

/// Result of an exclusivity-resolver step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub next: FilterState,
    /// Non-target keys that held a value in the previous state
    pub cleared: BTreeSet<FilterKey>,
}

/// Set `target` to `range` and empty every other filter.
///
/// `cleared` lists the non-target keys that were populated in `current`,
/// whether or not `range` itself is empty.
pub fn apply(current: &FilterState, target: FilterKey, range: DateRange) -> Resolution {
    let cleared = FilterKey::ALL
        .into_iter()
        .filter(|key| *key != target && current.get(*key).is_active())
        .collect();

    let mut next = FilterState::default();
    *next.get_mut(target) = range;

    Resolution { next, cleared }
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`; a bare date means midnight
pub fn parse_timestamp(input: &str) -> Result<Timestamp, String> {
    let input = input.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM)", input))
}

/// Human labels of `keys` joined with ", "
pub fn join_labels(keys: &BTreeSet<FilterKey>) -> String {
    keys.iter().map(|key| key.label()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn jan(from: u32, to: u32) -> DateRange {
        DateRange::between(ts(2024, 1, from, 0, 0), ts(2024, 1, to, 0, 0))
    }

    #[test]
    fn test_date_range_emptiness() {
        assert!(DateRange::empty().is_empty());
        assert!(DateRange::new(Some(ts(2024, 1, 1, 0, 0)), None).is_active());
        assert!(DateRange::new(None, Some(ts(2024, 1, 1, 0, 0))).is_active());
    }

    #[test]
    fn test_apply_on_empty_state() {
        let range = jan(1, 2);
        let resolution = apply(&FilterState::default(), FilterKey::Visit, range);

        assert_eq!(resolution.next.visit, range);
        assert!(resolution.next.created.is_empty());
        assert!(resolution.next.modified.is_empty());
        assert!(resolution.cleared.is_empty());
    }

    #[test]
    fn test_apply_clears_other_filters() {
        let current = FilterState { created: jan(1, 5), ..Default::default() };
        let resolution = apply(&current, FilterKey::Visit, jan(10, 11));

        assert_eq!(resolution.next.visit, jan(10, 11));
        assert!(resolution.next.created.is_empty());
        assert_eq!(resolution.cleared, BTreeSet::from([FilterKey::Created]));
    }

    #[test]
    fn test_cleared_reported_even_for_empty_range() {
        let current = FilterState { modified: jan(3, 4), ..Default::default() };
        let resolution = apply(&current, FilterKey::Created, DateRange::empty());

        assert!(!resolution.next.has_active_filters());
        assert_eq!(resolution.cleared, BTreeSet::from([FilterKey::Modified]));
    }

    #[test]
    fn test_target_is_never_reported_as_cleared() {
        let current = FilterState { visit: jan(1, 2), ..Default::default() };
        let resolution = apply(&current, FilterKey::Visit, DateRange::empty());

        assert!(resolution.cleared.is_empty());
        assert!(resolution.next.visit.is_empty());
    }

    #[test]
    fn test_reapplication_is_idempotent() {
        let current = FilterState { created: jan(1, 5), ..Default::default() };
        let first = apply(&current, FilterKey::Modified, jan(7, 8));
        let second = apply(&first.next, FilterKey::Modified, jan(7, 8));

        assert_eq!(first.next, second.next);
        assert!(second.cleared.is_empty());
    }

    #[test]
    fn test_exclusivity_over_a_sequence() {
        // States that violate exclusivity can only be built by hand
        let mut state = FilterState {
            visit: jan(1, 2),
            created: jan(3, 4),
            modified: jan(5, 6),
        };
        let steps = [
            (FilterKey::Created, jan(1, 9)),
            (FilterKey::Visit, DateRange::empty()),
            (FilterKey::Modified, DateRange::new(None, Some(ts(2024, 2, 1, 0, 0)))),
            (FilterKey::Modified, jan(2, 3)),
            (FilterKey::Visit, DateRange::new(Some(ts(2024, 3, 1, 0, 0)), None)),
        ];

        let first = apply(&state, FilterKey::Visit, jan(8, 9));
        assert_eq!(first.cleared, BTreeSet::from([FilterKey::Created, FilterKey::Modified]));
        state = first.next;

        for (key, range) in steps {
            let resolution = apply(&state, key, range);
            assert!(resolution.next.active_count() <= 1);
            state = resolution.next;
        }
    }

    #[test]
    fn test_chip_text_formats() {
        let full = DateRange::between(ts(2024, 1, 1, 9, 5), ts(2024, 1, 2, 17, 30));
        assert_eq!(full.chip_text(), "01/01/2024 09:05 - 02/01/2024 17:30");

        let open_end = DateRange::new(Some(ts(2024, 1, 1, 9, 5)), None);
        assert_eq!(open_end.chip_text(), "From 01/01/2024 09:05");

        let open_start = DateRange::new(None, Some(ts(2024, 1, 2, 17, 30)));
        assert_eq!(open_start.chip_text(), "Until 02/01/2024 17:30");

        assert_eq!(DateRange::empty().chip_text(), "");
    }

    #[test]
    fn test_picker_text_formats() {
        assert_eq!(DateRange::empty().picker_text(), "Select range");
        assert_eq!(jan(1, 5).picker_text(), "01/01 - 05/01/24");
        assert_eq!(
            DateRange::new(Some(ts(2024, 1, 1, 0, 0)), None).picker_text(),
            "01/01 - End"
        );
    }

    #[test]
    fn test_active_filters_summary() {
        let state = FilterState { visit: jan(1, 2), ..Default::default() };
        let active = state.active_filters();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].key, FilterKey::Visit);
        assert_eq!(active[0].label, "Visit Time");
        assert_eq!(state.active_key(), Some(FilterKey::Visit));
    }

    #[test]
    fn test_filter_key_parsing() {
        assert_eq!("visit".parse::<FilterKey>(), Ok(FilterKey::Visit));
        assert_eq!("Created On".parse::<FilterKey>(), Ok(FilterKey::Created));
        assert_eq!("MODIFIED".parse::<FilterKey>(), Ok(FilterKey::Modified));
        assert!("deleted".parse::<FilterKey>().is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-05"), Ok(ts(2024, 1, 5, 0, 0)));
        assert_eq!(parse_timestamp(" 2024-01-05 14:30 "), Ok(ts(2024, 1, 5, 14, 30)));
        assert!(parse_timestamp("05/01/2024").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_join_labels_in_display_order() {
        let keys = BTreeSet::from([FilterKey::Modified, FilterKey::Visit]);
        assert_eq!(join_labels(&keys), "Visit Timestamp, Modified Date");
    }
}
