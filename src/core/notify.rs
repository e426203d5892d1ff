//! Operator notifications
//!
//! `describe` turns the outcome of a filter transition into a toast message.
//! Delivery goes through the `Notifier` trait and is fire-and-forget.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use serde::Serialize;

use super::filters::{join_labels, FilterKey};

/// What a filter notification announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    /// Other populated filters were displaced
    Replaced,
    /// A preset landed on a filter without displacing anything
    Applied,
}

/// Where a newly applied range came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySource<'a> {
    /// The filter's own range picker
    Direct,
    /// A quick preset, by label
    Preset(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub title: String,
    pub body: String,
}

impl Message {
    pub fn into_toast(self, duration: Duration) -> Toast {
        Toast {
            title: self.title,
            body: self.body,
            duration,
        }
    }
}

/// Derive the notification for a filter transition.
///
/// Nothing is announced when the applied range is empty. Direct edits only
/// announce displacement; preset applications always announce something.
pub fn describe(
    cleared: &BTreeSet<FilterKey>,
    target: FilterKey,
    source: ApplySource<'_>,
    range_is_empty: bool,
) -> Option<Message> {
    if range_is_empty {
        return None;
    }

    if !cleared.is_empty() {
        let plural = if cleared.len() > 1 { "s" } else { "" };
        let applied = match source {
            ApplySource::Direct => format!("applied new {} filter", target.label()),
            ApplySource::Preset(label) => format!("applied {} to {}", label, target.label()),
        };

        return Some(Message {
            kind: MessageKind::Replaced,
            title: "Filter Replaced".to_string(),
            body: format!("Removed {} filter{} and {}.", join_labels(cleared), plural, applied),
        });
    }

    match source {
        ApplySource::Direct => None,
        ApplySource::Preset(label) => Some(Message {
            kind: MessageKind::Applied,
            title: "Filter Applied".to_string(),
            body: format!("Applied {} to {}.", label, target.label()),
        }),
    }
}

/// A toast as handed to the notification collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub body: String,
    pub duration: Duration,
}

impl Toast {
    pub fn new(title: impl Into<String>, body: impl Into<String>, duration: Duration) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            duration,
        }
    }
}

/// Receives toasts. Implementations must return quickly and never fail.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log, for headless runs
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        tracing::info!(title = %toast.title, "{}", toast.body);
    }
}

#[derive(Debug, Clone)]
struct ActiveToast {
    toast: Toast,
    shown_at: Instant,
}

/// Shared queue of visible toasts. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct ToastBoard {
    inner: Arc<Mutex<VecDeque<ActiveToast>>>,
    max_visible: usize,
}

impl ToastBoard {
    pub fn new(max_visible: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            max_visible: max_visible.max(1),
        }
    }

    /// Toasts that have not expired yet, newest first
    pub fn visible(&self) -> Vec<Toast> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&self, now: Instant) -> Vec<Toast> {
        let mut queue = match self.inner.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.retain(|active| now.duration_since(active.shown_at) < active.toast.duration);
        queue.iter().map(|active| active.toast.clone()).collect()
    }

    /// Every toast still held, expired or not, newest first
    pub fn history(&self) -> Vec<Toast> {
        let queue = match self.inner.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.iter().map(|active| active.toast.clone()).collect()
    }

    pub fn clear(&self) {
        let mut queue = match self.inner.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.clear();
    }
}

impl Default for ToastBoard {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Notifier for ToastBoard {
    fn notify(&self, toast: Toast) {
        tracing::debug!(title = %toast.title, "toast: {}", toast.body);

        let mut queue = match self.inner.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.push_front(ActiveToast {
            toast,
            shown_at: Instant::now(),
        });
        queue.truncate(self.max_visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_message_for_empty_range() {
        let cleared = BTreeSet::from([FilterKey::Created]);
        assert!(describe(&cleared, FilterKey::Visit, ApplySource::Direct, true).is_none());
        assert!(describe(&cleared, FilterKey::Visit, ApplySource::Preset("Today"), true).is_none());
    }

    #[test]
    fn test_direct_edit_without_displacement_is_silent() {
        let message = describe(&BTreeSet::new(), FilterKey::Visit, ApplySource::Direct, false);
        assert!(message.is_none());
    }

    #[test]
    fn test_direct_edit_replacing_one_filter() {
        let cleared = BTreeSet::from([FilterKey::Created]);
        let message = describe(&cleared, FilterKey::Visit, ApplySource::Direct, false).unwrap();

        assert_eq!(message.kind, MessageKind::Replaced);
        assert_eq!(message.title, "Filter Replaced");
        assert_eq!(
            message.body,
            "Removed Created On filter and applied new Visit Timestamp filter."
        );
    }

    #[test]
    fn test_preset_replacing_two_filters_pluralizes() {
        let cleared = BTreeSet::from([FilterKey::Modified, FilterKey::Visit]);
        let message =
            describe(&cleared, FilterKey::Created, ApplySource::Preset("Last 1 Week"), false).unwrap();

        assert_eq!(message.kind, MessageKind::Replaced);
        assert_eq!(
            message.body,
            "Removed Visit Timestamp, Modified Date filters and applied Last 1 Week to Created On."
        );
    }

    #[test]
    fn test_preset_without_displacement_is_applied() {
        let message =
            describe(&BTreeSet::new(), FilterKey::Modified, ApplySource::Preset("Today"), false).unwrap();

        assert_eq!(message.kind, MessageKind::Applied);
        assert_eq!(message.title, "Filter Applied");
        assert_eq!(message.body, "Applied Today to Modified Date.");
    }

    #[test]
    fn test_toast_board_keeps_newest_first_and_caps() {
        let board = ToastBoard::new(2);
        for n in 0..3 {
            board.notify(Toast::new(format!("t{}", n), "body", Duration::from_secs(60)));
        }

        let titles: Vec<String> = board.visible().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["t2".to_string(), "t1".to_string()]);
    }

    #[test]
    fn test_toast_board_expires_toasts() {
        let board = ToastBoard::new(3);
        board.notify(Toast::new("short", "body", Duration::from_millis(10)));
        board.notify(Toast::new("long", "body", Duration::from_secs(60)));

        let later = Instant::now() + Duration::from_secs(1);
        let titles: Vec<String> = board.visible_at(later).into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["long".to_string()]);
    }

    #[test]
    fn test_toast_board_clones_share_queue() {
        let board = ToastBoard::default();
        let handle = board.clone();
        handle.notify(Toast::new("shared", "body", Duration::from_secs(5)));

        assert_eq!(board.history().len(), 1);
        board.clear();
        assert!(handle.history().is_empty());
    }

    #[test]
    fn test_toast_board_clear_recovers_poisoned_lock() {
        let board = ToastBoard::default();
        board.notify(Toast::new("stuck", "body", Duration::from_secs(60)));

        let inner = board.inner.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("poison the toast queue");
        })
        .join();
        assert!(board.inner.is_poisoned());

        board.clear();
        assert!(board.history().is_empty());
    }
}
