//! Metrics refresh scheduling
//!
//! Every refresh runs as its own tokio task and reports back over a channel.
//! Nothing is cancelled: overlapping refreshes complete in whatever order the
//! source answers them, and the event loop applies them as they arrive.

use std::sync::Arc;
use chrono::Local;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::filters::{FilterState, Timestamp};
use super::metrics::{MetricsError, MetricsSource, SessionMetrics};

/// Why a refresh was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshCause {
    /// An accepted filter transition
    FilterChange,
    /// The operator pressed the refresh control
    Manual,
    /// Periodic background refresh
    Scheduled,
}

/// Outcome of one refresh task
#[derive(Debug, Clone)]
pub struct RefreshCompletion {
    /// Monotonically increasing per trigger
    pub stamp: u64,
    pub cause: RefreshCause,
    /// Filters the request was issued with
    pub filters: FilterState,
    pub result: Result<SessionMetrics, MetricsError>,
}

pub struct RefreshTrigger {
    source: Arc<dyn MetricsSource>,
    tx: UnboundedSender<RefreshCompletion>,
    next_stamp: u64,
}

impl RefreshTrigger {
    /// Build a trigger and the receiver its completions arrive on
    pub fn new(source: Arc<dyn MetricsSource>) -> (Self, UnboundedReceiver<RefreshCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let trigger = Self {
            source,
            tx,
            next_stamp: 0,
        };
        (trigger, rx)
    }

    /// Spawn a refresh and return its stamp.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, cause: RefreshCause, filters: FilterState) -> u64 {
        self.next_stamp += 1;
        let stamp = self.next_stamp;

        tracing::debug!(stamp, ?cause, "scheduling metrics refresh");

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.refresh(&filters).await;
            let completion = RefreshCompletion {
                stamp,
                cause,
                filters,
                result,
            };
            if tx.send(completion).is_err() {
                tracing::debug!(stamp, "refresh finished after the dashboard closed");
            }
        });

        stamp
    }

    /// Stamp of the most recently scheduled refresh, 0 if none
    pub fn latest_stamp(&self) -> u64 {
        self.next_stamp
    }
}

/// Metrics display state fed by refresh completions
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsView {
    pub metrics: Option<SessionMetrics>,
    pub last_updated: Option<Timestamp>,
    /// Stamp of the completion currently on display
    pub applied_stamp: Option<u64>,
    /// Refreshes caused by filter changes that have not completed
    pub filter_refreshes_in_flight: usize,
    /// Operator-requested refreshes that have not completed
    pub manual_refreshes_in_flight: usize,
    /// Periodic refreshes; these swap metrics in without a loading state
    pub scheduled_refreshes_in_flight: usize,
    pub last_error: Option<String>,
}

impl MetricsView {
    pub fn is_loading(&self) -> bool {
        self.filter_refreshes_in_flight > 0
    }

    pub fn is_refreshing(&self) -> bool {
        self.manual_refreshes_in_flight > 0
    }

    /// Tiles show a placeholder during filter or manual refreshes
    pub fn is_busy(&self) -> bool {
        self.is_loading() || self.is_refreshing()
    }

    pub(crate) fn started(&mut self, cause: RefreshCause) {
        match cause {
            RefreshCause::FilterChange => self.filter_refreshes_in_flight += 1,
            RefreshCause::Manual => self.manual_refreshes_in_flight += 1,
            RefreshCause::Scheduled => self.scheduled_refreshes_in_flight += 1,
        }
    }

    pub(crate) fn finished(&mut self, cause: RefreshCause) {
        match cause {
            RefreshCause::FilterChange => {
                self.filter_refreshes_in_flight = self.filter_refreshes_in_flight.saturating_sub(1)
            }
            RefreshCause::Manual => {
                self.manual_refreshes_in_flight = self.manual_refreshes_in_flight.saturating_sub(1)
            }
            RefreshCause::Scheduled => {
                self.scheduled_refreshes_in_flight = self.scheduled_refreshes_in_flight.saturating_sub(1)
            }
        }
    }

    pub(crate) fn show(&mut self, stamp: u64, metrics: SessionMetrics) {
        self.metrics = Some(metrics);
        self.applied_stamp = Some(stamp);
        self.last_updated = Some(Local::now().naive_local());
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedSource(u64);

    #[async_trait]
    impl MetricsSource for FixedSource {
        async fn refresh(&self, _filters: &FilterState) -> Result<SessionMetrics, MetricsError> {
            Ok(SessionMetrics {
                total_sessions_received: self.0,
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_schedule_delivers_completion() {
        let (mut trigger, mut rx) = RefreshTrigger::new(Arc::new(FixedSource(42)));

        let stamp = trigger.schedule(RefreshCause::Manual, FilterState::default());
        let completion = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(completion.stamp, stamp);
        assert_eq!(completion.cause, RefreshCause::Manual);
        assert_eq!(completion.result.unwrap().total_sessions_received, 42);
    }

    #[tokio::test]
    async fn test_stamps_increase() {
        let (mut trigger, _rx) = RefreshTrigger::new(Arc::new(FixedSource(1)));

        let first = trigger.schedule(RefreshCause::FilterChange, FilterState::default());
        let second = trigger.schedule(RefreshCause::Scheduled, FilterState::default());

        assert!(second > first);
        assert_eq!(trigger.latest_stamp(), second);
    }

    #[test]
    fn test_view_loading_flags() {
        let mut view = MetricsView::default();
        assert!(!view.is_busy());

        view.started(RefreshCause::FilterChange);
        view.started(RefreshCause::FilterChange);
        view.started(RefreshCause::Manual);
        assert!(view.is_loading());
        assert!(view.is_refreshing());

        view.finished(RefreshCause::FilterChange);
        assert!(view.is_loading());
        view.finished(RefreshCause::FilterChange);
        view.finished(RefreshCause::Manual);
        assert!(!view.is_busy());

        // Never underflows
        view.finished(RefreshCause::Manual);
        view.finished(RefreshCause::Scheduled);
        assert_eq!(view.manual_refreshes_in_flight, 0);
        assert_eq!(view.scheduled_refreshes_in_flight, 0);
    }

    #[test]
    fn test_scheduled_refresh_is_not_busy() {
        let mut view = MetricsView::default();

        view.started(RefreshCause::Scheduled);
        assert!(!view.is_refreshing());
        assert!(!view.is_busy());
        assert_eq!(view.scheduled_refreshes_in_flight, 1);

        view.started(RefreshCause::Manual);
        assert!(view.is_busy());
        view.finished(RefreshCause::Manual);
        view.finished(RefreshCause::Scheduled);
        assert_eq!(view.scheduled_refreshes_in_flight, 0);
    }
}
