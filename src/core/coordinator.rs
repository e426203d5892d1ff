//! Filter-state coordinator
//!
//! Owns the filter state, the preset target selection and the metrics view.
//! Every filter change goes through the exclusivity resolver, then the
//! notification derivation, then a metrics refresh, in that order.

use std::sync::Arc;
use chrono::Local;
use thiserror::Error;

use crate::config::{DashboardConfig, NotificationConfig};
use super::filters::{apply, ActiveFilter, DateRange, FilterKey, FilterState, Resolution, Timestamp};
use super::notify::{describe, ApplySource, Message, Notifier, Toast};
use super::presets::Preset;
use super::refresh::{MetricsView, RefreshCause, RefreshCompletion, RefreshTrigger};
use super::selector::PresetSelection;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("choose a filter for \"{preset}\" first")]
    SelectionPending { preset: &'static str },

    #[error("no preset is waiting for a target filter")]
    NoPendingPreset,
}

/// Source of "now" for preset resolution
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Local wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().naive_local()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Record of one accepted filter transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: FilterKey,
    pub resolution: Resolution,
    pub message: Option<Message>,
    /// Stamp of the refresh this transition scheduled
    pub refresh_stamp: u64,
}

pub struct FilterCoordinator {
    filters: FilterState,
    selection: PresetSelection,
    view: MetricsView,
    refresher: RefreshTrigger,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    notifications: NotificationConfig,
    discard_stale: bool,
}

impl FilterCoordinator {
    pub fn new(
        refresher: RefreshTrigger,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: &DashboardConfig,
    ) -> Self {
        Self {
            filters: FilterState::default(),
            selection: PresetSelection::Idle,
            view: MetricsView::default(),
            refresher,
            notifier,
            clock,
            notifications: config.notifications.clone(),
            discard_stale: config.refresh.discard_stale,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selection(&self) -> PresetSelection {
        self.selection
    }

    pub fn pending_preset(&self) -> Option<Preset> {
        self.selection.pending()
    }

    pub fn metrics_view(&self) -> &MetricsView {
        &self.view
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        self.filters.active_filters()
    }

    /// Stamp of the latest scheduled refresh
    pub fn latest_refresh_stamp(&self) -> u64 {
        self.refresher.latest_stamp()
    }

    /// A range was picked directly on one filter's widget
    pub fn on_range_picked(
        &mut self,
        key: FilterKey,
        range: DateRange,
    ) -> Result<Transition, CoordinatorError> {
        self.selection.guard_edit()?;
        Ok(self.commit(key, range, ApplySource::Direct))
    }

    /// A preset button was pressed; opens the target choice
    pub fn on_preset_activated(&mut self, preset: Preset) -> Result<(), CoordinatorError> {
        self.selection.begin(preset)?;
        tracing::debug!(preset = preset.label(), "awaiting target filter");
        Ok(())
    }

    /// The operator picked which filter the pending preset applies to
    pub fn on_target_chosen(&mut self, key: FilterKey) -> Result<Transition, CoordinatorError> {
        let preset = self.selection.choose()?;
        let range = preset.resolve(self.clock.now());
        Ok(self.commit(key, range, ApplySource::Preset(preset.label())))
    }

    /// The target choice was closed without picking anything
    pub fn on_dismiss(&mut self) -> Option<Preset> {
        let dismissed = self.selection.dismiss();
        if let Some(preset) = dismissed {
            tracing::debug!(preset = preset.label(), "preset selection dismissed");
        }
        dismissed
    }

    /// Clear one filter from its active-filter chip
    pub fn clear_filter(&mut self, key: FilterKey) -> Result<Transition, CoordinatorError> {
        self.on_range_picked(key, DateRange::empty())
    }

    /// Empty every filter. Returns the refresh stamp.
    ///
    /// Applying an empty range to the active filter (or to visit when none is
    /// active) empties the others through the resolver.
    pub fn clear_all(&mut self) -> Result<u64, CoordinatorError> {
        self.selection.guard_edit()?;
        let target = self.filters.active_key().unwrap_or(FilterKey::Visit);
        let transition = self.commit(target, DateRange::empty(), ApplySource::Direct);
        tracing::info!("cleared all filters");
        Ok(transition.refresh_stamp)
    }

    /// Refresh without touching the filters
    pub fn manual_refresh(&mut self) -> u64 {
        tracing::info!("manual refresh requested");
        self.request_refresh(RefreshCause::Manual)
    }

    pub fn scheduled_refresh(&mut self) -> u64 {
        self.request_refresh(RefreshCause::Scheduled)
    }

    /// Apply a finished refresh. Returns true when its metrics are now on display.
    pub fn on_refresh_complete(&mut self, completion: RefreshCompletion) -> bool {
        self.view.finished(completion.cause);

        if self.discard_stale && completion.stamp != self.refresher.latest_stamp() {
            tracing::debug!(
                stamp = completion.stamp,
                latest = self.refresher.latest_stamp(),
                "discarding stale refresh result"
            );
            return false;
        }

        match completion.result {
            Ok(metrics) => {
                self.view.show(completion.stamp, metrics);
                let body = match completion.cause {
                    RefreshCause::FilterChange => {
                        Some("KPI data has been updated based on the applied filters.")
                    }
                    RefreshCause::Manual => {
                        Some("All KPI data has been updated with the latest information.")
                    }
                    RefreshCause::Scheduled => None,
                };
                if let Some(body) = body {
                    self.notifier.notify(Toast::new(
                        "Data Refreshed",
                        body,
                        self.notifications.refresh_toast_duration(),
                    ));
                }
                true
            }
            Err(err) => {
                tracing::warn!(stamp = completion.stamp, "metrics refresh failed: {}", err);
                self.view.last_error = Some(err.to_string());
                self.notifier.notify(Toast::new(
                    "Refresh Failed",
                    err.to_string(),
                    self.notifications.refresh_toast_duration(),
                ));
                false
            }
        }
    }

    fn commit(&mut self, target: FilterKey, range: DateRange, source: ApplySource<'_>) -> Transition {
        let resolution = apply(&self.filters, target, range);
        self.filters = resolution.next;

        tracing::info!(
            filter = target.slug(),
            range = %range.chip_text(),
            cleared = resolution.cleared.len(),
            "filter updated"
        );

        let message = describe(&resolution.cleared, target, source, range.is_empty());
        if let Some(message) = &message {
            self.notifier
                .notify(message.clone().into_toast(self.notifications.filter_toast_duration()));
        }

        let refresh_stamp = self.request_refresh(RefreshCause::FilterChange);

        Transition {
            target,
            resolution,
            message,
            refresh_stamp,
        }
    }

    fn request_refresh(&mut self, cause: RefreshCause) -> u64 {
        self.view.started(cause);
        self.refresher.schedule(cause, self.filters)
    }
}
