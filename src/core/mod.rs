//! Core functionality module
//!
//! Contains the date-range filters, presets, the filter-state coordinator
//! and the metrics refresh plumbing

pub mod filters;
pub mod presets;
pub mod selector;
pub mod notify;
pub mod metrics;
pub mod refresh;
pub mod coordinator;

// Re-export main types
pub use filters::{apply, parse_timestamp, ActiveFilter, DateRange, FilterKey, FilterState, Resolution, Timestamp};
pub use presets::Preset;
pub use selector::PresetSelection;
pub use notify::{describe, ApplySource, LogNotifier, Message, MessageKind, Notifier, Toast, ToastBoard};
pub use metrics::{format_count, KpiTile, MetricsError, MetricsSource, MockMetricsSource, SessionMetrics, Tone, KPI_TILES};
pub use refresh::{MetricsView, RefreshCause, RefreshCompletion, RefreshTrigger};
pub use coordinator::{Clock, CoordinatorError, FilterCoordinator, FixedClock, SystemClock, Transition};
