//! Session-processing metrics and the KPI tile catalog
//!
//! The dashboard never computes metrics itself; it asks a `MetricsSource`
//! for a fresh snapshot whenever the filters change.

use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filters::FilterState;

/// Counters shown on the KPI tiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub total_sessions_received: u64,
    pub total_photos_received: u64,
    pub sessions_confirm_upload_clicked: u64,
    pub sessions_not_marked_complete: u64,
    pub sessions_sent_for_processing: u64,
    pub sessions_fully_processed: u64,
    pub sessions_not_processed: u64,
    pub sessions_failed: u64,
    pub in_processing_sessions: u64,
    pub sessions_available_in_cas: u64,
    pub sessions_available_in_output_api: u64,
    pub unique_stores_visited: u64,
    pub unique_users_visited: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("metrics service unavailable: {0}")]
    Unavailable(String),

    #[error("metrics request timed out after {0:?}")]
    Timeout(Duration),
}

/// External provider of metric snapshots
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn refresh(&self, filters: &FilterState) -> Result<SessionMetrics, MetricsError>;
}

/// Random metrics after a simulated delay
#[derive(Debug, Clone)]
pub struct MockMetricsSource {
    latency: Duration,
    failure_rate: f64,
}

impl MockMetricsSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failure_rate: 0.0,
        }
    }

    /// Probability in [0, 1] that a refresh fails
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn generate() -> SessionMetrics {
        let mut rng = rand::thread_rng();
        SessionMetrics {
            total_sessions_received: rng.gen_range(500..1500),
            total_photos_received: rng.gen_range(2000..7000),
            sessions_confirm_upload_clicked: rng.gen_range(400..1200),
            sessions_not_marked_complete: rng.gen_range(50..150),
            sessions_sent_for_processing: rng.gen_range(350..1050),
            sessions_fully_processed: rng.gen_range(300..900),
            sessions_not_processed: rng.gen_range(25..75),
            sessions_failed: rng.gen_range(5..25),
            in_processing_sessions: rng.gen_range(20..100),
            sessions_available_in_cas: rng.gen_range(250..750),
            sessions_available_in_output_api: rng.gen_range(225..675),
            unique_stores_visited: rng.gen_range(50..150),
            unique_users_visited: rng.gen_range(250..750),
        }
    }
}

impl Default for MockMetricsSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn refresh(&self, filters: &FilterState) -> Result<SessionMetrics, MetricsError> {
        tracing::debug!(active = ?filters.active_key(), "generating mock metrics");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(MetricsError::Unavailable("simulated outage".to_string()));
        }

        Ok(Self::generate())
    }
}

/// Visual emphasis of a KPI tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Default,
    Success,
    Warning,
    Error,
    Info,
}

/// Static description of one KPI tile
#[derive(Debug, Clone, Copy)]
pub struct KpiTile {
    pub title: &'static str,
    pub definition: Option<&'static str>,
    /// Tone used when the value is non-zero
    pub tone_when_positive: Tone,
    value: fn(&SessionMetrics) -> u64,
}

impl KpiTile {
    pub fn value(&self, metrics: &SessionMetrics) -> u64 {
        (self.value)(metrics)
    }

    pub fn tone(&self, metrics: &SessionMetrics) -> Tone {
        if self.value(metrics) > 0 {
            self.tone_when_positive
        } else {
            Tone::Default
        }
    }
}

const fn tile(
    title: &'static str,
    definition: Option<&'static str>,
    tone_when_positive: Tone,
    value: fn(&SessionMetrics) -> u64,
) -> KpiTile {
    KpiTile {
        title,
        definition,
        tone_when_positive,
        value,
    }
}

pub const KPI_TILES: [KpiTile; 13] = [
    tile("Total Sessions Received", Some("PhotoSession table count"), Tone::Default, |m| m.total_sessions_received),
    tile("Total Photos Received", Some("Photo table count"), Tone::Default, |m| m.total_photos_received),
    tile("Sessions Confirm Upload Clicked", Some("PhotoSession where session_state = 2"), Tone::Default, |m| m.sessions_confirm_upload_clicked),
    tile("Sessions Not Marked Complete", Some("PhotoSession where session_state ≠ 2"), Tone::Default, |m| m.sessions_not_marked_complete),
    tile("Sessions Sent For Processing", Some("SessionProcessingState count"), Tone::Warning, |m| m.sessions_sent_for_processing),
    tile("Sessions Fully Processed", Some("PhotoSession where non_evidence_status = 3"), Tone::Success, |m| m.sessions_fully_processed),
    tile("Sessions Not Processed", Some("PhotoSession where non_evidence_status = 1"), Tone::Error, |m| m.sessions_not_processed),
    tile("Sessions Failed", Some("PhotoSession where non_evidence_status = 4"), Tone::Error, |m| m.sessions_failed),
    tile("In Processing Sessions", Some("PhotoSession where non_evidence_status = 2"), Tone::Warning, |m| m.in_processing_sessions),
    tile("Sessions Available in CAS", Some("SessionFacingsDetail count"), Tone::Default, |m| m.sessions_available_in_cas),
    tile("Sessions Available in Output API", Some("SessionIRAnalyticsV2 table count"), Tone::Success, |m| m.sessions_available_in_output_api),
    tile("Unique Stores Visited", None, Tone::Info, |m| m.unique_stores_visited),
    tile("Unique Users Visited", None, Tone::Info, |m| m.unique_users_visited),
];

/// Format a count with thousands separators: 1234567 -> "1,234,567"
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
