//! In-process request metrics for CrabDesk.
//!
//! A single [`MetricsCollector`] guards all state behind one
//! `std::sync::Mutex`. Every mutation and snapshot is synchronous; the lock
//! is never held across an await point. Request history is bounded, so the
//! collector's memory use is fixed regardless of uptime.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Default cap on retained per-request records.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// One observed request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_secs: f64,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub confidence_score: Option<f32>,
    pub response_type: Option<String>,
    pub escalated: bool,
}

impl RequestMetrics {
    fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// Aggregate view over the recent request history.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub average_response_time: f64,
    pub requests_per_minute: f64,
    pub escalation_rate: f64,
    pub average_confidence_score: f64,
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// Per-endpoint aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStats {
    pub total_requests: u64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub average_response_time: f64,
    pub total_response_time: f64,
}

/// Per-session aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetrics {
    pub request_count: u64,
    pub total_time: f64,
    pub escalations: u64,
    pub average_confidence_score: f64,
    pub escalation_rate: f64,
}

/// Full export for the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub system_metrics: SystemMetrics,
    pub endpoint_metrics: BTreeMap<String, EndpointStats>,
    pub active_sessions_count: usize,
    pub export_timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct EndpointAccumulator {
    count: u64,
    total_time: f64,
    success_count: u64,
    error_count: u64,
}

#[derive(Default)]
struct SessionAccumulator {
    request_count: u64,
    total_time: f64,
    escalations: u64,
    confidence_scores: Vec<f32>,
}

struct Inner {
    history: VecDeque<RequestMetrics>,
    endpoints: HashMap<String, EndpointAccumulator>,
    sessions: HashMap<String, SessionAccumulator>,
}

/// Collects and aggregates request metrics.
pub struct MetricsCollector {
    max_history: usize,
    inner: Mutex<Inner>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            inner: Mutex::new(Inner {
                history: VecDeque::with_capacity(max_history),
                endpoints: HashMap::new(),
                sessions: HashMap::new(),
            }),
        }
    }

    /// Record one request.
    pub fn record(&self, metrics: RequestMetrics) {
        let mut inner = self.inner.lock().unwrap();

        let endpoint_key = format!("{} {}", metrics.method, metrics.endpoint);
        let endpoint = inner.endpoints.entry(endpoint_key).or_default();
        endpoint.count += 1;
        endpoint.total_time += metrics.response_time_secs;
        if metrics.is_success() {
            endpoint.success_count += 1;
        } else {
            endpoint.error_count += 1;
        }

        if let Some(session_id) = &metrics.session_id {
            let session = inner.sessions.entry(session_id.clone()).or_default();
            session.request_count += 1;
            session.total_time += metrics.response_time_secs;
            if metrics.escalated {
                session.escalations += 1;
            }
            if let Some(score) = metrics.confidence_score {
                session.confidence_scores.push(score);
            }
        }

        if inner.history.len() == self.max_history {
            inner.history.pop_front();
        }
        inner.history.push_back(metrics);
    }

    /// System-wide snapshot over the last hour of history (or the whole
    /// retained history when the last hour is empty).
    pub fn system_snapshot(&self) -> SystemMetrics {
        let inner = self.inner.lock().unwrap();
        let now = Utc::now();

        if inner.history.is_empty() {
            return SystemMetrics {
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                average_response_time: 0.0,
                requests_per_minute: 0.0,
                escalation_rate: 0.0,
                average_confidence_score: 0.0,
                active_sessions: inner.sessions.len(),
                timestamp: now,
            };
        }

        let one_hour_ago = now - Duration::hours(1);
        let recent: Vec<&RequestMetrics> = {
            let within_hour: Vec<&RequestMetrics> = inner
                .history
                .iter()
                .filter(|r| r.timestamp > one_hour_ago)
                .collect();
            if within_hour.is_empty() {
                inner.history.iter().collect()
            } else {
                within_hour
            }
        };

        let total_requests = recent.len();
        let successful_requests = recent.iter().filter(|r| r.is_success()).count();
        let total_time: f64 = recent.iter().map(|r| r.response_time_secs).sum();
        let escalated = recent.iter().filter(|r| r.escalated).count();

        let span_minutes = (recent[recent.len() - 1].timestamp - recent[0].timestamp)
            .num_milliseconds() as f64
            / 60_000.0;
        let requests_per_minute = if span_minutes > 0.0 {
            total_requests as f64 / span_minutes
        } else {
            0.0
        };

        let scores: Vec<f32> = recent.iter().filter_map(|r| r.confidence_score).collect();
        let average_confidence_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64
        };

        SystemMetrics {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            average_response_time: total_time / total_requests as f64,
            requests_per_minute,
            escalation_rate: escalated as f64 / total_requests as f64,
            average_confidence_score,
            active_sessions: inner.sessions.len(),
            timestamp: now,
        }
    }

    /// Per-endpoint snapshot, keyed by `"METHOD /path"`.
    pub fn endpoint_snapshot(&self) -> BTreeMap<String, EndpointStats> {
        let inner = self.inner.lock().unwrap();
        inner
            .endpoints
            .iter()
            .filter(|(_, acc)| acc.count > 0)
            .map(|(key, acc)| {
                (
                    key.clone(),
                    EndpointStats {
                        total_requests: acc.count,
                        success_rate: acc.success_count as f64 / acc.count as f64,
                        error_rate: acc.error_count as f64 / acc.count as f64,
                        average_response_time: acc.total_time / acc.count as f64,
                        total_response_time: acc.total_time,
                    },
                )
            })
            .collect()
    }

    /// Snapshot for one session, if it has been seen.
    pub fn session_snapshot(&self, session_id: &str) -> Option<SessionMetrics> {
        let inner = self.inner.lock().unwrap();
        let acc = inner.sessions.get(session_id)?;

        let (average_confidence_score, escalation_rate) = if acc.confidence_scores.is_empty() {
            (0.0, 0.0)
        } else {
            (
                acc.confidence_scores.iter().map(|s| *s as f64).sum::<f64>()
                    / acc.confidence_scores.len() as f64,
                acc.escalations as f64 / acc.request_count as f64,
            )
        };

        Some(SessionMetrics {
            request_count: acc.request_count,
            total_time: acc.total_time,
            escalations: acc.escalations,
            average_confidence_score,
            escalation_rate,
        })
    }

    /// Full report for external monitoring.
    pub fn export(&self) -> MetricsReport {
        let system_metrics = self.system_snapshot();
        let endpoint_metrics = self.endpoint_snapshot();
        let active_sessions_count = self.inner.lock().unwrap().sessions.len();

        MetricsReport {
            system_metrics,
            endpoint_metrics,
            active_sessions_count,
            export_timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(endpoint: &str, status: u16, session: Option<&str>, escalated: bool) -> RequestMetrics {
        RequestMetrics {
            endpoint: endpoint.into(),
            method: "POST".into(),
            status_code: status,
            response_time_secs: 0.2,
            timestamp: Utc::now(),
            session_id: session.map(str::to_string),
            confidence_score: Some(0.8),
            response_type: Some("faq".into()),
            escalated,
        }
    }

    #[test]
    fn empty_collector_reports_zeros() {
        let collector = MetricsCollector::default();
        let system = collector.system_snapshot();
        assert_eq!(system.total_requests, 0);
        assert_eq!(system.escalation_rate, 0.0);
        assert_eq!(system.active_sessions, 0);
        assert!(collector.endpoint_snapshot().is_empty());
        assert!(collector.session_snapshot("nope").is_none());
    }

    #[test]
    fn system_snapshot_aggregates() {
        let collector = MetricsCollector::default();
        collector.record(request("/api/chat", 200, Some("s1"), false));
        collector.record(request("/api/chat", 200, Some("s1"), true));
        collector.record(request("/api/chat", 503, Some("s2"), false));

        let system = collector.system_snapshot();
        assert_eq!(system.total_requests, 3);
        assert_eq!(system.successful_requests, 2);
        assert_eq!(system.failed_requests, 1);
        assert!((system.escalation_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((system.average_confidence_score - 0.8).abs() < 1e-6);
        assert_eq!(system.active_sessions, 2);
    }

    #[test]
    fn endpoint_snapshot_splits_success_and_error() {
        let collector = MetricsCollector::default();
        collector.record(request("/api/chat", 200, None, false));
        collector.record(request("/api/chat", 422, None, false));

        let endpoints = collector.endpoint_snapshot();
        let stats = &endpoints["POST /api/chat"];
        assert_eq!(stats.total_requests, 2);
        assert!((stats.success_rate - 0.5).abs() < 1e-9);
        assert!((stats.error_rate - 0.5).abs() < 1e-9);
        assert!((stats.average_response_time - 0.2).abs() < 1e-9);
    }

    #[test]
    fn session_snapshot_tracks_escalations() {
        let collector = MetricsCollector::default();
        collector.record(request("/api/chat", 200, Some("s1"), false));
        collector.record(request("/api/chat", 200, Some("s1"), true));

        let session = collector.session_snapshot("s1").unwrap();
        assert_eq!(session.request_count, 2);
        assert_eq!(session.escalations, 1);
        assert!((session.escalation_rate - 0.5).abs() < 1e-9);
        assert!((session.average_confidence_score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn history_is_bounded() {
        let collector = MetricsCollector::new(5);
        for _ in 0..20 {
            collector.record(request("/api/chat", 200, None, false));
        }
        let system = collector.system_snapshot();
        assert_eq!(system.total_requests, 5);
    }

    #[test]
    fn export_contains_all_sections() {
        let collector = MetricsCollector::default();
        collector.record(request("/api/chat", 200, Some("s1"), false));

        let report = collector.export();
        assert_eq!(report.system_metrics.total_requests, 1);
        assert_eq!(report.active_sessions_count, 1);
        assert!(report.endpoint_metrics.contains_key("POST /api/chat"));
    }
}
