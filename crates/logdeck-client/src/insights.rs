use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use logdeck_types::{Level, LevelCounts, LogEvent};

use crate::api::InsightsApi;

/// Error rate above which a review is recommended
const HIGH_ERROR_RATE: f64 = 0.1;

/// Warning rate above which an optimization is recommended
const HIGH_WARNING_RATE: f64 = 0.2;

/// Health summary of a set of entries: error and warning hotspots, rates,
/// a 0-100 health score and recommendations.
pub fn summarize(events: &[LogEvent]) -> Value {
    let counts: LevelCounts = events.iter().fold(LevelCounts::default(), |mut acc, e| {
        acc.increment(&e.level);
        acc
    });
    let total = events.len() as u64;
    let rate = |n: u64| if total == 0 { 0.0 } else { n as f64 / total as f64 };
    let (error_rate, warning_rate) = (rate(counts.error), rate(counts.warn));

    let mut anomalies = Vec::new();
    if let Some((component, n)) = hotspot(events, &Level::Error) {
        anomalies.push(json!({
            "type": "error_hotspot",
            "message": format!("Component '{component}' has the highest error count ({n} errors)"),
            "severity": "high",
        }));
    } else {
        anomalies.push(json!({
            "type": "system_healthy",
            "message": "No anomalies detected. System is running smoothly.",
            "severity": "low",
        }));
    }

    let mut patterns = Vec::new();
    if let Some((component, n)) = hotspot(events, &Level::Warn) {
        patterns.push(json!({
            "type": "warning_pattern",
            "message": format!("Component '{component}' shows repeated warnings ({n} warnings)"),
            "severity": "medium",
        }));
    } else {
        patterns.push(json!({
            "type": "normal_operation",
            "message": "Log patterns are within normal ranges.",
            "severity": "low",
        }));
    }

    let mut recommendations = Vec::new();
    if error_rate > HIGH_ERROR_RATE {
        recommendations.push(json!({
            "type": "high_error_rate",
            "message": "High error rate detected. Review error handling in the hotspot components.",
            "action": "Review error handling mechanisms",
        }));
    }
    if warning_rate > HIGH_WARNING_RATE {
        recommendations.push(json!({
            "type": "high_warning_rate",
            "message": "High warning rate detected. Consider optimizing warned components.",
            "action": "Optimize warned components",
        }));
    }
    if recommendations.is_empty() {
        recommendations.push(json!({
            "type": "maintain_health",
            "message": "System is healthy. Continue monitoring for any changes.",
            "action": "Maintain current configuration",
        }));
    }

    json!({
        "anomalies": anomalies,
        "patterns": patterns,
        "summary": {
            "total_logs": total,
            "error_rate": error_rate,
            "warning_rate": warning_rate,
            "health_score": health_score(&counts),
        },
        "recommendations": recommendations,
    })
}

/// Component with the most entries at `level`. Ties go to the name sorting first.
fn hotspot(events: &[LogEvent], level: &Level) -> Option<(String, u64)> {
    let mut per_component: HashMap<&str, u64> = HashMap::new();
    for event in events.iter().filter(|e| &e.level == level) {
        let component = if event.component.is_empty() {
            "Unknown"
        } else {
            event.component.as_str()
        };
        *per_component.entry(component).or_default() += 1;
    }
    per_component
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(c, n)| (c.to_string(), n))
}

/// 100 for no trouble, 0 when every entry is an error. WARN weighs 0.5 and
/// INFO 0.1; rounded to two decimals.
fn health_score(counts: &LevelCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 100.0;
    }
    let weighted = counts.error as f64 + counts.warn as f64 * 0.5 + counts.info as f64 * 0.1;
    let score = (100.0 * (1.0 - weighted / total as f64)).clamp(0.0, 100.0);
    (score * 100.0).round() / 100.0
}

/// Periodically fetches the insights summary and forwards it untouched
pub struct InsightsPoller {
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl InsightsPoller {
    /// Poll immediately, then every `period`, sending each payload to `tx`
    pub fn spawn<A>(
        api: Arc<A>,
        period: Duration,
        tx: mpsc::UnboundedSender<Value>,
    ) -> Self
    where
        A: InsightsApi + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn({
            let cancel = cancel.clone();
            let refresh = Arc::clone(&refresh);
            async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                        _ = refresh.notified() => ticker.reset(),
                    }

                    match api.insights().await {
                        Ok(payload) => {
                            if tx.send(payload).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to fetch insights"),
                    }
                }
            }
        });

        Self {
            cancel,
            refresh,
            task,
        }
    }

    /// Fetch now instead of waiting for the next period (e.g. the insights
    /// view became visible)
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for InsightsPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}
