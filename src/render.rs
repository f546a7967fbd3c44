//! Plain-text summary of the current dashboard state

use std::fmt::Write;

use logdeck_engine::{Engine, LogEvent};

/// Stats, activity and the current page as text
pub fn render_summary(engine: &Engine) -> String {
    let mut out = String::new();
    let selection = engine.selection();

    let view = match selection.source.as_deref() {
        Some(id) => engine
            .registry()
            .get(id)
            .map_or(id.to_string(), |s| s.name.clone()),
        None => "all sources".to_string(),
    };
    let search = if selection.search.is_empty() {
        "-"
    } else {
        selection.search.as_str()
    };
    let _ = writeln!(
        out,
        "Sources: {} | View: {} | Filter: {} | Search: {}",
        engine.registry().len(),
        view,
        selection.filter,
        search
    );

    let stats = engine.current_stats();
    let _ = write!(
        out,
        "ERROR {}  WARN {}  INFO {}  DEBUG {}",
        stats.error, stats.warn, stats.info, stats.debug
    );
    if stats.other > 0 {
        let _ = write!(out, "  OTHER {}", stats.other);
    }
    out.push('\n');

    let series = engine.series();
    if let (Some(first), Some(last)) = (series.labels.first(), series.labels.last()) {
        let peak = (0..series.len())
            .map(|i| series.error[i] + series.warn[i] + series.info[i] + series.debug[i])
            .max()
            .unwrap_or(0);
        let _ = writeln!(
            out,
            "Activity: {} buckets {}..{}, peak {}/s",
            series.len(),
            first,
            last,
            peak
        );
    }

    let page = engine.view();
    let _ = writeln!(
        out,
        "Page {} of {} ({} matches)",
        page.page, page.total_pages, page.total_matches
    );
    for entry in &page.entries {
        out.push_str(&format_row(engine, entry));
        out.push('\n');
    }
    out
}

/// One-line digest of an insights payload; `None` if it has no summary
pub fn render_insights(insights: &serde_json::Value) -> Option<String> {
    let summary = insights.get("summary")?;
    let mut line = format!(
        "Insights: health {} | {} logs | errors {:.1}% | warnings {:.1}%",
        summary["health_score"].as_f64()?,
        summary["total_logs"].as_u64()?,
        summary["error_rate"].as_f64().unwrap_or(0.0) * 100.0,
        summary["warning_rate"].as_f64().unwrap_or(0.0) * 100.0,
    );
    if let Some(message) = insights["anomalies"][0]["message"].as_str() {
        let _ = write!(line, " | {}", message);
    }
    Some(line)
}

fn format_row(engine: &Engine, entry: &LogEvent) -> String {
    let source = entry
        .source_name
        .clone()
        .or_else(|| {
            entry
                .source_id
                .as_deref()
                .and_then(|id| engine.registry().get(id))
                .map(|s| s.name.clone())
        })
        .unwrap_or_default();
    let message = entry.message.lines().next().unwrap_or_default();
    format!(
        "{} {:<5} {:<12} [{}] {} - {}",
        entry.timestamp, entry.level, source, entry.thread, entry.component, message
    )
}
