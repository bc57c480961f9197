use sentiment_pipeline::QueryReport;
use sentiscope_core::{truncate, ClassifiedItem, SourceKind};
use std::fmt::Write;

const PREVIEW_CHARS: usize = 60;

/// Numbered the same way `AppConfig::select_query` resolves positions.
pub fn render_query_list(queries: &[&str]) -> String {
    let mut out = String::new();
    for (position, query) in queries.iter().enumerate() {
        let _ = writeln!(out, "{:>3}  {}", position + 1, query);
    }
    out
}

pub fn render_no_results(term: &str, subreddit: &str) -> String {
    format!(
        "No posts or comments found for '{}' in r/{} within the time window.\n",
        term, subreddit
    )
}

/// Overall counts, the zero-filled daily series and a sample of classified items.
pub fn render_report(report: &QueryReport, samples: usize) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(
        out,
        "Sentiment for '{}' in r/{} ({} items)\n",
        report.term,
        report.subreddit,
        summary.total()
    );

    let _ = writeln!(out, "{:<12} {:>7} {:>7}", "label", "count", "share");
    let distribution = summary.distribution();
    for (label, count) in &summary.overall_counts {
        let share = distribution.get(label).copied().unwrap_or(0.0);
        let _ = writeln!(
            out,
            "{:<12} {:>7} {:>6.1}%",
            label.to_string(),
            count,
            share * 100.0
        );
    }

    let labels = summary.labels();
    let _ = write!(out, "\n{:<12}", "date");
    for label in &labels {
        let _ = write!(out, " {:>9}", label.to_string());
    }
    out.push('\n');
    for row in summary.dense_daily_series() {
        let _ = write!(out, "{:<12}", row.date.format("%Y-%m-%d").to_string());
        for label in &labels {
            let count = row.counts.get(label).copied().unwrap_or(0);
            let _ = write!(out, " {:>9}", count);
        }
        out.push('\n');
    }

    if samples > 0 && !report.items.is_empty() {
        let _ = writeln!(
            out,
            "\n{:<17} {:<8} {:<10} {:>5}  text",
            "created (UTC)", "kind", "label", "conf"
        );
        for classified in report.items.iter().take(samples) {
            let _ = writeln!(out, "{}", sample_row(classified));
        }
    }

    out
}

fn sample_row(classified: &ClassifiedItem) -> String {
    let kind = match classified.item.source_kind() {
        SourceKind::Post => "post",
        SourceKind::Comment => "comment",
    };
    format!(
        "{:<17} {:<8} {:<10} {:>5.2}  {}",
        classified.item.created_at().format("%Y-%m-%d %H:%M"),
        kind,
        classified.label.to_string(),
        classified.confidence,
        preview(classified.item.text())
    )
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate(&flat, PREVIEW_CHARS);
    if cut.len() < flat.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}
