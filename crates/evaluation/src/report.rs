//! Plain-text rendering of an evaluation run.

use crate::metrics::MetricsSummary;

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Render the four-section metrics report for one evaluation run.
pub fn render_report(title: &str, summary: &MetricsSummary) -> String {
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);
    let k = summary.k;
    let mut out = String::new();

    out.push_str(&rule);
    out.push_str("\nPERFORMANCE METRICS REPORT\n");
    out.push_str(title);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");

    out.push_str("1. ACCURACY METRICS\n");
    out.push_str(&thin);
    out.push('\n');
    out.push_str(&format!(
        "RMSE (Root Mean Squared Error): {}\n",
        fmt_opt(summary.rmse)
    ));
    out.push_str(&format!(
        "MAE (Mean Absolute Error):      {}\n\n",
        fmt_opt(summary.mae)
    ));

    out.push_str("2. RANKING METRICS\n");
    out.push_str(&thin);
    out.push('\n');
    out.push_str(&format!("Precision@{k}: {:.4}\n", summary.precision_at_k));
    out.push_str(&format!("Recall@{k}:    {:.4}\n", summary.recall_at_k));
    out.push_str(&format!("F1-Score:      {:.4}\n\n", summary.f1_score));

    out.push_str("3. BEYOND-ACCURACY METRICS\n");
    out.push_str(&thin);
    out.push('\n');
    out.push_str(&format!("Coverage:  {}\n", fmt_opt(summary.coverage)));
    out.push_str(&format!("Diversity: {:.4}\n", summary.diversity));
    out.push_str(&format!("Novelty:   {}\n\n", fmt_opt(summary.novelty)));

    out.push_str("4. INTERPRETATION\n");
    out.push_str(&thin);
    out.push('\n');
    out.push_str("* Lower RMSE/MAE = Better prediction accuracy\n");
    out.push_str("* Higher Precision/Recall/F1 = Better ranking quality\n");
    out.push_str("* Higher Coverage = More movies recommended\n");
    out.push_str("* Higher Diversity = Less repetitive recommendations\n");
    out.push_str("* Higher Novelty = More long-tail recommendations\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_contains_all_sections() {
        let summary = MetricsSummary {
            k: 10,
            sample_size: 100,
            rmse: Some(0.91),
            mae: Some(0.72),
            precision_at_k: 0.3,
            recall_at_k: 0.5,
            f1_score: 0.375,
            coverage: Some(12.5),
            diversity: 1.0,
            novelty: None,
        };
        let report = render_report("Hybrid System", &summary);

        assert!(report.contains("1. ACCURACY METRICS"));
        assert!(report.contains("2. RANKING METRICS"));
        assert!(report.contains("3. BEYOND-ACCURACY METRICS"));
        assert!(report.contains("4. INTERPRETATION"));
        assert!(report.contains("Precision@10"));
        assert!(report.contains("Novelty:   N/A"));
    }
}
