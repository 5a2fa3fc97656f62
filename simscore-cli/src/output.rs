//! Plain-text tables and CSV export.

use simscore_core::{MetricStat, Run, RunComparison, ScoredRow, TagSummary};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use unicode_width::UnicodeWidthStr;

/// Metric names present in any row, in ascending order.
fn metric_columns(rows: &[ScoredRow]) -> Vec<&str> {
    let names: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.metrics.keys().map(String::as_str))
        .collect();
    names.into_iter().collect()
}

fn fmt_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.3}")
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_value).unwrap_or_else(|| "-".to_string())
}

/// Render cells as a fixed-width table with a dashed rule under the header.
///
/// Columns are sized by terminal display width, so wide and combining
/// characters stay aligned.
fn render_table(header: &[String], body: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for row in body {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut out = String::new();
    let line = |cells: &[String], out: &mut String| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c}{}", " ".repeat(w.saturating_sub(c.width()))))
            .collect();
        let _ = writeln!(out, "{}", padded.join("  ").trim_end());
    };
    line(header, &mut out);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in body {
        line(row, &mut out);
    }
    out
}

/// The first `limit` scored rows as a table.
pub fn rows_table(rows: &[ScoredRow], limit: usize) -> String {
    let metrics = metric_columns(rows);
    let mut header = vec!["id".to_string(), "variant".to_string(), "score".to_string()];
    header.extend(metrics.iter().map(|m| m.to_string()));
    header.push("tags".to_string());

    let body: Vec<Vec<String>> = rows
        .iter()
        .take(limit)
        .map(|row| {
            let mut cells = vec![row.id.clone(), row.variant.clone(), fmt_value(row.score)];
            cells.extend(metrics.iter().map(|m| fmt_opt(row.metrics.get(*m).copied())));
            cells.push(row.tags.clone());
            cells
        })
        .collect();
    render_table(&header, &body)
}

pub fn tag_summary_table(summaries: &[TagSummary]) -> String {
    let header: Vec<String> = ["tag", "mean", "lo", "hi", "n"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let body: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.tag.clone(),
                fmt_value(s.mean),
                fmt_value(s.lo),
                fmt_value(s.hi),
                s.n.to_string(),
            ]
        })
        .collect();
    render_table(&header, &body)
}

pub fn runs_table(runs: &[Run]) -> String {
    let header: Vec<String> = ["run_id", "created_at", "git_revision", "notes"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let body: Vec<Vec<String>> = runs
        .iter()
        .map(|r| {
            vec![
                r.run_id.clone(),
                r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.git_revision.clone().unwrap_or_else(|| "-".to_string()),
                r.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&header, &body)
}

pub fn run_summary_table(summary: &BTreeMap<String, MetricStat>) -> String {
    let header: Vec<String> = ["metric", "mean", "count"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let body: Vec<Vec<String>> = summary
        .iter()
        .map(|(metric, stat)| vec![metric.clone(), fmt_value(stat.mean), stat.count.to_string()])
        .collect();
    render_table(&header, &body)
}

pub fn comparison_table(comparison: &[RunComparison]) -> String {
    let header: Vec<String> = ["metric", "baseline", "candidate", "delta"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let body: Vec<Vec<String>> = comparison
        .iter()
        .map(|c| {
            vec![
                c.metric.clone(),
                fmt_opt(c.baseline),
                fmt_opt(c.candidate),
                c.delta
                    .map(|d| format!("{d:+.3}"))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    render_table(&header, &body)
}

/// Write every row as RFC 4180 CSV: id, variant, score, metrics..., tags.
pub fn write_csv<W: Write>(rows: &[ScoredRow], writer: W) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    let metrics = metric_columns(rows);
    let mut header = vec!["id", "variant", "score"];
    header.extend(metrics.iter().copied());
    header.push("tags");
    wtr.write_record(&header)?;

    for row in rows {
        let mut fields = vec![row.id.clone(), row.variant.clone(), row.score.to_string()];
        fields.extend(
            metrics
                .iter()
                .map(|m| row.metrics.get(*m).map(f64::to_string).unwrap_or_default()),
        );
        fields.push(row.tags.clone());
        wtr.write_record(&fields)?;
    }
    wtr.flush()
}

pub fn write_csv_file(rows: &[ScoredRow], path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(rows, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(id: &str, score: f64, tags: &str) -> ScoredRow {
        let mut metrics = BTreeMap::new();
        metrics.insert("bleu".to_string(), score / 2.0);
        metrics.insert("exact_match".to_string(), score);
        ScoredRow {
            id: id.to_string(),
            variant: "single".to_string(),
            metrics,
            score,
            tags: tags.to_string(),
        }
    }

    #[test]
    fn test_rows_table_limits_and_aligns() {
        let rows = vec![row("1", 1.0, "easy"), row("22", 0.0, "hard"), row("3", 0.0, "")];
        let table = rows_table(&rows, 2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "id  variant  score  bleu   exact_match  tags");
        assert_eq!(lines[2], "1   single   1.000  0.500  1.000        easy");
    }

    #[test]
    fn test_csv_quotes_fields_with_commas() {
        let mut buf = Vec::new();
        write_csv(&[row("a\"b", 0.5, "x,y")], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "id,variant,score,bleu,exact_match,tags\r\n\"a\"\"b\",single,0.5,0.25,0.5,\"x,y\"\r\n"
        );
    }

    #[test]
    fn test_table_aligns_wide_characters() {
        let header = vec!["name".to_string(), "n".to_string()];
        let body = vec![
            vec!["猫猫".to_string(), "1".to_string()],
            vec!["cafe\u{301}".to_string(), "2".to_string()],
        ];
        let table = render_table(&header, &body);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name  n");
        assert_eq!(lines[2], "猫猫  1");
        assert_eq!(lines[3], "cafe\u{301}  2");
    }

    #[test]
    fn test_csv_quotes_line_breaks() {
        let mut buf = Vec::new();
        write_csv(&[row("1", 1.0, "multi\nline")], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with(",\"multi\nline\"\r\n"));
    }

    #[test]
    fn test_tag_summary_table() {
        let summaries = vec![TagSummary {
            tag: "easy".to_string(),
            mean: 1.0,
            lo: 1.0,
            hi: 1.0,
            n: 1,
        }];
        let table = tag_summary_table(&summaries);
        assert!(table.lines().nth(2).unwrap().starts_with("easy  1.000"));
    }

    #[test]
    fn test_comparison_formats_delta_with_sign() {
        let cmp = vec![RunComparison {
            metric: "score".to_string(),
            baseline: Some(0.5),
            candidate: Some(0.25),
            delta: Some(-0.25),
        }];
        let table = comparison_table(&cmp);
        assert!(table.contains("-0.250"));
        let missing = vec![RunComparison {
            metric: "bleu".to_string(),
            baseline: None,
            candidate: Some(0.1),
            delta: None,
        }];
        assert!(comparison_table(&missing).contains("bleu    -"));
    }

    #[test]
    fn test_nan_renders_as_text() {
        assert_eq!(fmt_value(f64::NAN), "NaN");
        assert_eq!(fmt_opt(None), "-");
    }
}
