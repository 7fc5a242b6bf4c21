//! Plain text rendering of layer reports.

use std::fmt::Write as _;

use crate::format::format_thousands;
use crate::inspect::{LayerOutcome, LayerReport, SkippedLayer};

/// A left aligned text table with a header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table with the given column headers.
    #[must_use]
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(headers: I) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Adds a row. Missing cells are rendered empty, extra cells are ignored.
    pub fn push_row<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, row: I) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Renders the table, one line per row, each line ending with a newline.
    #[must_use]
    pub fn render(&self) -> String {
        // multi-line values would break the alignment
        let cell = |row: &[String], idx: usize| -> String {
            row.get(idx).map_or_else(String::new, |v| v.replace('\n', "\\n"))
        };

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, width) in widths.iter_mut().enumerate() {
                *width = (*width).max(cell(row, idx).chars().count());
            }
        }

        let mut out = String::new();
        let line = |values: Vec<String>, out: &mut String| {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v:<w$}"))
                .collect();
            out.push_str(padded.join(" | ").trim_end());
            out.push('\n');
        };

        line(self.headers.clone(), &mut out);
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&separator.join("-+-"));
        out.push('\n');
        for row in &self.rows {
            line((0..widths.len()).map(|idx| cell(row, idx)).collect(), &mut out);
        }
        out
    }
}

fn header(report: &LayerReport) -> String {
    let mut header = format!(
        "======= Layer {}: {} bytes in MVT",
        report.layer_id,
        format_thousands(report.mvt_size as u64)
    );
    if let Some(mvt) = &report.mvt_layer {
        let _ = write!(header, ", {} features", format_thousands(mvt.features as u64));
    }
    if report.rows.is_empty() && report.mvt_size > 0 {
        header.push_str(", but the rows query returned nothing");
    }
    if report.names_hidden {
        header.push_str(" (localized names hidden)");
    }
    header.push_str(" =======\n");
    header
}

/// Renders one layer report: header, table and any warnings.
#[must_use]
pub fn render(report: &LayerReport) -> String {
    let mut out = header(report);

    if report.rows.is_empty() {
        out.push_str("(no rows)\n");
    } else {
        let mut table = Table::new(report.columns.iter().map(String::as_str));
        for row in &report.rows {
            table.push_row(report.columns.iter().map(|column| {
                row.get(column)
                    .map_or_else(String::new, |v| v.as_display().to_string())
            }));
        }
        out.push_str(&table.render());
    }

    for warning in &report.warnings {
        let _ = writeln!(out, "{warning}");
    }
    out
}

/// Renders a line explaining why a layer was left out, followed by its warnings.
#[must_use]
pub fn render_skipped(skipped: &SkippedLayer) -> String {
    let mut out = format!(
        "======= Layer {} skipped: {} =======\n",
        skipped.layer_id, skipped.reason
    );
    for warning in &skipped.warnings {
        let _ = writeln!(out, "{warning}");
    }
    out
}

/// Renders the outcome of one layer.
#[must_use]
pub fn render_outcome(outcome: &LayerOutcome) -> String {
    match outcome {
        LayerOutcome::Report(report) => render(report),
        LayerOutcome::Skipped(skipped) => render_skipped(skipped),
    }
}
