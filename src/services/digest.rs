//! Digest rendering
//!
//! Turns stored rows into the HTML sent by mail and served on the per-series
//! web page. Rendering trusts the caller's row order.

use crate::db::sqlite::models::{DigestRow, Observation};
use rust_decimal::Decimal;

/// Header line of every digest
pub const DIGEST_HEADER: &str = "Daily FRED Update (\u{6570}\u{636e}\u{4e3a}\u{6700}\u{65b0}\u{4e00}\u{671f})";

/// Shown in place of a missing value
pub const MISSING_VALUE_PLACEHOLDER: &str = "N/A";

/// Renders digests whose headings link to the per-series web page
#[derive(Debug, Clone)]
pub struct DigestComposer {
    web_base_url: String,
}

impl DigestComposer {
    pub fn new(web_base_url: &str) -> Self {
        Self {
            web_base_url: web_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical page for a series
    pub fn series_url(&self, series_id: &str) -> String {
        format!("{}/web/series/{}", self.web_base_url, series_id)
    }

    /// Render the digest; `None` when there is nothing to report
    ///
    /// Rows must already be grouped by series with the newest date first.
    pub fn compose(&self, rows: &[DigestRow]) -> Option<String> {
        if rows.is_empty() {
            return None;
        }

        let mut lines = vec![format!("{}\n", DIGEST_HEADER)];
        let mut current_series: Option<&str> = None;

        for row in rows {
            if current_series != Some(row.series_id.as_str()) {
                if current_series.is_some() {
                    lines.push("<br>".to_string());
                }

                lines.push(format!(
                    "<p><strong><a href=\"{}\">{}</a></strong></p>",
                    escape_html(&self.series_url(&row.series_id)),
                    escape_html(&row.title)
                ));
                current_series = Some(row.series_id.as_str());
            }

            lines.push(format!(
                "<li>{} | {} | {} {}</li>",
                escape_html(&row.frequency),
                row.date,
                format_value(row.value),
                escape_html(&row.display_unit)
            ));
        }

        tracing::debug!("Digest built with {} lines", lines.len());
        Some(lines.join("\n"))
    }
}

/// Render the HTML page of one series' web channel
pub fn render_series_page(series_id: &str, title: Option<&str>, rows: &[Observation]) -> String {
    let heading = title.unwrap_or(series_id);

    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{0}</title></head>\n<body>\n<h1>{0}</h1>\n<table>\n<tr><th>Date</th><th>Frequency</th><th>Value</th></tr>\n",
        escape_html(heading)
    );

    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{} {}</td></tr>\n",
            row.date,
            escape_html(&row.frequency),
            format_value(row.value),
            escape_html(&row.display_unit)
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn format_value(value: Option<Decimal>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING_VALUE_PLACEHOLDER.to_string())
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
