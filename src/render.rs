//! HTML rendering of query results.

use crate::db::{Record, Value};

/// Message shown when a query returns no rows.
pub const EMPTY_RESULT_HTML: &str = "<p>Nenhum dado encontrado.</p>";

/// Renders records as a bordered HTML table.
///
/// Headers come from the first record's columns; later records are rendered
/// in that column order, with an empty cell for any column they lack.
pub fn records_to_html(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return EMPTY_RESULT_HTML.to_string();
    };

    let headers: Vec<&str> = first.columns().collect();
    let mut html = String::from("<table border='1' cellspacing='0' cellpadding='5'>");

    html.push_str("<tr>");
    for header in &headers {
        html.push_str("<th>");
        html.push_str(&escape_html(&capitalize(header)));
        html.push_str("</th>");
    }
    html.push_str("</tr>");

    for record in records {
        html.push_str("<tr>");
        for header in &headers {
            html.push_str("<td>");
            if let Some(value) = record.get(header) {
                html.push_str(&escape_html(&cell_text(value)));
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }

    html.push_str("</table>");
    html
}

fn cell_text(value: &Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        value.to_display_string()
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
